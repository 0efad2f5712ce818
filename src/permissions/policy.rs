//! Permission policy types
//!
//! Static configuration deciding, per operation type, whether a side-effecting
//! operation is granted, denied, or needs an interactive decision.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Well-known operation tags used by the default tools
pub mod operations {
    pub const CREATE_FILE: &str = "create_file";
    pub const EDIT_FILE: &str = "edit_file";
    pub const DELETE_FILE: &str = "delete_file";
    pub const RUN_TERMINAL_COMMAND: &str = "run_terminal_command";
}

/// Outcome of a permission evaluation
///
/// `Ask` only marks that a decision callback must be consulted. It is never
/// returned to callers of `PermissionManager::request_permission`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Ask,
}

/// Rule applied to an operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// Grant without asking
    AlwaysAllow,
    /// Deny without asking
    AlwaysDeny,
    /// Ask the decision callback every time
    #[default]
    Confirm,
}

/// A request to perform a side-effecting operation
///
/// Built fresh for every `request_permission` call and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionRequest {
    operation: String,
    details: Map<String, Value>,
}

impl PermissionRequest {
    /// Create a new permission request
    pub fn new(operation: impl Into<String>, details: Map<String, Value>) -> Self {
        Self {
            operation: operation.into(),
            details,
        }
    }

    /// Operation tag, e.g. `create_file`
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Operation details, e.g. path or command
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// The `command` detail, if this request carries one
    pub fn command(&self) -> Option<&str> {
        self.details.get("command").and_then(|v| v.as_str())
    }
}

/// Permission configuration, loaded once when the agent is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionOptions {
    /// Per-operation policies
    pub policies: HashMap<String, PermissionPolicy>,
    /// Policy for operations not listed in `policies`
    pub default_policy: PermissionPolicy,
    /// Grant everything not explicitly denied
    pub yolo_mode: bool,
    /// Command prefixes granted for `run_terminal_command`
    ///
    /// A prefix matches whole words only. Commands containing shell control
    /// operators never match and go to the callback instead.
    pub command_allowlist: Vec<String>,
    /// Command prefixes denied for `run_terminal_command`, checked against
    /// every program in a chained command
    pub command_denylist: Vec<String>,
    /// Keep asking for `delete_file` even in yolo mode
    pub delete_file_protection: bool,
}

impl Default for PermissionOptions {
    fn default() -> Self {
        Self {
            policies: HashMap::new(),
            default_policy: PermissionPolicy::Confirm,
            yolo_mode: false,
            command_allowlist: Vec::new(),
            command_denylist: Vec::new(),
            delete_file_protection: true,
        }
    }
}

impl PermissionOptions {
    /// Create options where every operation requires confirmation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy for one operation type
    pub fn with_policy(mut self, operation: impl Into<String>, policy: PermissionPolicy) -> Self {
        self.policies.insert(operation.into(), policy);
        self
    }

    /// Set the policy for unlisted operation types
    pub fn with_default_policy(mut self, policy: PermissionPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Enable or disable yolo mode
    pub fn with_yolo_mode(mut self, enabled: bool) -> Self {
        self.yolo_mode = enabled;
        self
    }

    /// Grant terminal commands starting with `prefix`
    pub fn allow_command(mut self, prefix: impl Into<String>) -> Self {
        self.command_allowlist.push(prefix.into());
        self
    }

    /// Deny terminal commands starting with `prefix`
    pub fn deny_command(mut self, prefix: impl Into<String>) -> Self {
        self.command_denylist.push(prefix.into());
        self
    }

    /// Enable or disable delete protection
    pub fn with_delete_file_protection(mut self, enabled: bool) -> Self {
        self.delete_file_protection = enabled;
        self
    }

    /// Parse options from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Resolve the policy for an operation type
    pub fn policy_for(&self, operation: &str) -> PermissionPolicy {
        self.policies
            .get(operation)
            .copied()
            .unwrap_or(self.default_policy)
    }

    /// Evaluate a request against the static configuration
    ///
    /// Deny rules win over allow rules. Returns `Ask` when only the decision
    /// callback can settle the request.
    pub fn evaluate(&self, request: &PermissionRequest) -> PermissionStatus {
        let policy = self.policy_for(request.operation());
        let command = if request.operation() == operations::RUN_TERMINAL_COMMAND {
            request.command()
        } else {
            None
        };

        if policy == PermissionPolicy::AlwaysDeny {
            return PermissionStatus::Denied;
        }
        if command.is_some_and(|c| {
            command_segments(c).any(|segment| matches_prefix(&self.command_denylist, segment))
        }) {
            return PermissionStatus::Denied;
        }
        if policy == PermissionPolicy::AlwaysAllow {
            return PermissionStatus::Granted;
        }
        if command.is_some_and(|c| {
            !has_shell_control(c) && matches_prefix(&self.command_allowlist, c)
        }) {
            return PermissionStatus::Granted;
        }
        if self.yolo_mode {
            let protected = self.delete_file_protection
                && request.operation() == operations::DELETE_FILE;
            if !protected {
                return PermissionStatus::Granted;
            }
        }

        PermissionStatus::Ask
    }
}

/// Shell operators that reach past the first program
const SHELL_CONTROL: &[&str] = &[";", "&", "|", "`", "$(", "\n", "\r", ">", "<"];

fn has_shell_control(command: &str) -> bool {
    SHELL_CONTROL.iter().any(|op| command.contains(op))
}

/// Each program invocation in a chained command line
fn command_segments(command: &str) -> impl Iterator<Item = &str> {
    command.split(|c: char| matches!(c, ';' | '&' | '|' | '`' | '(' | ')' | '\n' | '\r'))
}

/// Prefix match that ends on a word boundary: `ls` matches `ls -la` but not `lsblk`
fn matches_prefix(prefixes: &[String], command: &str) -> bool {
    let command = command.trim_start();
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return false;
        }
        match command.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
            None => false,
        }
    })
}
