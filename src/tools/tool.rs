//! Tool function contract
//!
//! Every tool, built-in or supplied by the embedding application, implements
//! `ToolFunction`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::AgentResult;
use crate::permissions::PermissionManager;

/// Result of running a tool
///
/// Expected failures (missing file, permission denied, non-zero exit code)
/// are reported through `error`, not by returning `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The output of the tool
    pub output: String,
    /// Error message, `None` on success
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful tool output
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    /// Create a failed tool output
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: Some(message.into()),
        }
    }

    /// Whether the tool reported a failure
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Shared state handed to every tool invocation
#[derive(Clone)]
pub struct ToolContext {
    permissions: Arc<PermissionManager>,
    working_dir: PathBuf,
    default_timeout: Duration,
}

impl ToolContext {
    pub fn new(
        permissions: Arc<PermissionManager>,
        working_dir: impl Into<PathBuf>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            permissions,
            working_dir: working_dir.into(),
            default_timeout,
        }
    }

    /// Ask the permission manager whether a side-effecting operation may run
    ///
    /// Tools must call this themselves before acting; the pipeline does not
    /// gate calls.
    pub async fn request_permission(
        &self,
        operation_type: &str,
        details: Map<String, Value>,
    ) -> AgentResult<bool> {
        self.permissions
            .request_permission(operation_type, details)
            .await
    }

    /// Base directory for relative paths
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Timeout for long-running tools that take no explicit timeout
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Resolve a path (handle both absolute and relative)
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// A callable the model can invoke by name
///
/// `args` holds the arguments exactly as the model sent them. Tools that need
/// typed input deserialize it themselves, so schema mismatches show up as
/// errors at call time.
#[async_trait]
pub trait ToolFunction: Send + Sync {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Tool backed by a synchronous closure
pub struct FnTool<F> {
    func: F,
}

/// Wrap a synchronous closure as a `ToolFunction`
pub fn tool_fn<F>(func: F) -> FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<ToolOutput> + Send + Sync,
{
    FnTool { func }
}

#[async_trait]
impl<F> ToolFunction for FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<ToolOutput> + Send + Sync,
{
    async fn call(&self, args: &Map<String, Value>, _ctx: &ToolContext) -> Result<ToolOutput> {
        (self.func)(args)
    }
}
