//! Agent Configuration
//!
//! Configuration options for an agent and its model backend.

use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{AgentError, AgentResult};
use crate::permissions::{PermissionCallback, PermissionOptions};

/// Host used when neither the configuration nor `OLLAMA_HOST` names one
pub const DEFAULT_HOST: &str = "http://localhost:11434";
/// Model used by `from_env` when `OLLAMA_MODEL` is unset
pub const DEFAULT_MODEL: &str = "llama3.1";

const HOST_ENV: &str = "OLLAMA_HOST";
const MODEL_ENV: &str = "OLLAMA_MODEL";
const TIMEOUT_ENV: &str = "CURSOR_AGENT_TIMEOUT_SECS";
const YOLO_ENV: &str = "CURSOR_AGENT_YOLO";

/// Configuration for an agent
///
/// Use the builder pattern to configure the agent:
///
/// ```ignore
/// let config = AgentConfig::new("ollama-qwen2.5-coder")
///     .with_host("http://gpu-box:11434")
///     .with_timeout(Duration::from_secs(60))
///     .with_permissions(PermissionOptions::new().with_yolo_mode(true));
/// ```
#[derive(Clone)]
pub struct AgentConfig {
    /// Model name, without any `ollama-` prefix
    pub model: String,

    /// Backend host; `None` falls back to `OLLAMA_HOST`, then the default host
    pub host: Option<String>,

    /// Sampling temperature
    pub temperature: f64,

    /// Timeout for one model request
    pub timeout: Duration,

    /// Timeout for tools that run external processes
    pub default_tool_timeout: Duration,

    /// Maximum tool-call rounds per turn
    pub max_tool_rounds: usize,

    /// Extra backend options merged into each request
    pub options: Map<String, Value>,

    /// Permission policies, fixed for the agent's lifetime
    pub permissions: PermissionOptions,

    /// Decision callback; `None` uses the console prompt
    pub permission_callback: Option<Arc<dyn PermissionCallback>>,

    /// Export the resolved host as `OLLAMA_HOST` while the agent lives
    pub export_host_env: bool,

    /// Base directory for the default tools
    pub working_dir: PathBuf,
}

impl AgentConfig {
    /// Create a configuration for a model with default settings
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        let model = match model.strip_prefix("ollama-") {
            Some(stripped) => stripped.to_string(),
            None => model,
        };

        Self {
            model,
            host: None,
            temperature: 0.0,
            timeout: Duration::from_secs(180),
            default_tool_timeout: Duration::from_secs(300),
            max_tool_rounds: 10,
            options: Map::new(),
            permissions: PermissionOptions::default(),
            permission_callback: None,
            export_host_env: false,
            working_dir: PathBuf::from("."),
        }
    }

    /// Build a configuration from environment variables
    ///
    /// Reads `OLLAMA_MODEL`, `OLLAMA_HOST`, `CURSOR_AGENT_TIMEOUT_SECS` and
    /// `CURSOR_AGENT_YOLO`.
    pub fn from_env() -> AgentResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AgentResult<Self> {
        let model = lookup(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let mut config = Self::new(model);

        if let Some(host) = lookup(HOST_ENV).filter(|h| !h.trim().is_empty()) {
            config.host = Some(host);
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                AgentError::configuration(format!("{} must be a number of seconds, got '{}'", TIMEOUT_ENV, raw))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(YOLO_ENV) {
            let yolo = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
            config.permissions = config.permissions.with_yolo_mode(yolo);
        }

        Ok(config)
    }

    /// Set the backend host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the model request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout for process-running tools
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.default_tool_timeout = timeout;
        self
    }

    /// Set maximum tool-call rounds per turn
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Add an extra backend option (e.g. `num_ctx`)
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Set the permission options
    pub fn with_permissions(mut self, permissions: PermissionOptions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set the permission decision callback
    pub fn with_permission_callback(mut self, callback: Arc<dyn PermissionCallback>) -> Self {
        self.permission_callback = Some(callback);
        self
    }

    /// Export the host as `OLLAMA_HOST` for the agent's lifetime
    pub fn with_export_host_env(mut self, enabled: bool) -> Self {
        self.export_host_env = enabled;
        self
    }

    /// Set the base directory for the default tools
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Host to connect to: configured host, then `OLLAMA_HOST`, then the default
    pub fn resolved_host(&self) -> String {
        self.resolve_host_with(|key| std::env::var(key).ok())
    }

    fn resolve_host_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let host = self
            .host
            .clone()
            .or_else(|| lookup(HOST_ENV).filter(|h| !h.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        normalize_host(&host)
    }
}

/// Add a scheme when missing and drop trailing slashes
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("model", &self.model)
            .field("host", &self.host)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("default_tool_timeout", &self.default_tool_timeout)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("permissions", &self.permissions)
            .field("has_permission_callback", &self.permission_callback.is_some())
            .field("export_host_env", &self.export_host_env)
            .field("working_dir", &self.working_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new("ollama-qwen2.5-coder:7b");
        assert_eq!(config.model, "qwen2.5-coder:7b");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.timeout, Duration::from_secs(180));
        assert_eq!(config.default_tool_timeout, Duration::from_secs(300));
        assert_eq!(config.max_tool_rounds, 10);
        assert!(!config.export_host_env);
    }

    #[test]
    fn test_from_lookup() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("OLLAMA_MODEL", "mistral"),
            ("OLLAMA_HOST", "gpu-box:11434"),
            ("CURSOR_AGENT_TIMEOUT_SECS", "30"),
            ("CURSOR_AGENT_YOLO", "true"),
        ]))
        .unwrap();

        assert_eq!(config.model, "mistral");
        assert_eq!(config.host.as_deref(), Some("gpu-box:11434"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.permissions.yolo_mode);
    }

    #[test]
    fn test_from_lookup_defaults_and_bad_timeout() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.host.is_none());

        let err = AgentConfig::from_lookup(lookup(&[("CURSOR_AGENT_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_host_priority() {
        let env = lookup(&[("OLLAMA_HOST", "http://from-env:1234/")]);

        let explicit = AgentConfig::new("m").with_host("127.0.0.1:9999");
        assert_eq!(explicit.resolve_host_with(&env), "http://127.0.0.1:9999");

        let from_env = AgentConfig::new("m");
        assert_eq!(from_env.resolve_host_with(&env), "http://from-env:1234");
        assert_eq!(from_env.resolve_host_with(lookup(&[])), DEFAULT_HOST);
    }
}
