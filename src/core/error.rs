//! Agent error types

use thiserror::Error;

/// Errors that can occur while building or running an agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The model backend could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The model backend did not answer in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// The model backend answered with an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// A permission decision callback failed
    #[error("Permission callback failed: {0}")]
    PermissionCallback(String),

    /// A permission decision callback returned a non-terminal status
    #[error("Invalid permission decision for '{0}': callbacks must grant or deny")]
    InvalidDecision(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        AgentError::Configuration(msg.into())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            AgentError::Connection(err.to_string())
        } else {
            AgentError::Backend(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::Timeout(180);
        assert_eq!(err.to_string(), "Request timed out after 180s");

        let err = AgentError::InvalidDecision("delete_file".into());
        assert_eq!(
            err.to_string(),
            "Invalid permission decision for 'delete_file': callbacks must grant or deny"
        );

        let err = AgentError::configuration("no model");
        assert_eq!(err.to_string(), "Invalid configuration: no model");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin closed");
        let agent_err: AgentError = io_err.into();
        assert!(matches!(agent_err, AgentError::Io(_)));
        assert_eq!(agent_err.to_string(), "IO error: stdin closed");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_connection_error() {
        // Port 9 (discard) has no HTTP server listening
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let err = client
            .get("http://127.0.0.1:9/api/tags")
            .send()
            .await
            .unwrap_err();
        let agent_err: AgentError = err.into();
        assert!(matches!(agent_err, AgentError::Connection(_)));
    }
}
