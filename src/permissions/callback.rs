//! Permission decision callbacks
//!
//! The manager awaits every callback the same way. Synchronous closures run
//! inline through `FnCallback`; closures that block (a human at a terminal)
//! go through `BlockingCallback`, which moves them onto tokio's blocking pool.

use async_trait::async_trait;
use std::sync::Arc;

use super::policy::{PermissionRequest, PermissionStatus};
use crate::core::{AgentError, AgentResult};

/// Decides requests whose policy is `Confirm`
///
/// Must return `Granted` or `Denied`. Errors propagate to the caller of
/// `request_permission` untouched.
#[async_trait]
pub trait PermissionCallback: Send + Sync {
    async fn decide(&self, request: &PermissionRequest) -> AgentResult<PermissionStatus>;
}

/// Callback backed by a non-blocking closure
pub struct FnCallback<F> {
    func: F,
}

impl<F> FnCallback<F>
where
    F: Fn(&PermissionRequest) -> AgentResult<PermissionStatus> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> PermissionCallback for FnCallback<F>
where
    F: Fn(&PermissionRequest) -> AgentResult<PermissionStatus> + Send + Sync,
{
    async fn decide(&self, request: &PermissionRequest) -> AgentResult<PermissionStatus> {
        (self.func)(request)
    }
}

/// Callback backed by a blocking closure, run on the blocking thread pool
pub struct BlockingCallback<F> {
    func: Arc<F>,
}

impl<F> BlockingCallback<F>
where
    F: Fn(&PermissionRequest) -> AgentResult<PermissionStatus> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> PermissionCallback for BlockingCallback<F>
where
    F: Fn(&PermissionRequest) -> AgentResult<PermissionStatus> + Send + Sync + 'static,
{
    async fn decide(&self, request: &PermissionRequest) -> AgentResult<PermissionStatus> {
        let func = self.func.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || func(&request))
            .await
            .map_err(|e| AgentError::PermissionCallback(format!("decision task failed: {}", e)))?
    }
}
