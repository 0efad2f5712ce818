//! Tool execution pipeline
//!
//! Resolves each requested call against the registry and runs it. Calls run
//! one after another, in the order the backend sent them. A failing call
//! (unknown name, `Err` result, or panic) becomes an error entry in the
//! results and never stops the calls after it.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::registry::ToolRegistry;
use super::tool::ToolContext;

/// A backend-neutral request to call a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// Outcome of one tool call, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Name of the tool that was requested
    pub name: String,
    /// Arguments passed to the tool
    pub parameters: Map<String, Value>,
    /// Tool output (empty on failure)
    pub output: String,
    /// Error message, `None` on success
    pub error: Option<String>,
}

impl ToolCallResult {
    /// Whether this call failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn failed(call: ToolCall, message: String) -> Self {
        Self {
            name: call.name,
            parameters: call.parameters,
            output: String::new(),
            error: Some(message),
        }
    }
}

/// Sequential tool dispatcher
pub struct ToolExecutionPipeline;

impl ToolExecutionPipeline {
    /// Execute a batch of calls, returning one result per call in input order
    pub async fn execute(
        registry: &ToolRegistry,
        ctx: &ToolContext,
        calls: Vec<ToolCall>,
    ) -> Vec<ToolCallResult> {
        tracing::info!("[Pipeline] Executing {} tool calls", calls.len());

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(Self::execute_one(registry, ctx, call).await);
        }

        tracing::info!(
            "[Pipeline] Completed {} tool calls ({} failed)",
            results.len(),
            results.iter().filter(|r| r.is_error()).count()
        );
        results
    }

    /// Execute a single call
    pub async fn execute_one(
        registry: &ToolRegistry,
        ctx: &ToolContext,
        call: ToolCall,
    ) -> ToolCallResult {
        let Some(tool) = registry.get(&call.name) else {
            let message = format!("Tool '{}' not found", call.name);
            tracing::warn!("[Pipeline] {}", message);
            return ToolCallResult::failed(call, message);
        };

        tracing::info!("[Pipeline] Executing tool: {}", call.name);
        let shown = Value::Object(call.parameters.clone());
        tracing::debug!("[Pipeline] Parameters: {}", shown);

        let function = tool.function().clone();
        let outcome = AssertUnwindSafe(function.call(&call.parameters, ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => {
                if let Some(ref error) = output.error {
                    tracing::warn!("[Pipeline] Tool {} returned error: {}", call.name, error);
                } else {
                    tracing::debug!(
                        "[Pipeline] Tool {} completed, {} chars of output",
                        call.name,
                        output.output.len()
                    );
                }
                ToolCallResult {
                    name: call.name,
                    parameters: call.parameters,
                    output: output.output,
                    error: output.error,
                }
            }
            Ok(Err(e)) => {
                let message = format!("Error executing tool: {}", e);
                tracing::error!("[Pipeline] Tool {} failed: {}", call.name, e);
                ToolCallResult::failed(call, message)
            }
            Err(panic) => {
                let message = format!("Error executing tool: panicked: {}", panic_message(&panic));
                tracing::error!("[Pipeline] Tool {} panicked", call.name);
                ToolCallResult::failed(call, message)
            }
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
