//! Tool system for the agent framework
//!
//! This module provides:
//! - `ToolFunction` trait - Interface for implementing tools
//! - `ToolOutput` - Result type for tool execution
//! - `ToolRegistry` - Name → callable + schema
//! - `ToolExecutionPipeline` - Runs backend-requested calls with failure isolation
//! - `common` - Built-in tools (file operations, terminal commands)

mod pipeline;
mod registry;
mod schema;
mod tool;

/// Built-in tools
pub mod common;

#[cfg(test)]
pub(crate) mod test_support;

pub use common::register_default_tools;
pub use pipeline::{ToolCall, ToolCallResult, ToolExecutionPipeline};
pub use registry::{RegisteredTool, ToolRegistry};
pub use schema::{ToolParameters, ToolSchema};
pub use tool::{tool_fn, FnTool, ToolContext, ToolFunction, ToolOutput};
