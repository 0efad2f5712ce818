//! Core types shared across the crate
//!
//! - `AgentError` / `AgentResult` - Error types

pub mod error;

pub use error::{AgentError, AgentResult};
