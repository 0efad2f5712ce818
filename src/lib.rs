//! Agent/tool/permission mediation layer
//!
//! A model backend asks for tools by name; the agent dispatches the calls,
//! and every side-effecting tool asks the permission manager before acting.

pub mod core;
pub mod permissions;
pub mod tools;

// Shared agent contract and the Ollama adapter
pub mod agent;
pub mod llm;

// Optional components
pub mod cli;
pub mod logging;

pub use agent::{AgentConfig, AgentResponse, BaseAgent, ChatOutcome, ProviderAdapter};
pub use core::{AgentError, AgentResult};
pub use llm::OllamaAgent;
pub use permissions::{PermissionManager, PermissionOptions, PermissionPolicy, PermissionStatus};
