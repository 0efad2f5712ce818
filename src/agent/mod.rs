//! Agent contract and shared state
//!
//! - `BaseAgent` - conversation history, tool registry, permissions
//! - `ProviderAdapter` - what each model backend implements
//! - `AgentConfig` - builder-style configuration

mod base;
mod config;
mod provider;
mod response;

pub use base::BaseAgent;
pub use config::{AgentConfig, DEFAULT_HOST, DEFAULT_MODEL};
pub use provider::ProviderAdapter;
pub use response::{AgentResponse, ChatOutcome, ContentPart, ConversationTurn, Role, TurnContent};
