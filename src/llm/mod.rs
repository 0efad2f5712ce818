//! Model backend adapters
//!
//! - `OllamaAgent` - locally hosted models over Ollama's HTTP API
//! - `EnvVarGuard` - scoped environment override used for `OLLAMA_HOST`

mod env_guard;
mod ollama;

pub use env_guard::EnvVarGuard;
pub use ollama::{OllamaAgent, OllamaFunction, OllamaFunctionCall, OllamaTool, OllamaToolCall};
