//! Shared agent state
//!
//! `BaseAgent` holds everything that is the same for every backend: the
//! conversation history, the tool registry, the system prompt and the
//! permission manager. Backend adapters embed one and implement
//! `ProviderAdapter` for the backend-specific parts.

use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::config::AgentConfig;
use super::response::ConversationTurn;
use crate::core::AgentResult;
use crate::permissions::PermissionManager;
use crate::tools::{
    register_default_tools, ToolCall, ToolCallResult, ToolContext, ToolExecutionPipeline,
    ToolFunction, ToolParameters, ToolRegistry, ToolSchema,
};

/// Conversation, tools and permissions shared by all adapters
pub struct BaseAgent {
    /// Completed turns, appended in pairs (user, assistant)
    conversation_history: Vec<ConversationTurn>,
    available_tools: ToolRegistry,
    system_prompt: String,
    permissions: Arc<PermissionManager>,
    working_dir: PathBuf,
    default_tool_timeout: Duration,
}

impl BaseAgent {
    /// Create agent state with an empty history and no tools
    pub fn new(system_prompt: impl Into<String>, permissions: PermissionManager) -> Self {
        Self {
            conversation_history: Vec::new(),
            available_tools: ToolRegistry::new(),
            system_prompt: system_prompt.into(),
            permissions: Arc::new(permissions),
            working_dir: PathBuf::from("."),
            default_tool_timeout: Duration::from_secs(300),
        }
    }

    /// Create agent state from a configuration
    pub fn from_config(config: &AgentConfig, system_prompt: impl Into<String>) -> Self {
        let permissions = PermissionManager::from_parts(
            config.permissions.clone(),
            config.permission_callback.clone(),
        );
        Self::new(system_prompt, permissions)
            .with_working_dir(config.working_dir.clone())
            .with_tool_timeout(config.default_tool_timeout)
    }

    /// Set the base directory handed to tools
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the timeout handed to tools
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.default_tool_timeout = timeout;
        self
    }

    /// Register a tool
    ///
    /// A tool with the same name is replaced and its schema returned. The
    /// function is not checked against `parameters`; mismatches show up as
    /// execution errors when the tool is called.
    pub fn register_tool(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn ToolFunction>,
        description: impl Into<String>,
        parameters: ToolParameters,
    ) -> Option<ToolSchema> {
        self.available_tools
            .register(name, function, description, parameters)
    }

    /// Register the built-in file and terminal tools
    pub fn register_default_tools(&mut self) -> usize {
        let count = register_default_tools(&mut self.available_tools);
        tracing::info!("[BaseAgent] Registered {} default tools", count);
        count
    }

    /// The tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.available_tools
    }

    /// The system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Completed turns, oldest first
    pub fn history(&self) -> &[ConversationTurn] {
        &self.conversation_history
    }

    /// The permission manager
    pub fn permissions(&self) -> &Arc<PermissionManager> {
        &self.permissions
    }

    /// Wrap a message in a `<user_query>` block
    ///
    /// Non-empty `user_info` is serialized into a `<user_info>` block placed
    /// before the query.
    pub fn format_user_message(message: &str, user_info: Option<&Map<String, Value>>) -> String {
        let query = format!("<user_query>\n{}\n</user_query>", message);
        match user_info {
            Some(info) if !info.is_empty() => format!(
                "<user_info>\n{:#}\n</user_info>\n\n{}",
                Value::Object(info.clone()),
                query
            ),
            _ => query,
        }
    }

    /// Forward a permission request to the permission manager
    pub async fn request_permission(
        &self,
        operation_type: &str,
        details: Map<String, Value>,
    ) -> AgentResult<bool> {
        self.permissions
            .request_permission(operation_type, details)
            .await
    }

    /// Context handed to each tool call
    pub fn tool_context(&self) -> ToolContext {
        ToolContext::new(
            self.permissions.clone(),
            self.working_dir.clone(),
            self.default_tool_timeout,
        )
    }

    /// Messages for a backend call: system turn, history, then `current`
    pub fn messages_for(&self, current: ConversationTurn) -> Vec<ConversationTurn> {
        let mut messages = Vec::with_capacity(self.conversation_history.len() + 2);
        messages.push(ConversationTurn::system(self.system_prompt.as_str()));
        messages.extend(self.conversation_history.iter().cloned());
        messages.push(current);
        messages
    }

    /// Record a completed exchange
    ///
    /// Only called once a turn has succeeded, so history always alternates
    /// user and assistant.
    pub fn commit_exchange(&mut self, user: ConversationTurn, assistant: ConversationTurn) {
        self.conversation_history.push(user);
        self.conversation_history.push(assistant);
        tracing::debug!(
            "[BaseAgent] History now has {} turns",
            self.conversation_history.len()
        );
    }

    /// Run backend-neutral tool calls through the pipeline
    pub async fn execute_tool_calls(&self, calls: Vec<ToolCall>) -> Vec<ToolCallResult> {
        let ctx = self.tool_context();
        ToolExecutionPipeline::execute(&self.available_tools, &ctx, calls).await
    }
}

impl std::fmt::Debug for BaseAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseAgent")
            .field("history_len", &self.conversation_history.len())
            .field("tools", &self.available_tools)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}
