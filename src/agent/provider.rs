//! Backend adapter contract
//!
//! Each model backend implements `ProviderAdapter` on a type that embeds a
//! `BaseAgent`. Only the parts that depend on the backend's wire format live
//! here; history, tools and permissions stay in `BaseAgent`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::base::BaseAgent;
use super::response::ChatOutcome;
use crate::tools::{ToolCallResult, ToolFunction, ToolParameters, ToolSchema};

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Tool description in the backend's format
    type ToolSpec: Send;
    /// Tool-call payload as the backend sends it
    type RawToolCall: Send;

    /// Shared agent state
    fn base(&self) -> &BaseAgent;

    /// Shared agent state, mutably
    fn base_mut(&mut self) -> &mut BaseAgent;

    /// System prompt for this backend
    ///
    /// Adapters pass this to `BaseAgent` when they build themselves, so it
    /// runs once per agent.
    fn generate_system_prompt() -> String
    where
        Self: Sized;

    /// Run one conversation turn
    ///
    /// May call tools any number of times before answering. Backend failures
    /// come back as `ChatOutcome::Failed` and leave the history unchanged.
    /// Taking `&mut self` means turns on one agent never overlap.
    async fn chat(&mut self, message: &str, user_info: Option<&Map<String, Value>>) -> ChatOutcome;

    /// Translate the registry into the backend's tool format
    ///
    /// Returns the same value on every call until the registry changes.
    fn prepare_tools(&self) -> Vec<Self::ToolSpec>;

    /// Dispatch backend tool calls, one result per call in the order given
    async fn execute_tool_calls(&self, raw_calls: Vec<Self::RawToolCall>) -> Vec<ToolCallResult>;

    /// Register a tool on the embedded registry
    fn register_tool(
        &mut self,
        name: &str,
        function: Arc<dyn ToolFunction>,
        description: &str,
        parameters: ToolParameters,
    ) -> Option<ToolSchema> {
        self.base_mut()
            .register_tool(name, function, description, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ConversationTurn, Role};
    use crate::permissions::{
        FnCallback, PermissionManager, PermissionOptions, PermissionRequest, PermissionStatus,
    };
    use crate::tools::ToolCall;
    use std::collections::VecDeque;

    /// Adapter that answers from a script; `None` simulates a backend failure
    struct ScriptedAdapter {
        base: BaseAgent,
        replies: VecDeque<Option<String>>,
    }

    const SCRIPTED_PROMPT: &str = "scripted";

    impl ScriptedAdapter {
        fn new(replies: Vec<Option<&str>>) -> Self {
            let callback = Arc::new(FnCallback::new(|_req: &PermissionRequest| {
                Ok(PermissionStatus::Denied)
            }));
            let manager = PermissionManager::with_callback(PermissionOptions::new(), callback);
            Self {
                base: BaseAgent::new(Self::generate_system_prompt(), manager),
                replies: replies.into_iter().map(|r| r.map(String::from)).collect(),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        type ToolSpec = String;
        type RawToolCall = (String, Map<String, Value>);

        fn base(&self) -> &BaseAgent {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseAgent {
            &mut self.base
        }

        fn generate_system_prompt() -> String {
            SCRIPTED_PROMPT.to_string()
        }

        async fn chat(&mut self, message: &str, user_info: Option<&Map<String, Value>>) -> ChatOutcome {
            let formatted = BaseAgent::format_user_message(message, user_info);
            let request = self.base.messages_for(ConversationTurn::user(formatted.clone()));
            assert_eq!(request.len(), self.base.history().len() + 2);

            match self.replies.pop_front().flatten() {
                Some(reply) => {
                    self.base.commit_exchange(
                        ConversationTurn::user(formatted),
                        ConversationTurn::assistant(reply.clone()),
                    );
                    ChatOutcome::Text(reply)
                }
                None => ChatOutcome::Failed("Error communicating with backend: timed out".into()),
            }
        }

        fn prepare_tools(&self) -> Vec<String> {
            self.base.tools().tool_names().into_iter().map(String::from).collect()
        }

        async fn execute_tool_calls(&self, raw_calls: Vec<Self::RawToolCall>) -> Vec<ToolCallResult> {
            let calls = raw_calls
                .into_iter()
                .map(|(name, parameters)| ToolCall::new(name, parameters))
                .collect();
            self.base.execute_tool_calls(calls).await
        }
    }

    #[tokio::test]
    async fn test_history_alternates_after_successful_turns() {
        let mut agent = ScriptedAdapter::new(vec![Some("one"), Some("two"), Some("three")]);

        for question in ["a", "b", "c"] {
            assert!(!agent.chat(question, None).await.is_error());
        }

        let roles: Vec<Role> = agent.base().history().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(agent.base().system_prompt(), ScriptedAdapter::generate_system_prompt());
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        let mut agent = ScriptedAdapter::new(vec![Some("one"), None, Some("three")]);

        agent.chat("a", None).await;
        let failed = agent.chat("b", None).await;
        agent.chat("c", None).await;

        assert!(failed.is_error());
        assert_eq!(agent.base().history().len(), 4);
        assert_eq!(agent.base().history()[2].content.text(), "<user_query>\nc\n</user_query>");
    }

    #[tokio::test]
    async fn test_prepare_tools_is_stable_until_registry_changes() {
        let mut agent = ScriptedAdapter::new(vec![]);
        agent.base_mut().register_default_tools();

        let first = agent.prepare_tools();
        assert_eq!(first, agent.prepare_tools());

        agent.register_tool(
            "aaa_custom",
            Arc::new(crate::tools::tool_fn(|_| Ok(crate::tools::ToolOutput::success("")))),
            "custom",
            ToolParameters::new(),
        );
        let second = agent.prepare_tools();
        assert_eq!(second.len(), first.len() + 1);
        assert_eq!(second[0], "aaa_custom");

        let results = agent
            .execute_tool_calls(vec![("missing".to_string(), Map::new())])
            .await;
        assert_eq!(results[0].error.as_deref(), Some("Tool 'missing' not found"));
    }
}
