//! Ollama backend adapter
//!
//! Talks to a locally hosted Ollama server over its HTTP API:
//! - `GET /api/tags` once at construction to check the server is reachable
//! - `POST /api/chat` (non-streaming) for every model request
//!
//! Tool calls in a reply are run through the shared pipeline and their
//! results sent back as `tool` messages until the model answers without
//! calling tools or the round limit is hit.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

use super::env_guard::EnvVarGuard;
use crate::agent::{
    AgentConfig, AgentResponse, BaseAgent, ChatOutcome, ContentPart, ConversationTurn,
    ProviderAdapter, Role, TurnContent,
};
use crate::core::{AgentError, AgentResult};
use crate::tools::{ToolCall, ToolCallResult, ToolParameters};

/// Timeout for the connectivity check at construction
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "\
You are an agentic coding assistant running on a locally hosted Ollama model.

You are pair programming with the USER on their coding task: creating a new project, \
changing or debugging an existing one, or answering a question. Each USER message is \
wrapped in a <user_query> block. It may be preceded by a <user_info> block describing \
the USER's editor state; use it when it is relevant.

<tool_calling>
1. Follow each tool's schema exactly and provide every required parameter.
2. Only call tools that are provided to you.
3. Do not mention tool names to the USER; describe what you are doing instead.
4. Only call tools when they are needed. If you already know the answer, reply directly.
5. Some operations need the USER's approval. If a tool reports that permission was \
denied, do not retry it; explain what you wanted to do.
</tool_calling>

<making_code_changes>
Do not print code to the USER unless asked; use the edit tools to make changes. \
Read the part of a file you are changing before editing it. Code you write must run \
as-is: add imports, dependencies and configuration it needs.
</making_code_changes>
";

// ============================================================================
// Wire types
// ============================================================================

/// Tool description in Ollama's function-calling format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OllamaFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunction {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// A tool call as Ollama returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    /// Usually an object; some models send a JSON string instead
    #[serde(default)]
    pub arguments: Value,
}

impl OllamaToolCall {
    /// Convert into a backend-neutral call
    ///
    /// Arguments that are neither an object nor a string holding one become
    /// an empty map.
    pub fn into_tool_call(self) -> ToolCall {
        let parameters = match self.function.arguments {
            Value::Object(map) => map,
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        ToolCall::new(self.function.name, parameters)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl WireMessage {
    fn tool_result(result: &ToolCallResult) -> Self {
        let content = match result.error {
            Some(ref error) if result.output.is_empty() => format!("Error: {}", error),
            Some(ref error) => format!("Error: {}\n{}", error, result.output),
            None => result.output.clone(),
        };
        Self {
            role: "tool".to_string(),
            content,
            tool_name: Some(result.name.clone()),
            ..Default::default()
        }
    }
}

impl From<&ConversationTurn> for WireMessage {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: turn.content.text(),
            images: turn.content.images().into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    stream: bool,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [OllamaTool],
    options: Map<String, Value>,
}

fn no_tools(tools: &&[OllamaTool]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

fn base_model_name(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

// ============================================================================
// Agent
// ============================================================================

/// Agent backed by a local Ollama server
pub struct OllamaAgent {
    base: BaseAgent,
    client: reqwest::Client,
    host: String,
    model: String,
    temperature: f64,
    options: Map<String, Value>,
    timeout: Duration,
    max_tool_rounds: usize,
    /// Keeps `OLLAMA_HOST` exported while the agent lives
    _host_env: Option<EnvVarGuard>,
}

impl OllamaAgent {
    /// Connect to the server and build the agent
    ///
    /// Fails with `AgentError::Connection` if the server cannot be reached;
    /// no agent exists in that case. A model missing from the server's list
    /// only produces a warning.
    pub async fn connect(config: AgentConfig) -> AgentResult<Self> {
        let host = config.resolved_host();
        tracing::info!("[OllamaAgent] Connecting to {} (model: {})", host, config.model);

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AgentError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        let available = Self::list_models(&client, &host).await?;
        let wanted = base_model_name(&config.model);
        if !available.iter().any(|name| base_model_name(name) == wanted) {
            tracing::warn!(
                "[OllamaAgent] Model '{}' not found on {}. Run `ollama pull {}` to download it",
                config.model,
                host,
                config.model
            );
        }

        let host_env = config
            .export_host_env
            .then(|| EnvVarGuard::set("OLLAMA_HOST", &host));

        let base = BaseAgent::from_config(&config, Self::generate_system_prompt());

        tracing::info!("[OllamaAgent] Connected to {}", host);
        Ok(Self {
            base,
            client,
            host,
            model: config.model,
            temperature: config.temperature,
            options: config.options,
            timeout: config.timeout,
            max_tool_rounds: config.max_tool_rounds,
            _host_env: host_env,
        })
    }

    async fn list_models(client: &reqwest::Client, host: &str) -> AgentResult<Vec<String>> {
        let url = format!("{}/api/tags", host);
        let response = tokio::time::timeout(CONNECT_TIMEOUT, client.get(&url).send())
            .await
            .map_err(|_| {
                AgentError::Connection(format!("Could not connect to Ollama at {}: timed out", host))
            })?
            .map_err(|e| {
                AgentError::Connection(format!(
                    "Could not connect to Ollama at {}: {}. Make sure Ollama is running",
                    host, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(AgentError::Connection(format!(
                "Ollama at {} answered {}",
                host,
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await.map_err(|e| {
            AgentError::Connection(format!("Unexpected response from {}: {}", url, e))
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Model name sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Server address
    pub fn host(&self) -> &str {
        &self.host
    }

    fn request_options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("temperature".to_string(), Value::from(self.temperature));
        for (key, value) in &self.options {
            options.insert(key.clone(), value.clone());
        }
        options
    }

    /// Send one `/api/chat` request under the configured timeout
    async fn send_chat(&self, messages: &[WireMessage], tools: &[OllamaTool]) -> AgentResult<WireMessage> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            tools,
            options: self.request_options(),
        };

        tracing::debug!(
            "[OllamaAgent] Sending {} messages with {} tools",
            messages.len(),
            tools.len()
        );

        let url = format!("{}/api/chat", self.host);
        let call = async {
            let response = self.client.post(&url).json(&request).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AgentError::Backend(format!("Ollama API error ({}): {}", status, text)));
            }
            let body: ChatResponse = response.json().await?;
            Ok::<_, AgentError>(body.message)
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Ask the model about local images
    ///
    /// A one-off request: the conversation history is neither sent nor changed.
    pub async fn query_image<P: AsRef<Path>>(&self, image_paths: &[P], query: &str) -> AgentResult<String> {
        let mut parts = vec![ContentPart::Text {
            text: query.to_string(),
        }];
        for path in image_paths {
            let bytes = tokio::fs::read(path.as_ref()).await?;
            parts.push(ContentPart::Image {
                data: BASE64.encode(bytes),
            });
        }

        tracing::info!("[OllamaAgent] Querying {} images", image_paths.len());

        let messages = [
            WireMessage::from(&ConversationTurn::system(self.base.system_prompt())),
            WireMessage::from(&ConversationTurn::user(TurnContent::Parts(parts))),
        ];
        let reply = self.send_chat(&messages, &[]).await?;
        Ok(reply.content)
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAgent {
    type ToolSpec = OllamaTool;
    type RawToolCall = OllamaToolCall;

    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseAgent {
        &mut self.base
    }

    fn generate_system_prompt() -> String {
        SYSTEM_PROMPT.to_string()
    }

    async fn chat(&mut self, message: &str, user_info: Option<&Map<String, Value>>) -> ChatOutcome {
        let user_turn = ConversationTurn::user(BaseAgent::format_user_message(message, user_info));
        let mut messages: Vec<WireMessage> = self
            .base
            .messages_for(user_turn.clone())
            .iter()
            .map(WireMessage::from)
            .collect();
        let tools = self.prepare_tools();

        let mut tool_results: Vec<ToolCallResult> = Vec::new();
        let mut thinking: Vec<String> = Vec::new();
        let mut rounds = 0;

        let content = loop {
            let reply = match self.send_chat(&messages, &tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!("[OllamaAgent] Chat failed: {}", e);
                    return ChatOutcome::Failed(format!("Error communicating with Ollama: {}", e));
                }
            };

            if let Some(ref text) = reply.thinking {
                if !text.trim().is_empty() {
                    thinking.push(text.clone());
                }
            }

            if reply.tool_calls.is_empty() {
                break reply.content;
            }
            if rounds >= self.max_tool_rounds {
                tracing::warn!(
                    "[OllamaAgent] Tool round limit ({}) reached, ignoring {} further calls",
                    self.max_tool_rounds,
                    reply.tool_calls.len()
                );
                break reply.content;
            }
            rounds += 1;

            let calls = reply.tool_calls.clone();
            messages.push(WireMessage {
                role: "assistant".to_string(),
                content: reply.content,
                tool_calls: reply.tool_calls,
                ..Default::default()
            });

            let results = self.execute_tool_calls(calls).await;
            messages.extend(results.iter().map(WireMessage::tool_result));
            tool_results.extend(results);
        };

        self.base
            .commit_exchange(user_turn, ConversationTurn::assistant(content.clone()));

        if tool_results.is_empty() {
            ChatOutcome::Text(content)
        } else {
            ChatOutcome::Response(AgentResponse {
                message: content,
                tool_calls: tool_results,
                thinking: (!thinking.is_empty()).then(|| thinking.join("\n")),
            })
        }
    }

    fn prepare_tools(&self) -> Vec<OllamaTool> {
        self.base
            .tools()
            .schemas()
            .map(|schema| OllamaTool {
                tool_type: "function".to_string(),
                function: OllamaFunction {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.parameters.clone(),
                },
            })
            .collect()
    }

    async fn execute_tool_calls(&self, raw_calls: Vec<OllamaToolCall>) -> Vec<ToolCallResult> {
        let calls = raw_calls
            .into_iter()
            .map(OllamaToolCall::into_tool_call)
            .collect();
        self.base.execute_tool_calls(calls).await
    }
}

impl std::fmt::Debug for OllamaAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaAgent")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_arguments() {
        let object: OllamaToolCall = serde_json::from_value(json!({
            "function": { "name": "read_file", "arguments": { "target_file": "a.rs" } }
        }))
        .unwrap();
        let call = object.into_tool_call();
        assert_eq!(call.name, "read_file");
        assert_eq!(call.parameters["target_file"], "a.rs");

        let string: OllamaToolCall = serde_json::from_value(json!({
            "function": { "name": "read_file", "arguments": "{\"target_file\": \"b.rs\"}" }
        }))
        .unwrap();
        assert_eq!(string.into_tool_call().parameters["target_file"], "b.rs");

        let missing: OllamaToolCall =
            serde_json::from_value(json!({ "function": { "name": "list_directory" } })).unwrap();
        assert!(missing.into_tool_call().parameters.is_empty());
    }

    #[test]
    fn test_tool_result_message() {
        let failed = ToolCallResult {
            name: "delete_file".into(),
            parameters: Map::new(),
            output: String::new(),
            error: Some("Permission denied: not allowed to delete a.txt".into()),
        };
        let message = WireMessage::tool_result(&failed);
        assert_eq!(message.role, "tool");
        assert_eq!(message.tool_name.as_deref(), Some("delete_file"));
        assert_eq!(message.content, "Error: Permission denied: not allowed to delete a.txt");
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![WireMessage::from(&ConversationTurn::user("hi"))];
        let request = ChatRequest {
            model: "llama3.1",
            messages: &messages,
            stream: false,
            tools: &[],
            options: Map::new(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], false);
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"][0], json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn test_base_model_name() {
        assert_eq!(base_model_name("llama3.1:latest"), "llama3.1");
        assert_eq!(base_model_name("llama3.1"), "llama3.1");
    }
}
