//! Conversation turns and chat results

use serde::{Deserialize, Serialize};

use crate::tools::ToolCallResult;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One piece of a multimodal turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Base64-encoded image
    Image { data: String },
}

/// Turn content: plain text or a list of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl TurnContent {
    /// Concatenated text of the content, images skipped
    pub fn text(&self) -> String {
        match self {
            TurnContent::Text(text) => text.clone(),
            TurnContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Base64 images carried by the content
    pub fn images(&self) -> Vec<&str> {
        match self {
            TurnContent::Text(_) => Vec::new(),
            TurnContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Image { data } => Some(data.as_str()),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        TurnContent::Text(text)
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        TurnContent::Text(text.to_string())
    }
}

/// One entry in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: TurnContent,
}

impl ConversationTurn {
    pub fn system(content: impl Into<TurnContent>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<TurnContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<TurnContent>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reply to a turn in which tools were called
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Final assistant message
    pub message: String,
    /// Every tool call made during the turn, in execution order
    pub tool_calls: Vec<ToolCallResult>,
    /// Reasoning reported by the backend, if any
    pub thinking: Option<String>,
}

/// What a `chat` call produced
///
/// `Text` and `Response` are both successful turns; `Failed` carries a
/// backend failure message and means nothing was added to the history.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Plain reply, no tools were called
    Text(String),
    /// Reply after one or more tool calls
    Response(AgentResponse),
    /// The backend could not complete the turn
    Failed(String),
}

impl ChatOutcome {
    /// Message to show the user
    pub fn message(&self) -> &str {
        match self {
            ChatOutcome::Text(text) => text,
            ChatOutcome::Response(response) => &response.message,
            ChatOutcome::Failed(message) => message,
        }
    }

    /// Tool calls made during the turn (empty unless `Response`)
    pub fn tool_calls(&self) -> &[ToolCallResult] {
        match self {
            ChatOutcome::Response(response) => &response.tool_calls,
            _ => &[],
        }
    }

    /// Whether the turn failed
    pub fn is_error(&self) -> bool {
        matches!(self, ChatOutcome::Failed(_))
    }
}
