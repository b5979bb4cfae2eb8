//! Conversation history shared by the orchestrators.

use serde::{Deserialize, Serialize};

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One message of the conversation that led to a create or edit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageItem {
    pub role: MessageRole,
    pub content: String,
}

impl MessageItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Render message history for prompt templates, one `role: content` line per
/// message, in order.
pub fn history_to_text(history: &[MessageItem]) -> String {
    history
        .iter()
        .map(|item| format!("{}: {}", item.role.as_str(), item.content))
        .collect::<Vec<_>>()
        .join("\n")
}
