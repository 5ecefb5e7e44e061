//! Conversation messages and backend reply normalization
//!
//! A `Message` is immutable once received. The backend is loose about the
//! shape of its replies, so every messages-bearing reply goes through
//! [`messages_from_reply`] before it reaches the renderer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const ROLE_USER: &str = "user";
pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_LLM: &str = "llm";

/// How `content` is to be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    /// Base64-encoded image bytes
    Image,
    /// Source text to be syntax-highlighted
    Code,
    /// Any `type` the console does not know; never rendered
    #[serde(other)]
    Unknown,
}

/// One unit of conversational content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

fn default_role() -> String {
    ROLE_SYSTEM.to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    pub fn new(role: impl Into<String>, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            kind,
            content: content.into(),
        }
    }

    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(role, MessageKind::Text, content)
    }

    pub fn code(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(role, MessageKind::Code, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ROLE_SYSTEM, content)
    }

    /// Label shown before the content, e.g. `ASSISTANT:`
    pub fn label(&self) -> String {
        format!("{}:", self.role.to_uppercase())
    }
}

/// Extract the messages carried by a backend reply.
///
/// Accepts `{messages: [...]}` (nested arrays are flattened, bare strings
/// become system text), `{messages: "..."}` and `{message: "..."}`. Anything
/// else yields no messages.
pub fn messages_from_reply(reply: &Value) -> Vec<Message> {
    let mut messages = Vec::new();
    match reply.get("messages") {
        Some(Value::Array(items)) => collect_messages(items, &mut messages),
        Some(Value::String(text)) => messages.push(Message::system(text.as_str())),
        _ => {
            if let Some(text) = reply.get("message").and_then(Value::as_str) {
                messages.push(Message::system(text));
            }
        }
    }
    messages
}

fn collect_messages(items: &[Value], out: &mut Vec<Message>) {
    for item in items {
        match item {
            Value::Array(nested) => collect_messages(nested, out),
            Value::String(text) => out.push(Message::system(text.as_str())),
            Value::Object(_) => match serde_json::from_value::<Message>(item.clone()) {
                Ok(message) => out.push(message),
                Err(e) => tracing::warn!(error = %e, "skipping malformed message in reply"),
            },
            other => tracing::debug!(value = %other, "ignoring non-message entry in reply"),
        }
    }
}
