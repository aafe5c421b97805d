//! Provider-neutral chat payloads shared by the engine and provider clients.

pub mod gemini;

use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Role of a message as seen by the remote model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ApiRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ApiRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ApiRole::Model,
            content: content.into(),
        }
    }
}

/// Everything a provider needs to produce one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
}

/// A structured function invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// A function the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of a non-streaming generation: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.tool_calls.is_empty()
    }
}

/// Failures reported by a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No API key could be resolved for the provider.
    MissingCredential {
        provider: String,
        env_vars: Vec<String>,
    },
    /// The persona references a provider that is not in the catalog.
    UnknownProvider(String),
    /// The request could not be sent or the connection dropped.
    Transport(String),
    /// The provider answered with a non-success status or an error payload.
    Api(String),
    /// The provider answered with something we could not parse.
    Malformed(String),
    /// The request had nothing to send.
    EmptyHistory,
    /// The provider does not implement the requested capability.
    Unsupported(&'static str),
    Timeout(Duration),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::MissingCredential { provider, env_vars } => {
                if env_vars.is_empty() {
                    write!(f, "No API key configured for {provider}")
                } else {
                    write!(
                        f,
                        "No API key configured. Please set {}",
                        env_vars.join(" or ")
                    )
                }
            }
            ProviderError::UnknownProvider(name) => {
                write!(f, "Unknown provider '{name}'. Use /set provider to pick one")
            }
            ProviderError::Transport(detail) => write!(f, "Connection failed: {detail}"),
            ProviderError::Api(detail) => write!(f, "{detail}"),
            ProviderError::Malformed(detail) => write!(f, "Unexpected response: {detail}"),
            ProviderError::EmptyHistory => write!(f, "No messages to send"),
            ProviderError::Unsupported(capability) => {
                write!(f, "Provider does not support {capability}")
            }
            ProviderError::Timeout(duration) => {
                write!(f, "Request timed out after {}s", duration.as_secs())
            }
        }
    }
}

impl std::error::Error for ProviderError {}

fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Turns a raw error body into a single readable line.
pub(crate) fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty response body>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API Error: {summary}");
            }
        }
        return format!("API Error: {json_value}");
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("API Error: {collapsed}")
}
