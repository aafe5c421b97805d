use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TranscriptRole {
    User,
    Assistant,
    /// Locally synthesized notices; never sent upstream.
    System,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::System => "system",
        }
    }

    pub fn to_api_role(self) -> Option<ApiRole> {
        match self {
            TranscriptRole::User => Some(ApiRole::User),
            TranscriptRole::Assistant => Some(ApiRole::Model),
            TranscriptRole::System => None,
        }
    }

    pub fn is_user(self) -> bool {
        self == TranscriptRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TranscriptRole::Assistant
    }

    pub fn is_system(self) -> bool {
        self == TranscriptRole::System
    }
}

impl TryFrom<&str> for TranscriptRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(TranscriptRole::User),
            "assistant" => Ok(TranscriptRole::Assistant),
            "system" => Ok(TranscriptRole::System),
            _ => Err(format!("invalid transcript role: {value}")),
        }
    }
}

impl TryFrom<String> for TranscriptRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<TranscriptRole> for String {
    fn from(value: TranscriptRole) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: TranscriptRole,
    pub content: String,
    pub created: DateTime<Utc>,
    /// Shown on screen only: neither stored nor sent upstream.
    #[serde(default)]
    pub local_only: bool,
}

impl Message {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created: Utc::now(),
            local_only: false,
        }
    }

    /// An assistant message that is displayed but never persisted, such as
    /// an introduction.
    pub fn local_assistant(content: impl Into<String>) -> Self {
        Self {
            local_only: true,
            ..Self::assistant(content)
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::System, content)
    }

    pub fn is_empty_placeholder(&self) -> bool {
        self.role.is_assistant() && self.content.is_empty()
    }

    /// Whether the message is part of the history the model sees.
    pub fn is_upstream(&self) -> bool {
        !self.local_only && !self.role.is_system() && !self.is_empty_placeholder()
    }
}
