//! Durable storage for conversations, messages, and personas.
//!
//! The engine talks to storage only through [`TranscriptStore`] and
//! [`PersonaRegistry`]; [`SqliteStore`] implements both.

mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use crate::core::message::{Message, TranscriptRole};
use crate::core::persona::{NewPersona, Persona};

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: i64,
    pub persona_id: i64,
    pub name: String,
    pub is_active: bool,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: TranscriptRole,
    pub content: String,
    pub created: DateTime<Utc>,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        Message {
            role: stored.role,
            content: stored.content,
            created: stored.created,
            local_only: false,
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// The database rejected a statement.
    Sqlite(rusqlite::Error),
    /// The database directory could not be created.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    NotFound {
        entity: &'static str,
        key: String,
    },
    Duplicate {
        entity: &'static str,
        key: String,
    },
    /// A stored value failed validation on read.
    Corrupt(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(err) => write!(f, "database error: {err}"),
            StoreError::Io { path, source } => {
                write!(f, "cannot prepare {}: {source}", path.display())
            }
            StoreError::NotFound { entity, key } => write!(f, "{entity} '{key}' not found"),
            StoreError::Duplicate { entity, key } => write!(f, "{entity} '{key}' already exists"),
            StoreError::Corrupt(detail) => write!(f, "corrupt record: {detail}"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Sqlite(err) => Some(err),
            StoreError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

/// Append-only message log grouped into conversations.
pub trait TranscriptStore {
    /// Creates a conversation and makes it the only active one.
    fn create_conversation(&mut self, name: &str, persona_id: i64)
        -> Result<Conversation, StoreError>;

    fn append_message(
        &mut self,
        conversation_id: i64,
        role: TranscriptRole,
        content: &str,
    ) -> Result<(), StoreError>;

    /// Messages in insertion order.
    fn list_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, StoreError>;

    /// Newest first.
    fn list_conversations(&self, persona_id: i64) -> Result<Vec<Conversation>, StoreError>;

    fn get_conversation(&self, id: i64) -> Result<Conversation, StoreError>;

    fn set_active_conversation(&mut self, id: i64) -> Result<Conversation, StoreError>;

    /// Idempotent.
    fn clear_active_conversations(&mut self) -> Result<(), StoreError>;

    fn rename_conversation(&mut self, id: i64, name: &str) -> Result<(), StoreError>;

    /// Removes the conversation and its messages.
    fn delete_conversation(&mut self, id: i64) -> Result<(), StoreError>;
}

/// Persona records and the single active selection.
pub trait PersonaRegistry {
    fn get_active_persona(&self) -> Result<Persona, StoreError>;

    fn list_personas(&self) -> Result<Vec<Persona>, StoreError>;

    /// Case-insensitive.
    fn get_persona_by_name(&self, name: &str) -> Result<Persona, StoreError>;

    /// Atomically deactivates the previous persona.
    fn set_active_persona(&mut self, name: &str) -> Result<Persona, StoreError>;

    fn update_active_persona_provider(
        &mut self,
        provider_name: &str,
        default_model: &str,
    ) -> Result<Persona, StoreError>;

    fn update_active_persona_model(&mut self, model_name: &str) -> Result<Persona, StoreError>;

    fn update_active_persona_prompt(&mut self, system_prompt: &str)
        -> Result<Persona, StoreError>;

    fn create_persona(&mut self, persona: &NewPersona) -> Result<Persona, StoreError>;
}

/// Everything the session needs from storage.
pub trait ChatStore: TranscriptStore + PersonaRegistry + Send {}

impl<T: TranscriptStore + PersonaRegistry + Send> ChatStore for T {}
