use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{Conversation, PersonaRegistry, StoreError, StoredMessage, TranscriptStore};
use crate::core::builtin_providers::default_provider;
use crate::core::message::TranscriptRole;
use crate::core::persona::{builtin_personas, NewPersona, Palette, Persona};

const SCHEMA: &str = include_str!("schema.sql");

const PERSONA_COLUMNS: &str = "SELECT p.id, p.name, p.system_prompt, p.provider, p.model, \
     p.palette, p.ascii_art, p.image_url, p.created, \
     COALESCE(s.active_persona_id = p.id, 0) \
     FROM personas p LEFT JOIN session_state s ON s.singleton = 1";

const CONVERSATION_COLUMNS: &str = "SELECT c.id, c.persona_id, c.name, c.created, \
     COALESCE(s.active_conversation_id = c.id, 0) \
     FROM conversations c LEFT JOIN session_state s ON s.singleton = 1";

fn persona_from_row(row: &Row<'_>) -> rusqlite::Result<Persona> {
    let palette_json: String = row.get(5)?;
    let palette = Palette::from_json(&palette_json)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(err)))?;
    Ok(Persona {
        id: row.get(0)?,
        name: row.get(1)?,
        system_prompt: row.get(2)?,
        provider_name: row.get(3)?,
        model_name: row.get(4)?,
        palette,
        ascii_art: row.get(6)?,
        image_url: row.get(7)?,
        created: row.get(8)?,
        is_active: row.get(9)?,
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        persona_id: row.get(1)?,
        name: row.get(2)?,
        created: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let role: String = row.get(2)?;
    let role = TranscriptRole::try_from(role)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, err.into()))?;
    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created: row.get(4)?,
    })
}

/// SQLite implementation of both storage traits.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`. A fresh database is
    /// seeded with the built-in personas; every open starts with no active
    /// conversation.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened transcript store");
        Self::initialize(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        let mut store = Self { conn };
        store.seed_if_empty()?;
        store.ensure_active_persona()?;
        store.clear_active_conversations()?;
        Ok(store)
    }

    fn seed_if_empty(&mut self) -> Result<(), StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM personas", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let provider = default_provider();
        let seeds = builtin_personas(&provider.id, &provider.default_model);
        let tx = self.conn.transaction()?;
        for seed in &seeds {
            insert_persona(&tx, seed)?;
        }
        tx.execute(
            "UPDATE session_state SET active_persona_id = (SELECT MIN(id) FROM personas)",
            [],
        )?;
        tx.commit()?;
        debug!(count = seeds.len(), "seeded built-in personas");
        Ok(())
    }

    fn ensure_active_persona(&mut self) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE session_state SET active_persona_id = (SELECT MIN(id) FROM personas) \
             WHERE active_persona_id IS NULL \
                OR active_persona_id NOT IN (SELECT id FROM personas)",
            [],
        )?;
        Ok(())
    }

    fn persona_by_id(&self, id: i64) -> Result<Persona, StoreError> {
        self.conn
            .query_row(
                &format!("{PERSONA_COLUMNS} WHERE p.id = ?1"),
                params![id],
                persona_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("persona", id))
    }

    fn find_persona(&self, name: &str) -> Result<Option<Persona>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("{PERSONA_COLUMNS} WHERE p.name = ?1 COLLATE NOCASE"),
                params![name],
                persona_from_row,
            )
            .optional()?)
    }
}

fn insert_persona(conn: &Connection, persona: &NewPersona) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO personas \
         (name, system_prompt, provider, model, palette, ascii_art, image_url, created) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            persona.name,
            persona.system_prompt,
            persona.provider_name,
            persona.model_name,
            persona.palette.to_json(),
            persona.ascii_art,
            persona.image_url,
            Utc::now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl TranscriptStore for SqliteStore {
    fn create_conversation(
        &mut self,
        name: &str,
        persona_id: i64,
    ) -> Result<Conversation, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO conversations (persona_id, name, created) VALUES (?1, ?2, ?3)",
            params![persona_id, name, Utc::now()],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE session_state SET active_conversation_id = ?1",
            params![id],
        )?;
        tx.commit()?;
        debug!(id, name, "created conversation");
        self.get_conversation(id)
    }

    fn append_message(
        &mut self,
        conversation_id: i64,
        role: TranscriptRole,
        content: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO messages (conversation_id, role, content, created) \
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, role.as_str(), content, Utc::now()],
        )?;
        Ok(())
    }

    fn list_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, role, content, created FROM messages \
             WHERE conversation_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], message_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn list_conversations(&self, persona_id: i64) -> Result<Vec<Conversation>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONVERSATION_COLUMNS} WHERE c.persona_id = ?1 ORDER BY c.created DESC, c.id DESC"
        ))?;
        let rows = stmt.query_map(params![persona_id], conversation_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_conversation(&self, id: i64) -> Result<Conversation, StoreError> {
        self.conn
            .query_row(
                &format!("{CONVERSATION_COLUMNS} WHERE c.id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("conversation", id))
    }

    fn set_active_conversation(&mut self, id: i64) -> Result<Conversation, StoreError> {
        self.get_conversation(id)?;
        self.conn.execute(
            "UPDATE session_state SET active_conversation_id = ?1",
            params![id],
        )?;
        self.get_conversation(id)
    }

    fn clear_active_conversations(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute("UPDATE session_state SET active_conversation_id = NULL", [])?;
        Ok(())
    }

    fn rename_conversation(&mut self, id: i64, name: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE conversations SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("conversation", id));
        }
        Ok(())
    }

    fn delete_conversation(&mut self, id: i64) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("conversation", id));
        }
        Ok(())
    }
}

impl PersonaRegistry for SqliteStore {
    fn get_active_persona(&self) -> Result<Persona, StoreError> {
        self.conn
            .query_row(
                &format!("{PERSONA_COLUMNS} WHERE p.id = s.active_persona_id"),
                [],
                persona_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("persona", "active"))
    }

    fn list_personas(&self) -> Result<Vec<Persona>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSONA_COLUMNS} ORDER BY p.id ASC"))?;
        let rows = stmt.query_map([], persona_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_persona_by_name(&self, name: &str) -> Result<Persona, StoreError> {
        self.find_persona(name)?
            .ok_or_else(|| StoreError::not_found("persona", name))
    }

    fn set_active_persona(&mut self, name: &str) -> Result<Persona, StoreError> {
        let persona = self.get_persona_by_name(name)?;
        self.conn.execute(
            "UPDATE session_state SET active_persona_id = ?1, active_conversation_id = NULL",
            params![persona.id],
        )?;
        self.persona_by_id(persona.id)
    }

    fn update_active_persona_provider(
        &mut self,
        provider_name: &str,
        default_model: &str,
    ) -> Result<Persona, StoreError> {
        let active = self.get_active_persona()?;
        self.conn.execute(
            "UPDATE personas SET provider = ?1, model = ?2 WHERE id = ?3",
            params![provider_name, default_model, active.id],
        )?;
        self.persona_by_id(active.id)
    }

    fn update_active_persona_model(&mut self, model_name: &str) -> Result<Persona, StoreError> {
        let active = self.get_active_persona()?;
        self.conn.execute(
            "UPDATE personas SET model = ?1 WHERE id = ?2",
            params![model_name, active.id],
        )?;
        self.persona_by_id(active.id)
    }

    fn update_active_persona_prompt(
        &mut self,
        system_prompt: &str,
    ) -> Result<Persona, StoreError> {
        let active = self.get_active_persona()?;
        self.conn.execute(
            "UPDATE personas SET system_prompt = ?1 WHERE id = ?2",
            params![system_prompt, active.id],
        )?;
        self.persona_by_id(active.id)
    }

    fn create_persona(&mut self, persona: &NewPersona) -> Result<Persona, StoreError> {
        if self.find_persona(&persona.name)?.is_some() {
            return Err(StoreError::Duplicate {
                entity: "persona",
                key: persona.name.clone(),
            });
        }
        let id = insert_persona(&self.conn, persona)?;
        self.persona_by_id(id)
    }
}
