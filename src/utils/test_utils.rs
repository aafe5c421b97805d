use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{GenerationRequest, ProviderError, ToolCall, ToolDefinition, ToolResponse};
use crate::core::app::{apply_action, App, AppAction, AppActionContext, AppCommand};
use crate::core::app::{SessionContext, UiState};
use crate::core::chat_stream::{ChatStreamService, StreamSink};
use crate::core::message::TranscriptRole;
use crate::core::persona::{NewPersona, Persona};
use crate::core::provider::{GenerationProvider, ProviderCapabilities};
use crate::core::store::{
    Conversation, PersonaRegistry, SqliteStore, StoreError, StoredMessage, TranscriptStore,
};

/// One canned answer for [`ScriptedProvider`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Chunks(Vec<String>),
    ChunksThenError(Vec<String>, ProviderError),
    Error(ProviderError),
    /// Text fragments followed by tool calls on the same stream.
    ChunksThenToolCalls(Vec<String>, Vec<ToolCall>),
    ToolCalls(Vec<ToolCall>),
    /// Never answers.
    Stall,
}

/// Provider that replays [`ScriptedReply`] values in order and records every
/// request it receives.
pub struct ScriptedProvider {
    capabilities: ProviderCapabilities,
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedProvider {
    pub fn new(capabilities: ProviderCapabilities, replies: Vec<ScriptedReply>) -> Self {
        Self {
            capabilities,
            replies: Mutex::new(replies.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn plain(replies: Vec<ScriptedReply>) -> Self {
        Self::new(ProviderCapabilities::plain(), replies)
    }

    pub fn streaming(replies: Vec<ScriptedReply>) -> Self {
        Self::new(
            ProviderCapabilities {
                streaming: true,
                tools: false,
            },
            replies,
        )
    }

    /// Tool calling without streaming: every reply arrives complete.
    pub fn tools_only(replies: Vec<ScriptedReply>) -> Self {
        Self::new(
            ProviderCapabilities {
                streaming: false,
                tools: true,
            },
            replies,
        )
    }

    pub fn full(replies: Vec<ScriptedReply>) -> Self {
        Self::new(ProviderCapabilities::full(), replies)
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<GenerationRequest>>> {
        Arc::clone(&self.requests)
    }

    fn next(&self, request: &GenerationRequest) -> ScriptedReply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::Text(String::new()))
    }

    async fn stream(&self, request: &GenerationRequest, sink: &StreamSink) -> Result<(), ProviderError> {
        match self.next(request) {
            ScriptedReply::Text(text) => {
                sink.text(text);
                Ok(())
            }
            ScriptedReply::Chunks(chunks) => {
                for chunk in chunks {
                    sink.text(chunk);
                }
                Ok(())
            }
            ScriptedReply::ChunksThenError(chunks, err) => {
                for chunk in chunks {
                    sink.text(chunk);
                }
                Err(err)
            }
            ScriptedReply::Error(err) => Err(err),
            ScriptedReply::ChunksThenToolCalls(chunks, calls) => {
                for chunk in chunks {
                    sink.text(chunk);
                }
                sink.tool_calls(calls);
                Ok(())
            }
            ScriptedReply::ToolCalls(calls) => {
                sink.tool_calls(calls);
                Ok(())
            }
            ScriptedReply::Stall => {
                futures_util::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.generate_with_tools(request, &[])
            .await
            .map(|response| response.text)
    }

    async fn generate_streaming(
        &self,
        request: &GenerationRequest,
        sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        self.stream(request, sink).await
    }

    async fn generate_with_tools(
        &self,
        request: &GenerationRequest,
        _tools: &[ToolDefinition],
    ) -> Result<ToolResponse, ProviderError> {
        match self.next(request) {
            ScriptedReply::Text(text) => Ok(ToolResponse::text(text)),
            ScriptedReply::Chunks(chunks) => Ok(ToolResponse::text(chunks.concat())),
            ScriptedReply::ChunksThenError(_, err) | ScriptedReply::Error(err) => Err(err),
            ScriptedReply::ChunksThenToolCalls(chunks, tool_calls) => Ok(ToolResponse {
                text: chunks.concat(),
                tool_calls,
            }),
            ScriptedReply::ToolCalls(tool_calls) => Ok(ToolResponse {
                text: String::new(),
                tool_calls,
            }),
            ScriptedReply::Stall => {
                futures_util::future::pending::<()>().await;
                Ok(ToolResponse::default())
            }
        }
    }

    async fn generate_streaming_with_tools(
        &self,
        request: &GenerationRequest,
        _tools: &[ToolDefinition],
        sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        self.stream(request, sink).await
    }
}

pub fn create_test_app() -> App {
    create_test_app_with(ScriptedProvider::plain(Vec::new()))
}

/// An app over a fresh in-memory database whose every provider is
/// `provider`.
pub fn create_test_app_with(provider: ScriptedProvider) -> App {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    create_test_app_with_store(Box::new(store), provider)
}

pub fn create_test_app_with_store(
    store: Box<dyn crate::core::store::ChatStore>,
    provider: ScriptedProvider,
) -> App {
    let provider: Arc<dyn GenerationProvider> = Arc::new(provider);
    let session = SessionContext::new(
        store,
        Box::new(move |_| Arc::clone(&provider)),
        None,
        true,
    )
    .expect("session");
    App::new(session, UiState::new(2000))
}

/// Runs `commands` and feeds every worker message back into the app until
/// no request is pending.
pub async fn run_until_idle(app: &mut App, commands: Vec<AppCommand>) {
    let (service, mut rx) = ChatStreamService::new();
    let spawn = |command: AppCommand| match command {
        AppCommand::SpawnStream(params) => {
            service.spawn_stream(params);
        }
    };
    for command in commands {
        spawn(command);
    }

    while app.session.pending.is_some() {
        let (message, stream_id) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("worker answered in time")
            .expect("channel open");
        let action = AppAction::from_stream(message, stream_id);
        if let Some(command) = apply_action(app, action, AppActionContext::default()) {
            spawn(command);
        }
    }
}

pub fn transcript(app: &App) -> Vec<(TranscriptRole, String)> {
    app.ui
        .messages
        .iter()
        .map(|message| (message.role, message.content.clone()))
        .collect()
}

/// Which [`FailingStore`] operations fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub create_conversation: bool,
    pub append_message: bool,
}

/// Wraps an in-memory store and fails the selected operations with a
/// disk-full error.
pub struct FailingStore {
    inner: SqliteStore,
    pub failures: Failures,
}

impl FailingStore {
    pub fn new(failures: Failures) -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("in-memory store"),
            failures,
        }
    }

    fn disk_full() -> StoreError {
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            Some("database or disk is full".to_string()),
        ))
    }
}

impl TranscriptStore for FailingStore {
    fn create_conversation(
        &mut self,
        name: &str,
        persona_id: i64,
    ) -> Result<Conversation, StoreError> {
        if self.failures.create_conversation {
            return Err(Self::disk_full());
        }
        self.inner.create_conversation(name, persona_id)
    }

    fn append_message(
        &mut self,
        conversation_id: i64,
        role: TranscriptRole,
        content: &str,
    ) -> Result<(), StoreError> {
        if self.failures.append_message {
            return Err(Self::disk_full());
        }
        self.inner.append_message(conversation_id, role, content)
    }

    fn list_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        self.inner.list_messages(conversation_id)
    }

    fn list_conversations(&self, persona_id: i64) -> Result<Vec<Conversation>, StoreError> {
        self.inner.list_conversations(persona_id)
    }

    fn get_conversation(&self, id: i64) -> Result<Conversation, StoreError> {
        self.inner.get_conversation(id)
    }

    fn set_active_conversation(&mut self, id: i64) -> Result<Conversation, StoreError> {
        self.inner.set_active_conversation(id)
    }

    fn clear_active_conversations(&mut self) -> Result<(), StoreError> {
        self.inner.clear_active_conversations()
    }

    fn rename_conversation(&mut self, id: i64, name: &str) -> Result<(), StoreError> {
        self.inner.rename_conversation(id, name)
    }

    fn delete_conversation(&mut self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_conversation(id)
    }
}

impl PersonaRegistry for FailingStore {
    fn get_active_persona(&self) -> Result<Persona, StoreError> {
        self.inner.get_active_persona()
    }

    fn list_personas(&self) -> Result<Vec<Persona>, StoreError> {
        self.inner.list_personas()
    }

    fn get_persona_by_name(&self, name: &str) -> Result<Persona, StoreError> {
        self.inner.get_persona_by_name(name)
    }

    fn set_active_persona(&mut self, name: &str) -> Result<Persona, StoreError> {
        self.inner.set_active_persona(name)
    }

    fn update_active_persona_provider(
        &mut self,
        provider_name: &str,
        default_model: &str,
    ) -> Result<Persona, StoreError> {
        self.inner
            .update_active_persona_provider(provider_name, default_model)
    }

    fn update_active_persona_model(&mut self, model_name: &str) -> Result<Persona, StoreError> {
        self.inner.update_active_persona_model(model_name)
    }

    fn update_active_persona_prompt(
        &mut self,
        system_prompt: &str,
    ) -> Result<Persona, StoreError> {
        self.inner.update_active_persona_prompt(system_prompt)
    }

    fn create_persona(&mut self, persona: &NewPersona) -> Result<Persona, StoreError> {
        self.inner.create_persona(persona)
    }
}
