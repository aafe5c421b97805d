use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::persona::Persona;
use crate::core::provider::{DispatchMode, GenerationProvider};
use crate::core::providers::ProviderFactory;
use crate::core::store::{ChatStore, Conversation, StoreError};

/// Where the engine is in the life of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingDispatch,
    Streaming,
    ToolDispatch,
    Completing,
}

impl EngineState {
    pub fn label(self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::AwaitingDispatch => "awaiting-dispatch",
            EngineState::Streaming => "streaming",
            EngineState::ToolDispatch => "tool-dispatch",
            EngineState::Completing => "completing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPurpose {
    /// A reply to the user; persisted when it completes.
    Turn,
    /// A greeting after a persona switch; displayed only.
    Introduction,
}

/// The one request that may be in flight.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub stream_id: u64,
    pub purpose: RequestPurpose,
    pub cancel_token: CancellationToken,
    /// Index of the assistant placeholder in the transcript cache, if the
    /// request streams.
    pub placeholder: Option<usize>,
}

pub struct SessionContext {
    pub store: Box<dyn ChatStore>,
    pub persona: Persona,
    pub conversation: Option<Conversation>,
    pub provider: Arc<dyn GenerationProvider>,
    pub dispatch_mode: DispatchMode,
    provider_factory: ProviderFactory,
    pub engine_state: EngineState,
    pub pending: Option<PendingRequest>,
    pub current_stream_id: u64,
    pub request_timeout: Option<Duration>,
    pub introduce_on_switch: bool,
}

impl SessionContext {
    pub fn new(
        store: Box<dyn ChatStore>,
        provider_factory: ProviderFactory,
        request_timeout: Option<Duration>,
        introduce_on_switch: bool,
    ) -> Result<Self, StoreError> {
        let persona = store.get_active_persona()?;
        let provider = provider_factory(&persona.provider_name);
        let dispatch_mode = DispatchMode::select(provider.capabilities());
        info!(
            persona = %persona.name,
            provider = provider.name(),
            model = %persona.model_name,
            mode = dispatch_mode.label(),
            "session ready"
        );

        Ok(Self {
            store,
            persona,
            conversation: None,
            provider,
            dispatch_mode,
            provider_factory,
            engine_state: EngineState::Idle,
            pending: None,
            current_stream_id: 0,
            request_timeout,
            introduce_on_switch,
        })
    }

    /// Reconstructs the provider after the persona's provider changed. The
    /// dispatch mode is chosen here and nowhere else.
    pub fn rebuild_provider(&mut self) {
        self.provider = (self.provider_factory)(&self.persona.provider_name);
        self.dispatch_mode = DispatchMode::select(self.provider.capabilities());
        info!(
            provider = self.provider.name(),
            mode = self.dispatch_mode.label(),
            "provider rebuilt"
        );
    }

    pub fn next_stream_id(&mut self) -> u64 {
        self.current_stream_id += 1;
        self.current_stream_id
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation.as_ref().map(|conversation| conversation.id)
    }
}
