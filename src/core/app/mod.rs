use crate::core::persona::Persona;
use crate::core::store::Conversation;

pub mod actions;
pub mod conversation;
pub mod persona_controller;
pub mod picker;
pub mod session;
pub mod ui_state;

pub use actions::{
    apply_action, apply_actions, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, AppCommand,
};
pub use conversation::ConversationController;
pub use persona_controller::PersonaController;
pub use picker::{PickerItem, PickerKind, PickerState};
pub use session::{EngineState, PendingRequest, RequestPurpose, SessionContext};
pub use ui_state::{ApiStatus, StatusIndicator, UiState};

pub struct App {
    pub session: SessionContext,
    pub ui: UiState,
}

impl App {
    pub fn new(session: SessionContext, ui: UiState) -> Self {
        Self { session, ui }
    }

    pub fn conversation(&mut self) -> ConversationController<'_> {
        ConversationController::new(&mut self.session, &mut self.ui)
    }

    pub fn personas(&mut self) -> PersonaController<'_> {
        PersonaController::new(&mut self.session, &mut self.ui)
    }

    /// Only the pending request's stream may touch the transcript.
    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.session
            .pending
            .as_ref()
            .is_some_and(|pending| pending.stream_id == stream_id)
    }

    pub fn persona(&self) -> &Persona {
        &self.session.persona
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.session.conversation.as_ref()
    }

    pub fn is_exit_requested(&self) -> bool {
        self.ui.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.ui.exit_requested = true;
    }
}
