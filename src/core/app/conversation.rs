use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{EngineState, PendingRequest, RequestPurpose, SessionContext};
use super::ui_state::{ApiStatus, StatusIndicator, UiState};
use crate::api::{ChatMessage, GenerationRequest};
use crate::core::chat_stream::StreamParams;
use crate::core::message::{Message, TranscriptRole};
use crate::core::provider::DispatchMode;
use crate::core::store::StoreError;
use crate::core::tools::tool_definitions;

pub const INTRODUCTION_PROMPT: &str =
    "Please introduce yourself briefly in a friendly way. Keep it to 1-2 sentences.";

const TITLE_CHARS: usize = 20;

/// Title for a conversation started by `first_message`.
pub fn conversation_title(first_message: &str, now: DateTime<Local>) -> String {
    let flattened = first_message.replace(['\r', '\n'], " ");
    if flattened.chars().count() >= TITLE_CHARS {
        let head: String = flattened.chars().take(TITLE_CHARS).collect();
        format!("{head}...")
    } else {
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

pub struct ConversationController<'a> {
    session: &'a mut SessionContext,
    ui: &'a mut UiState,
}

impl<'a> ConversationController<'a> {
    pub fn new(session: &'a mut SessionContext, ui: &'a mut UiState) -> Self {
        Self { session, ui }
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.ui.push_message(Message::system(content));
    }

    pub(crate) fn report_store_error(&mut self, context: &str, err: &StoreError) {
        warn!(error = %err, "{context}");
        self.add_system_message(format!("⚠️ {context}: {err}"));
    }

    /// Returns the active conversation id, creating a conversation titled
    /// after `first_message` when none is active.
    pub fn ensure_conversation(&mut self, first_message: &str) -> Option<i64> {
        if let Some(id) = self.session.conversation_id() {
            return Some(id);
        }

        let title = conversation_title(first_message, Local::now());
        let persona_id = self.session.persona.id;
        match self.session.store.create_conversation(&title, persona_id) {
            Ok(conversation) => {
                info!(id = conversation.id, name = %conversation.name, "conversation created");
                let id = conversation.id;
                self.session.conversation = Some(conversation);
                Some(id)
            }
            Err(err) => {
                self.report_store_error("Failed to create conversation", &err);
                None
            }
        }
    }

    /// Records the user's turn in the cache and, best effort, the store.
    pub fn add_user_message(&mut self, content: String) {
        let conversation_id = self.ensure_conversation(&content);
        self.ui.push_message(Message::user(content.clone()));
        self.ui.auto_scroll = true;

        if let Some(id) = conversation_id {
            if let Err(err) = self
                .session
                .store
                .append_message(id, TranscriptRole::User, &content)
            {
                self.report_store_error("Failed to save user message", &err);
            }
        }
    }

    /// The history sent upstream. It matches the stored transcript: system
    /// notices, empty placeholders, and local-only replies are skipped.
    pub fn api_history(&self) -> Vec<ChatMessage> {
        self.ui
            .messages
            .iter()
            .filter(|message| message.is_upstream())
            .filter_map(|message| {
                message.role.to_api_role().map(|role| ChatMessage {
                    role,
                    content: message.content.clone(),
                })
            })
            .collect()
    }

    /// Opens a new pending request, abandoning any earlier one.
    pub fn start_request(
        &mut self,
        purpose: RequestPurpose,
        streams: bool,
    ) -> (CancellationToken, u64) {
        self.abandon_request();

        let stream_id = self.session.next_stream_id();
        let cancel_token = CancellationToken::new();
        let placeholder = streams.then(|| {
            self.ui.push_message(Message::assistant(""));
            self.ui.messages.len() - 1
        });

        self.session.pending = Some(PendingRequest {
            stream_id,
            purpose,
            cancel_token: cancel_token.clone(),
            placeholder,
        });
        self.session.engine_state = EngineState::AwaitingDispatch;
        self.ui.set_status(StatusIndicator::Processing);
        debug!(stream_id, purpose = ?purpose, streams, "request started");
        (cancel_token, stream_id)
    }

    /// Cancels the in-flight request, if any. Any partial text already on
    /// screen stays there.
    pub fn abandon_request(&mut self) -> bool {
        let Some(pending) = self.interrupt_request() else {
            return false;
        };
        pending.cancel_token.cancel();
        debug!(stream_id = pending.stream_id, "request abandoned");
        self.ui.set_status(StatusIndicator::AtEase);
        true
    }

    /// Detaches the pending request and removes its placeholder when it
    /// never received text.
    pub fn finish_request(&mut self) -> Option<PendingRequest> {
        let pending = self.session.pending.take()?;
        if let Some(index) = pending.placeholder {
            if self
                .ui
                .messages
                .get(index)
                .is_some_and(Message::is_empty_placeholder)
            {
                self.ui.remove_message(index);
            }
        }
        self.session.engine_state = EngineState::Idle;
        Some(pending)
    }

    /// Detaches a request that did not complete. Partial text it streamed
    /// stays on screen as a local-only message.
    pub fn interrupt_request(&mut self) -> Option<PendingRequest> {
        if let Some(index) = self.session.pending.as_ref()?.placeholder {
            if self
                .ui
                .messages
                .get(index)
                .is_some_and(|message| message.role.is_assistant())
            {
                self.ui.mark_local_only(index);
            }
        }
        self.finish_request()
    }

    /// Empties the pending placeholder so completing the request drops it.
    pub fn discard_pending_text(&mut self) {
        let Some(index) = self.session.pending.as_ref().and_then(|p| p.placeholder) else {
            return;
        };
        if let Some(message) = self.ui.messages.get_mut(index) {
            message.content.clear();
        }
        self.ui.invalidate_prewrap_cache();
    }

    pub fn pending_purpose(&self) -> Option<RequestPurpose> {
        self.session.pending.as_ref().map(|pending| pending.purpose)
    }

    /// Text accumulated in the pending request's placeholder.
    pub fn pending_text(&self) -> Option<String> {
        let index = self.session.pending.as_ref()?.placeholder?;
        self.ui
            .messages
            .get(index)
            .map(|message| message.content.clone())
    }

    pub fn append_to_response(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let Some(index) = self
            .session
            .pending
            .as_ref()
            .and_then(|pending| pending.placeholder)
        else {
            return;
        };
        self.ui.append_to_message(index, chunk);
        self.session.engine_state = EngineState::Streaming;
        self.ui.api_status = ApiStatus::Online;
        self.ui.set_status(StatusIndicator::Typing);
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.ui.push_message(Message::assistant(content));
    }

    /// Shows a reply that is never persisted.
    pub fn add_local_assistant_message(&mut self, content: impl Into<String>) {
        self.ui.push_message(Message::local_assistant(content));
    }

    /// Persists a completed assistant reply to the active conversation.
    pub fn persist_assistant(&mut self, content: &str, failure_context: &str) {
        let Some(id) = self.session.conversation_id() else {
            return;
        };
        if let Err(err) = self
            .session
            .store
            .append_message(id, TranscriptRole::Assistant, content)
        {
            self.report_store_error(failure_context, &err);
        }
    }

    pub fn mark_online(&mut self) {
        self.ui.api_status = ApiStatus::Online;
    }

    pub fn mark_offline(&mut self) {
        self.ui.api_status = ApiStatus::Offline;
    }

    pub fn set_status(&mut self, status: StatusIndicator) {
        self.ui.set_status(status);
    }

    pub fn set_engine_state(&mut self, state: EngineState) {
        debug!(state = state.label(), "engine state");
        self.session.engine_state = state;
    }

    /// Abandons any request, forgets the active conversation, and empties
    /// the cache.
    pub fn reset_conversation(&mut self) {
        self.abandon_request();
        self.ui.clear_messages();
        if let Err(err) = self.session.store.clear_active_conversations() {
            self.report_store_error("Failed to clear conversation", &err);
        }
        self.session.conversation = None;
        self.ui.scroll_to_bottom();
        self.ui.set_status(StatusIndicator::AtEase);
    }

    fn build_params(
        &self,
        mode: DispatchMode,
        history: Vec<ChatMessage>,
        cancel_token: CancellationToken,
        stream_id: u64,
    ) -> StreamParams {
        let persona = &self.session.persona;
        StreamParams {
            provider: self.session.provider.clone(),
            mode,
            request: GenerationRequest {
                model: persona.model_name.clone(),
                system_prompt: persona.system_prompt.clone(),
                history,
            },
            tools: if mode.uses_tools() {
                tool_definitions()
            } else {
                Vec::new()
            },
            timeout: self.session.request_timeout,
            cancel_token,
            stream_id,
        }
    }

    /// Sends the cached transcript with the session's dispatch mode.
    pub fn dispatch_turn(&mut self) -> StreamParams {
        let mode = self.session.dispatch_mode;
        let history = self.api_history();
        let (cancel_token, stream_id) = self.start_request(RequestPurpose::Turn, mode.streams());
        self.build_params(mode, history, cancel_token, stream_id)
    }

    /// Asks the active persona to greet the user, when enabled.
    pub fn dispatch_introduction(&mut self) -> Option<StreamParams> {
        if !self.session.introduce_on_switch {
            return None;
        }
        let (cancel_token, stream_id) = self.start_request(RequestPurpose::Introduction, false);
        Some(self.build_params(
            DispatchMode::Plain,
            vec![ChatMessage::user(INTRODUCTION_PROMPT)],
            cancel_token,
            stream_id,
        ))
    }

    pub fn introduction_fallback(&self) -> String {
        format!("Hello! I'm {} 👋", self.session.persona.name)
    }

    /// Loads a stored conversation of the active persona into the cache.
    pub fn resume_conversation(&mut self, id: i64) {
        self.abandon_request();

        let conversation = match self.session.store.get_conversation(id) {
            Ok(conversation) if conversation.persona_id == self.session.persona.id => conversation,
            Ok(_) | Err(StoreError::NotFound { .. }) => {
                self.add_system_message(format!(
                    "Conversation {id} not found for {}",
                    self.session.persona.name
                ));
                return;
            }
            Err(err) => {
                self.report_store_error("Failed to load conversation", &err);
                return;
            }
        };

        let messages = match self.session.store.list_messages(id) {
            Ok(messages) => messages,
            Err(err) => {
                self.report_store_error("Failed to load messages", &err);
                return;
            }
        };
        let conversation = match self.session.store.set_active_conversation(conversation.id) {
            Ok(conversation) => conversation,
            Err(err) => {
                self.report_store_error("Failed to resume conversation", &err);
                return;
            }
        };

        let count = messages.len();
        self.ui.clear_messages();
        for message in messages {
            self.ui.push_message(Message::from(message));
        }
        let summary = if count == 0 {
            "(empty)".to_string()
        } else {
            format!("({count} messages)")
        };
        self.add_system_message(format!(
            "✨ Resumed conversation: {} {summary}",
            conversation.name
        ));
        info!(id = conversation.id, messages = count, "conversation resumed");
        self.session.conversation = Some(conversation);
        self.ui.scroll_to_bottom();
        self.ui.set_status(StatusIndicator::AtEase);
    }

    pub fn rename_conversation(&mut self, name: &str) {
        let Some(id) = self.session.conversation_id() else {
            self.add_system_message(
                "No active conversation to rename. Start chatting to create one!",
            );
            return;
        };
        match self.session.store.rename_conversation(id, name) {
            Ok(()) => {
                if let Some(conversation) = self.session.conversation.as_mut() {
                    conversation.name = name.to_string();
                }
                self.add_system_message(format!("✨ Renamed conversation to: {name}"));
            }
            Err(err) => self.report_store_error("Failed to rename conversation", &err),
        }
    }

    /// Deletes a conversation and its messages; `None` means the active one.
    pub fn delete_conversation(&mut self, id: Option<i64>) {
        let Some(id) = id.or_else(|| self.session.conversation_id()) else {
            self.add_system_message("No active conversation to delete.");
            return;
        };
        let conversation = match self.session.store.get_conversation(id) {
            Ok(conversation) if conversation.persona_id == self.session.persona.id => conversation,
            Ok(_) | Err(StoreError::NotFound { .. }) => {
                self.add_system_message(format!(
                    "Conversation {id} not found for {}",
                    self.session.persona.name
                ));
                return;
            }
            Err(err) => {
                self.report_store_error("Failed to delete conversation", &err);
                return;
            }
        };

        let was_active = self.session.conversation_id() == Some(id);
        if was_active {
            self.abandon_request();
        }
        if let Err(err) = self.session.store.delete_conversation(id) {
            self.report_store_error("Failed to delete conversation", &err);
            return;
        }
        if was_active {
            self.session.conversation = None;
            self.ui.clear_messages();
        }
        info!(id, "conversation deleted");
        self.add_system_message(format!("🗑 Deleted conversation: {}", conversation.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn long_first_message_titles_with_prefix() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            conversation_title("Tell me about the ocean tides", now),
            "Tell me about the oc..."
        );
        assert_eq!(
            conversation_title("exactly twenty chars", now),
            "exactly twenty chars..."
        );
    }

    #[test]
    fn short_first_message_titles_with_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(conversation_title("hello", now), "2024-03-09 14:05:07");
    }

    #[test]
    fn title_flattens_newlines() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            conversation_title("line one\nline two is long", now),
            "line one line two is..."
        );
    }
}
