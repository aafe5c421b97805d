use tracing::{debug, warn};

use super::{tool_calls, App, AppAction, AppCommand};
use crate::api::ToolResponse;
use crate::core::app::session::{EngineState, RequestPurpose};
use crate::core::app::ui_state::StatusIndicator;

pub(super) const BUSY_MESSAGE: &str =
    "⏳ Still working on the last reply. Press Esc to cancel it first.";
pub(super) const EMPTY_RESPONSE_MESSAGE: &str = "⚠️ The provider returned an empty response.";

pub(super) fn handle_streaming_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::AppendResponseChunk { content, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            app.conversation().append_to_response(&content);
            None
        }
        AppAction::StreamToolCalls { calls, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            // The rest of the stream is abandoned.
            if let Some(pending) = app.conversation().interrupt_request() {
                pending.cancel_token.cancel();
            }
            app.conversation().mark_online();
            tool_calls::dispatch_tool_calls(app, calls)
        }
        AppAction::StreamResponseReady { response, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            handle_response_ready(app, response)
        }
        AppAction::StreamErrored { message, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            handle_stream_error(app, message);
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            finalize_stream(app);
            None
        }
        AppAction::CancelStreaming => {
            let mut conversation = app.conversation();
            if conversation.abandon_request() {
                conversation.add_system_message("Response interrupted.");
            }
            None
        }
        AppAction::SubmitMessage { message } => spawn_stream_for_message(app, message),
        _ => unreachable!("non-streaming action routed to streaming handler"),
    }
}

pub(super) fn spawn_stream_for_message(app: &mut App, message: String) -> Option<AppCommand> {
    if message.trim().is_empty() {
        return None;
    }
    if app.session.is_busy() {
        app.conversation().add_system_message(BUSY_MESSAGE);
        return None;
    }

    let mut conversation = app.conversation();
    conversation.add_user_message(message);
    let params = conversation.dispatch_turn();
    debug!(stream_id = params.stream_id, mode = params.mode.label(), "turn dispatched");
    Some(AppCommand::SpawnStream(params))
}

fn handle_response_ready(app: &mut App, response: ToolResponse) -> Option<AppCommand> {
    let mut conversation = app.conversation();
    conversation.set_engine_state(EngineState::Completing);
    let purpose = conversation.pending_purpose();
    conversation.finish_request();
    conversation.mark_online();

    if !response.tool_calls.is_empty() {
        if !response.text.trim().is_empty() {
            conversation.add_local_assistant_message(response.text);
        }
        return tool_calls::dispatch_tool_calls(app, response.tool_calls);
    }

    if response.text.trim().is_empty() {
        conversation.add_system_message(EMPTY_RESPONSE_MESSAGE);
    } else if purpose == Some(RequestPurpose::Turn) {
        conversation.add_assistant_message(response.text.clone());
        conversation.persist_assistant(&response.text, "Failed to save assistant message");
    } else {
        conversation.add_local_assistant_message(response.text);
    }
    conversation.set_status(StatusIndicator::AtEase);
    None
}

fn finalize_stream(app: &mut App) {
    let mut conversation = app.conversation();
    let text = conversation.pending_text().unwrap_or_default();
    let purpose = conversation.pending_purpose();
    let blank = text.trim().is_empty();
    if blank {
        conversation.discard_pending_text();
    }
    conversation.finish_request();

    if blank {
        conversation.add_system_message(EMPTY_RESPONSE_MESSAGE);
    } else if purpose == Some(RequestPurpose::Turn) {
        conversation.persist_assistant(&text, "Failed to save streamed message");
    }
    conversation.set_status(StatusIndicator::AtEase);
}

fn handle_stream_error(app: &mut App, message: String) {
    let mut conversation = app.conversation();
    let purpose = conversation.pending_purpose();
    conversation.interrupt_request();
    warn!(purpose = ?purpose, "provider error: {message}");

    if purpose == Some(RequestPurpose::Introduction) {
        let fallback = conversation.introduction_fallback();
        conversation.add_local_assistant_message(fallback);
    } else {
        conversation.add_system_message(format!("❌ {message}"));
    }
    conversation.mark_offline();
    conversation.set_status(StatusIndicator::AtEase);
}
