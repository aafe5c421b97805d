mod input;
mod picker;
mod streaming;
mod tool_calls;

use tokio::sync::mpsc;

use super::App;
use crate::api::{ToolCall, ToolResponse};
use crate::core::chat_stream::{StreamMessage, StreamParams};

pub(crate) use picker::open_picker;

pub enum AppAction {
    AppendResponseChunk {
        content: String,
        stream_id: u64,
    },
    StreamToolCalls {
        calls: Vec<ToolCall>,
        stream_id: u64,
    },
    StreamResponseReady {
        response: ToolResponse,
        stream_id: u64,
    },
    StreamErrored {
        message: String,
        stream_id: u64,
    },
    StreamCompleted {
        stream_id: u64,
    },
    CancelStreaming,
    SubmitMessage {
        message: String,
    },
    ProcessCommand {
        input: String,
    },
    ScrollUp {
        lines: u16,
    },
    ScrollDown {
        lines: u16,
    },
    PageUp,
    PageDown,
    ScrollToBottom,
    PickerEscape,
    PickerMoveUp,
    PickerMoveDown,
    PickerApplySelection,
}

impl AppAction {
    /// Maps a worker report to the action that reconciles it.
    pub fn from_stream(message: StreamMessage, stream_id: u64) -> Self {
        match message {
            StreamMessage::Chunk(content) => AppAction::AppendResponseChunk { content, stream_id },
            StreamMessage::ToolCalls(calls) => AppAction::StreamToolCalls { calls, stream_id },
            StreamMessage::Complete(response) => {
                AppAction::StreamResponseReady { response, stream_id }
            }
            StreamMessage::Error(message) => AppAction::StreamErrored { message, stream_id },
            StreamMessage::End => AppAction::StreamCompleted { stream_id },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppActionContext {
    pub term_width: u16,
    pub term_height: u16,
}

pub struct AppActionEnvelope {
    pub action: AppAction,
    pub context: AppActionContext,
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppActionEnvelope>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppActionEnvelope>) -> Self {
        Self { tx }
    }

    pub fn dispatch_many<I>(&self, actions: I, ctx: AppActionContext)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(AppActionEnvelope {
                action,
                context: ctx,
            });
        }
    }
}

pub enum AppCommand {
    SpawnStream(StreamParams),
}

pub fn apply_actions(
    app: &mut App,
    envelopes: impl IntoIterator<Item = AppActionEnvelope>,
) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for envelope in envelopes {
        if let Some(cmd) = apply_action(app, envelope.action, envelope.context) {
            commands.push(cmd);
        }
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction, ctx: AppActionContext) -> Option<AppCommand> {
    match action {
        AppAction::AppendResponseChunk { .. }
        | AppAction::StreamToolCalls { .. }
        | AppAction::StreamResponseReady { .. }
        | AppAction::StreamErrored { .. }
        | AppAction::StreamCompleted { .. }
        | AppAction::CancelStreaming
        | AppAction::SubmitMessage { .. } => streaming::handle_streaming_action(app, action),

        AppAction::ProcessCommand { .. }
        | AppAction::ScrollUp { .. }
        | AppAction::ScrollDown { .. }
        | AppAction::PageUp
        | AppAction::PageDown
        | AppAction::ScrollToBottom => input::handle_input_action(app, action, ctx),

        AppAction::PickerEscape
        | AppAction::PickerMoveUp
        | AppAction::PickerMoveDown
        | AppAction::PickerApplySelection => picker::handle_picker_action(app, action),
    }
}
