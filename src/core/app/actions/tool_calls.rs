use tracing::{info, warn};

use super::{App, AppCommand};
use crate::api::ToolCall;
use crate::core::app::session::EngineState;
use crate::core::app::ui_state::StatusIndicator;
use crate::core::tools::{select_invocation, ToolCallError, ToolInvocation};

/// Runs the first actionable call. Invalid calls produce a single notice
/// and leave the engine idle.
pub(super) fn dispatch_tool_calls(app: &mut App, calls: Vec<ToolCall>) -> Option<AppCommand> {
    app.conversation().set_engine_state(EngineState::ToolDispatch);
    info!(count = calls.len(), "tool calls received");

    match select_invocation(&calls) {
        Some(Ok(ToolInvocation::ManifestCharacter(request))) => {
            app.personas().manifest(request).map(AppCommand::SpawnStream)
        }
        Some(Err(err)) => {
            warn!(error = %err, "tool call rejected");
            let notice = match &err {
                ToolCallError::MissingArguments { .. } => format!("🔥 Manifest failed: {err}"),
                ToolCallError::UnknownTool(_) => format!("⚠️ {err}"),
            };
            settle_idle(app);
            app.conversation().add_system_message(notice);
            None
        }
        None => {
            settle_idle(app);
            None
        }
    }
}

fn settle_idle(app: &mut App) {
    let mut conversation = app.conversation();
    conversation.set_engine_state(EngineState::Idle);
    conversation.set_status(StatusIndicator::AtEase);
}
