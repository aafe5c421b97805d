pub(super) mod core;
pub(super) mod listing;
pub(super) mod session;

use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::chat_stream::StreamParams;

pub(super) fn usage_message(app: &mut App, usage: &'static str) -> CommandResult {
    app.conversation()
        .add_system_message(format!("Usage: {usage}"));
    CommandResult::Continue
}

pub(super) fn system_message(app: &mut App, content: String) -> CommandResult {
    app.conversation().add_system_message(content);
    CommandResult::Continue
}

pub(super) fn request_or_continue(params: Option<StreamParams>) -> CommandResult {
    match params {
        Some(params) => CommandResult::Request(params),
        None => CommandResult::Continue,
    }
}
