use super::{request_or_continue, system_message, usage_message};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::{App, PickerKind};

const SET_USAGE: &str = "/set persona|provider|model [name] or /set prompt <text>";

pub(crate) fn handle_set(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(target) = invocation.arg(0) else {
        return usage_message(app, SET_USAGE);
    };
    let value = invocation.rest_after(1);

    match target.to_ascii_lowercase().as_str() {
        "persona" | "ai" => {
            if value.is_empty() {
                CommandResult::OpenPicker(PickerKind::Persona)
            } else {
                request_or_continue(app.personas().switch_persona(value))
            }
        }
        "provider" | "api" => {
            if value.is_empty() {
                CommandResult::OpenPicker(PickerKind::Provider)
            } else {
                app.personas().switch_provider(value);
                CommandResult::Continue
            }
        }
        "model" => {
            if value.is_empty() {
                CommandResult::OpenPicker(PickerKind::Model)
            } else {
                app.personas().switch_model(value);
                CommandResult::Continue
            }
        }
        "prompt" => {
            if value.is_empty() {
                usage_message(app, "/set prompt <text>")
            } else {
                app.personas().update_prompt(value);
                CommandResult::Continue
            }
        }
        other => system_message(app, format!("Unknown set type: {other}")),
    }
}

fn parse_id(app: &mut App, raw: &str) -> Option<i64> {
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            app.conversation()
                .add_system_message(format!("Invalid conversation id: {raw}"));
            None
        }
    }
}

pub(crate) fn handle_resume(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(raw) = invocation.arg(0) else {
        return CommandResult::OpenPicker(PickerKind::Conversation);
    };
    if let Some(id) = parse_id(app, raw) {
        app.conversation().resume_conversation(id);
    }
    CommandResult::Continue
}

pub(crate) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.conversation().reset_conversation();
    CommandResult::Continue
}

pub(crate) fn handle_rename(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let name = invocation.rest_after(0);
    if name.is_empty() {
        return usage_message(app, "/rename <name>");
    }
    app.conversation().rename_conversation(name);
    CommandResult::Continue
}

pub(crate) fn handle_delete(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let id = match invocation.arg(0) {
        Some(raw) => match parse_id(app, raw) {
            Some(id) => Some(id),
            None => return CommandResult::Continue,
        },
        None => None,
    };
    app.conversation().delete_conversation(id);
    CommandResult::Continue
}
