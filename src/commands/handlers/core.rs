use serde_json::{Map, Value};

use super::{request_or_continue, system_message, usage_message};
use crate::api::ToolCall;
use crate::commands::registry::CommandInvocation;
use crate::commands::{all_commands, CommandResult};
use crate::core::app::App;
use crate::core::tools::{parse_tool_call, ToolInvocation, MANIFEST_CHARACTER};

pub(crate) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.chars().count())
        .max()
        .unwrap_or(0);

    let mut text = String::from("Available Commands:\n");
    for command in all_commands().iter().filter(|command| !command.usage.is_empty()) {
        text.push_str(&format!(
            "\n  {:<width$}  {}",
            command.usage, command.help
        ));
    }
    text.push_str("\n\nEsc cancels a reply in progress. PageUp/PageDown scroll the transcript.");
    system_message(app, text)
}

pub(crate) fn handle_quit(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}

pub(crate) fn handle_show(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg(0).map(str::to_ascii_lowercase).as_deref() {
        Some("prompt") => {
            app.personas().show_prompt();
            CommandResult::Continue
        }
        Some(other) => system_message(app, format!("Unknown show type: {other}")),
        None => usage_message(app, "/show prompt"),
    }
}

/// `/manifest <name> <image-url> <description...>` goes through the same
/// validation as a model's `manifest_character` call.
pub(crate) fn handle_manifest(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    const USAGE: &str = "/manifest <name> <image-url> <description>";
    if invocation.args.is_empty() {
        return usage_message(app, USAGE);
    }

    let mut arguments = Map::new();
    let values = [
        ("name", invocation.arg(0).unwrap_or_default()),
        ("image_url", invocation.arg(1).unwrap_or_default()),
        ("description", invocation.rest_after(2)),
    ];
    for (key, value) in values {
        arguments.insert(key.to_string(), Value::String(value.to_string()));
    }

    match parse_tool_call(&ToolCall::new(MANIFEST_CHARACTER, arguments)) {
        Ok(ToolInvocation::ManifestCharacter(request)) => {
            request_or_continue(app.personas().manifest(request))
        }
        Err(err) => {
            system_message(app, format!("🔥 Manifest failed: {err}. Usage: {USAGE}"))
        }
    }
}
