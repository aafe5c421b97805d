mod handlers;
mod registry;

pub use registry::{all_commands, CommandInvocation};

use crate::core::app::{App, PickerKind};
use crate::core::chat_stream::StreamParams;

pub enum CommandResult {
    Continue,
    Quit,
    OpenPicker(PickerKind),
    /// The command started a provider request (an introduction).
    Request(StreamParams),
}

/// Whether a submitted line goes to the interpreter instead of the model.
pub fn is_command(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed.starts_with('/') || trimmed.trim_end() == ":q"
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();
    if trimmed == ":q" {
        return CommandResult::Quit;
    }

    let Some(body) = trimmed.strip_prefix('/') else {
        return unknown_command(app, trimmed);
    };
    let (command_name, args) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    if command_name.is_empty() {
        return unknown_command(app, trimmed);
    }

    match registry::find_command(command_name) {
        Some(command) => {
            let invocation = CommandInvocation {
                input: trimmed,
                args,
            };
            (command.handler)(app, invocation)
        }
        None => unknown_command(app, trimmed),
    }
}

fn unknown_command(app: &mut App, input: &str) -> CommandResult {
    app.conversation()
        .add_system_message(format!("Unknown command: {input}"));
    CommandResult::Continue
}

#[cfg(test)]
mod tests;
