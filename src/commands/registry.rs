use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.split_whitespace().nth(index)
    }

    /// Everything after the first `skip` words, with inner spacing kept.
    pub fn rest_after(&self, skip: usize) -> &'a str {
        let mut rest = self.args.trim_start();
        for _ in 0..skip {
            match rest.find(char::is_whitespace) {
                Some(end) => rest = rest[end..].trim_start(),
                None => return "",
            }
        }
        rest.trim_end()
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "list",
        usage: "/list personas|conversations|providers|models [provider]",
        help: "List personas, conversations, providers, or models.",
        handler: super::handlers::listing::handle_list,
    },
    Command {
        name: "set",
        usage: "/set persona|provider|model [name], /set prompt <text>",
        help: "Switch persona, provider, or model, or replace the system prompt.",
        handler: super::handlers::session::handle_set,
    },
    Command {
        name: "resume",
        usage: "/resume [id]",
        help: "Resume a previous conversation.",
        handler: super::handlers::session::handle_resume,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Clear the current conversation.",
        handler: super::handlers::session::handle_clear,
    },
    Command {
        name: "rename",
        usage: "/rename <name>",
        help: "Rename the current conversation.",
        handler: super::handlers::session::handle_rename,
    },
    Command {
        name: "delete",
        usage: "/delete [id]",
        help: "Delete a conversation (the current one by default).",
        handler: super::handlers::session::handle_delete,
    },
    Command {
        name: "show",
        usage: "/show prompt",
        help: "Display the current system prompt.",
        handler: super::handlers::core::handle_show,
    },
    Command {
        name: "manifest",
        usage: "/manifest <name> <image-url> <description>",
        help: "Summon a new persona from a portrait and a description.",
        handler: super::handlers::core::handle_manifest,
    },
    Command {
        name: "help",
        usage: "/help, /commands",
        help: "Show this help message.",
        handler: super::handlers::core::handle_help,
    },
    Command {
        name: "commands",
        usage: "",
        help: "",
        handler: super::handlers::core::handle_help,
    },
    Command {
        name: "quit",
        usage: "/quit, :q",
        help: "Exit io.",
        handler: super::handlers::core::handle_quit,
    },
];
