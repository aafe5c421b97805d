use chrono::Local;

use super::{system_message, usage_message};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::builtin_providers::{find_builtin_provider, load_builtin_providers};

const LIST_USAGE: &str = "/list personas|conversations|providers|models [provider]";

fn marker(current: bool) -> &'static str {
    if current {
        "*"
    } else {
        " "
    }
}

pub(crate) fn handle_list(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(target) = invocation.arg(0) else {
        return usage_message(app, LIST_USAGE);
    };

    match target.to_ascii_lowercase().as_str() {
        "persona" | "personas" | "ai" | "ais" => list_personas(app),
        "conversation" | "conversations" => list_conversations(app),
        "provider" | "providers" | "api" | "apis" => list_providers(app),
        "model" | "models" => list_models(app, invocation.arg(1)),
        other => system_message(app, format!("Unknown list type: {other}")),
    }
}

fn list_personas(app: &mut App) -> CommandResult {
    let personas = match app.session.store.list_personas() {
        Ok(personas) => personas,
        Err(err) => {
            app.conversation()
                .report_store_error("Failed to load personas", &err);
            return CommandResult::Continue;
        }
    };

    let active_id = app.persona().id;
    let mut text = String::from("Available personas:\n");
    for persona in personas {
        text.push_str(&format!(
            "\n  {} {} ({} / {})",
            marker(persona.id == active_id),
            persona.name,
            persona.provider_name,
            persona.model_name
        ));
    }
    system_message(app, text)
}

fn list_conversations(app: &mut App) -> CommandResult {
    let persona_id = app.persona().id;
    let conversations = match app.session.store.list_conversations(persona_id) {
        Ok(conversations) => conversations,
        Err(err) => {
            app.conversation()
                .report_store_error("Failed to load conversations", &err);
            return CommandResult::Continue;
        }
    };

    let name = app.persona().name.clone();
    if conversations.is_empty() {
        return system_message(app, format!("No conversations yet for {name}."));
    }

    let mut text = format!("Conversations for {name}:\n");
    for conversation in conversations {
        text.push_str(&format!(
            "\n  {} [{}] {} ({})",
            marker(conversation.is_active),
            conversation.id,
            conversation.name,
            conversation
                .created
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        ));
    }
    text.push_str("\n\nUse /resume <id> to continue one.");
    system_message(app, text)
}

fn list_providers(app: &mut App) -> CommandResult {
    let current = app.persona().provider_name.clone();
    let mut text = String::from("Available providers:\n");
    for provider in load_builtin_providers() {
        text.push_str(&format!(
            "\n  {} {} - {} (default: {}, {} models)",
            marker(provider.id == current),
            provider.id,
            provider.display_name,
            provider.default_model,
            provider.models.len()
        ));
    }
    system_message(app, text)
}

fn list_models(app: &mut App, provider_id: Option<&str>) -> CommandResult {
    let current = app.persona();
    let provider_id = provider_id.unwrap_or(&current.provider_name).to_string();
    let current_model = (provider_id == current.provider_name).then(|| current.model_name.clone());

    let Some(provider) = find_builtin_provider(&provider_id) else {
        return system_message(app, format!("Unknown provider: {provider_id}"));
    };

    let mut text = format!("Models for {}:\n", provider.display_name);
    for model in &provider.models {
        let default = if *model == provider.default_model {
            " (default)"
        } else {
            ""
        };
        text.push_str(&format!(
            "\n  {} {model}{default}",
            marker(current_model.as_deref() == Some(model.as_str()))
        ));
    }
    system_message(app, text)
}
