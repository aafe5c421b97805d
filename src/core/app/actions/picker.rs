use chrono::Local;

use super::{App, AppAction, AppCommand};
use crate::core::app::picker::{PickerItem, PickerKind, PickerState};
use crate::core::builtin_providers::{find_builtin_provider, load_builtin_providers};
use crate::core::store::StoreError;

pub(super) fn handle_picker_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::PickerMoveUp => {
            if let Some(picker) = app.ui.picker.as_mut() {
                picker.move_up();
            }
            None
        }
        AppAction::PickerMoveDown => {
            if let Some(picker) = app.ui.picker.as_mut() {
                picker.move_down();
            }
            None
        }
        AppAction::PickerEscape => {
            app.ui.picker = None;
            None
        }
        AppAction::PickerApplySelection => apply_selection(app),
        _ => unreachable!("non-picker action routed to picker handler"),
    }
}

/// Applies the highlighted entry through the same path as the matching
/// command.
fn apply_selection(app: &mut App) -> Option<AppCommand> {
    let picker = app.ui.picker.take()?;
    let item = picker.selected_item()?.clone();
    match picker.kind {
        PickerKind::Persona => app
            .personas()
            .switch_persona(&item.value)
            .map(AppCommand::SpawnStream),
        PickerKind::Provider => {
            app.personas().switch_provider(&item.value);
            None
        }
        PickerKind::Model => {
            app.personas().switch_model(&item.value);
            None
        }
        PickerKind::Conversation => {
            match item.value.parse::<i64>() {
                Ok(id) => app.conversation().resume_conversation(id),
                Err(_) => app
                    .conversation()
                    .add_system_message(format!("Invalid conversation id: {}", item.value)),
            }
            None
        }
    }
}

fn picker_items(app: &App, kind: PickerKind) -> Result<Vec<PickerItem>, StoreError> {
    let persona = &app.session.persona;
    let items = match kind {
        PickerKind::Persona => app
            .session
            .store
            .list_personas()?
            .into_iter()
            .map(|candidate| PickerItem {
                detail: Some(format!(
                    "{} / {}",
                    candidate.provider_name, candidate.model_name
                )),
                current: candidate.id == persona.id,
                value: candidate.name.clone(),
                label: candidate.name,
            })
            .collect(),
        PickerKind::Provider => load_builtin_providers()
            .into_iter()
            .map(|provider| PickerItem {
                current: provider.id == persona.provider_name,
                detail: Some(provider.default_model),
                label: provider.display_name,
                value: provider.id,
            })
            .collect(),
        PickerKind::Model => find_builtin_provider(&persona.provider_name)
            .map(|provider| provider.models)
            .unwrap_or_default()
            .into_iter()
            .map(|model| PickerItem {
                current: model == persona.model_name,
                label: model.clone(),
                value: model,
                detail: None,
            })
            .collect(),
        PickerKind::Conversation => app
            .session
            .store
            .list_conversations(persona.id)?
            .into_iter()
            .map(|conversation| PickerItem {
                value: conversation.id.to_string(),
                label: conversation.name,
                detail: Some(
                    conversation
                        .created
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                ),
                current: conversation.is_active,
            })
            .collect(),
    };
    Ok(items)
}

pub(crate) fn open_picker(app: &mut App, kind: PickerKind) {
    match picker_items(app, kind) {
        Ok(items) if items.is_empty() => {
            let message = match kind {
                PickerKind::Conversation => {
                    format!("No conversations yet for {}.", app.session.persona.name)
                }
                _ => "Nothing to choose from.".to_string(),
            };
            app.conversation().add_system_message(message);
        }
        Ok(items) => app.ui.picker = Some(PickerState::new(kind, items)),
        Err(err) => app
            .conversation()
            .report_store_error("Failed to load picker entries", &err),
    }
}
