use tracing::{info, warn};

use super::conversation::ConversationController;
use super::session::{EngineState, SessionContext};
use super::ui_state::{StatusIndicator, UiState};
use crate::core::builtin_providers::find_builtin_provider;
use crate::core::chat_stream::StreamParams;
use crate::core::persona::{NewPersona, Persona};
use crate::core::store::StoreError;
use crate::core::tools::ManifestRequest;

/// Session mutations that change who the user is talking to.
pub struct PersonaController<'a> {
    session: &'a mut SessionContext,
    ui: &'a mut UiState,
}

impl<'a> PersonaController<'a> {
    pub fn new(session: &'a mut SessionContext, ui: &'a mut UiState) -> Self {
        Self { session, ui }
    }

    fn conversation(&mut self) -> ConversationController<'_> {
        ConversationController::new(self.session, self.ui)
    }

    fn system(&mut self, content: impl Into<String>) {
        self.conversation().add_system_message(content);
    }

    fn not_found_or_report(&mut self, err: StoreError, unknown: String, context: &str) {
        match err {
            StoreError::NotFound { .. } => self.system(unknown),
            err => self.conversation().report_store_error(context, &err),
        }
    }

    /// Makes `persona` current: clears the session, rebuilds the provider,
    /// confirms, and requests an introduction.
    fn activate(&mut self, persona: Persona, confirmation: String) -> Option<StreamParams> {
        let provider_changed = persona.provider_name != self.session.persona.provider_name;
        self.conversation().reset_conversation();
        info!(persona = %persona.name, "persona activated");
        self.session.persona = persona;
        if provider_changed {
            self.session.rebuild_provider();
        }
        let mut conversation = self.conversation();
        conversation.add_system_message(confirmation);
        conversation.dispatch_introduction()
    }

    pub fn switch_persona(&mut self, name: &str) -> Option<StreamParams> {
        if self.session.persona.name.eq_ignore_ascii_case(name) {
            let current = self.session.persona.name.clone();
            self.system(format!("Persona '{current}' is already active! 🎯"));
            return None;
        }

        match self.session.store.set_active_persona(name) {
            Ok(persona) => {
                let confirmation = format!("✨ Switched to persona: {}", persona.name);
                self.activate(persona, confirmation)
            }
            Err(err) => {
                self.not_found_or_report(
                    err,
                    format!("Unknown persona: {name}"),
                    "Failed to switch persona",
                );
                None
            }
        }
    }

    /// Moves the active persona to `provider_id` and its default model.
    pub fn switch_provider(&mut self, provider_id: &str) {
        let Some(provider) = find_builtin_provider(provider_id) else {
            self.system(format!("Unknown provider: {provider_id}"));
            return;
        };

        match self
            .session
            .store
            .update_active_persona_provider(&provider.id, &provider.default_model)
        {
            Ok(persona) => {
                self.conversation().reset_conversation();
                self.session.persona = persona;
                self.session.rebuild_provider();
                self.system(format!(
                    "Switched to provider: {} (model: {})",
                    provider.display_name, provider.default_model
                ));
            }
            Err(err) => self
                .conversation()
                .report_store_error("Failed to switch provider", &err),
        }
    }

    pub fn switch_model(&mut self, model: &str) {
        let provider_name = self.session.persona.provider_name.clone();
        let Some(provider) = find_builtin_provider(&provider_name) else {
            self.system(format!("Unknown provider: {provider_name}"));
            return;
        };
        let Some(model) = provider.find_model(model).map(str::to_string) else {
            self.system(format!(
                "Model '{model}' not available for provider '{provider_name}'"
            ));
            return;
        };

        match self.session.store.update_active_persona_model(&model) {
            Ok(persona) => {
                self.conversation().reset_conversation();
                self.session.persona = persona;
                self.system(format!("Switched to model: {model}"));
            }
            Err(err) => self
                .conversation()
                .report_store_error("Failed to switch model", &err),
        }
    }

    pub fn update_prompt(&mut self, prompt: &str) {
        match self.session.store.update_active_persona_prompt(prompt) {
            Ok(persona) => {
                self.conversation().reset_conversation();
                let name = persona.name.clone();
                self.session.persona = persona;
                self.system(format!(
                    "✨ Updated system prompt for {name} (conversation cleared)"
                ));
            }
            Err(err) => self
                .conversation()
                .report_store_error("Failed to update system prompt", &err),
        }
    }

    pub fn show_prompt(&mut self) {
        let persona = &self.session.persona;
        let message = format!(
            "Current system prompt for {}:\n\n{}",
            persona.name, persona.system_prompt
        );
        self.system(message);
    }

    /// Creates a persona from a `manifest_character` request and switches to
    /// it.
    pub fn manifest(&mut self, request: ManifestRequest) -> Option<StreamParams> {
        self.session.engine_state = EngineState::ToolDispatch;
        self.ui
            .set_status(StatusIndicator::Manifesting(request.name.clone()));
        info!(name = %request.name, image_url = %request.image_url, "manifesting persona");

        let persona = &self.session.persona;
        let new_persona = NewPersona::manifested(
            &request.name,
            &request.description,
            &request.image_url,
            &persona.provider_name,
            &persona.model_name,
        );

        let created = self
            .session
            .store
            .create_persona(&new_persona)
            .and_then(|created| self.session.store.set_active_persona(&created.name));
        match created {
            Ok(persona) => {
                let name = persona.name.clone();
                let confirmation = format!("🔮 Manifested {name}!");
                let introduction = self.activate(persona, confirmation);
                if introduction.is_some() {
                    // Held until the new persona's greeting arrives.
                    self.ui.set_status(StatusIndicator::Manifesting(name));
                }
                introduction
            }
            Err(err) => {
                warn!(error = %err, "manifest failed");
                self.session.engine_state = EngineState::Idle;
                self.ui.set_status(StatusIndicator::AtEase);
                self.system(format!("🔥 Manifest failed: {err}"));
                None
            }
        }
    }
}
