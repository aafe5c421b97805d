use super::*;
use crate::core::app::PickerKind;
use crate::core::message::TranscriptRole;
use crate::utils::test_utils::create_test_app;

fn last_system_message(app: &App) -> String {
    let message = app.ui.messages.back().expect("a message");
    assert_eq!(message.role, TranscriptRole::System);
    message.content.clone()
}

fn run(app: &mut App, input: &str) -> String {
    let result = process_input(app, input);
    assert!(matches!(result, CommandResult::Continue), "{input} should continue");
    last_system_message(app)
}

#[test]
fn slash_and_colon_q_are_commands() {
    assert!(is_command("/help"));
    assert!(is_command("  /list personas"));
    assert!(is_command(":q"));
    assert!(is_command(" :q "));
    assert!(!is_command("hello /there"));
    assert!(!is_command(":quit"));
}

#[test]
fn quit_variants_exit() {
    let mut app = create_test_app();
    assert!(matches!(process_input(&mut app, ":q"), CommandResult::Quit));
    assert!(matches!(process_input(&mut app, "/quit"), CommandResult::Quit));
    assert!(matches!(process_input(&mut app, "/QUIT"), CommandResult::Quit));
    assert!(app.ui.messages.is_empty());
}

#[test]
fn unknown_commands_are_reported_once() {
    let mut app = create_test_app();
    assert_eq!(
        run(&mut app, "/frobnicate now"),
        "Unknown command: /frobnicate now"
    );
    assert_eq!(run(&mut app, "/"), "Unknown command: /");
    assert_eq!(app.ui.messages.len(), 2);
}

#[test]
fn invocation_arguments_keep_inner_spacing() {
    let invocation = CommandInvocation {
        input: "/manifest Rin http://x a  tall  mage",
        args: "Rin http://x a  tall  mage ",
    };
    assert_eq!(invocation.arg(0), Some("Rin"));
    assert_eq!(invocation.arg(1), Some("http://x"));
    assert_eq!(invocation.arg(9), None);
    assert_eq!(invocation.rest_after(2), "a  tall  mage");
    assert_eq!(invocation.rest_after(0), "Rin http://x a  tall  mage");
    assert_eq!(invocation.rest_after(6), "");
}

#[test]
fn list_without_target_prints_usage() {
    let mut app = create_test_app();
    assert_eq!(
        run(&mut app, "/list"),
        "Usage: /list personas|conversations|providers|models [provider]"
    );
    assert_eq!(run(&mut app, "/list colours"), "Unknown list type: colours");
}

#[test]
fn list_personas_marks_the_active_one() {
    let mut app = create_test_app();
    let text = run(&mut app, "/list ais");
    assert!(text.starts_with("Available personas:"));
    assert!(text.contains("* Default ("));
    assert!(text.contains("  Io ("));
    assert!(text.contains("  Makise ("));
}

#[test]
fn list_conversations_when_there_are_none() {
    let mut app = create_test_app();
    assert_eq!(
        run(&mut app, "/list conversations"),
        "No conversations yet for Default."
    );
}

#[test]
fn list_conversations_shows_ids_and_hint() {
    let mut app = create_test_app();
    let persona_id = app.persona().id;
    let conversation = app
        .session
        .store
        .create_conversation("Morning chat", persona_id)
        .expect("conversation");

    let text = run(&mut app, "/list conversations");
    assert!(text.starts_with("Conversations for Default:"));
    assert!(text.contains(&format!("[{}] Morning chat", conversation.id)));
    assert!(text.ends_with("Use /resume <id> to continue one."));
}

#[test]
fn list_providers_and_models() {
    let mut app = create_test_app();
    let providers = run(&mut app, "/list apis");
    assert!(providers.starts_with("Available providers:"));
    assert!(providers.contains("* gemini - Google Gemini"));

    let models = run(&mut app, "/list models");
    assert!(models.starts_with("Models for Google Gemini:"));
    assert!(models.contains("gemini-2.5-flash-lite (default)"));
    assert!(models.contains("gemini-2.5-flash"));

    assert_eq!(run(&mut app, "/list models openai"), "Unknown provider: openai");
}

#[test]
fn set_without_target_prints_usage() {
    let mut app = create_test_app();
    assert_eq!(
        run(&mut app, "/set"),
        "Usage: /set persona|provider|model [name] or /set prompt <text>"
    );
    assert_eq!(run(&mut app, "/set colour red"), "Unknown set type: colour");
}

#[test]
fn set_without_a_value_opens_pickers() {
    let mut app = create_test_app();
    assert!(matches!(
        process_input(&mut app, "/set persona"),
        CommandResult::OpenPicker(PickerKind::Persona)
    ));
    assert!(matches!(
        process_input(&mut app, "/set api"),
        CommandResult::OpenPicker(PickerKind::Provider)
    ));
    assert!(matches!(
        process_input(&mut app, "/set model"),
        CommandResult::OpenPicker(PickerKind::Model)
    ));
    assert!(matches!(
        process_input(&mut app, "/resume"),
        CommandResult::OpenPicker(PickerKind::Conversation)
    ));
}

#[test]
fn set_persona_by_name_requests_an_introduction() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/set persona makise");
    assert!(matches!(result, CommandResult::Request(_)));
    assert_eq!(app.persona().name, "Makise");
    assert_eq!(last_system_message(&app), "✨ Switched to persona: Makise");
}

#[test]
fn set_unknown_persona_continues() {
    let mut app = create_test_app();
    assert_eq!(run(&mut app, "/set persona Nobody"), "Unknown persona: Nobody");
    assert_eq!(app.persona().name, "Default");
}

#[test]
fn set_prompt_requires_text_and_keeps_spacing() {
    let mut app = create_test_app();
    assert_eq!(run(&mut app, "/set prompt"), "Usage: /set prompt <text>");

    assert_eq!(
        run(&mut app, "/set prompt Be  brief."),
        "✨ Updated system prompt for Default (conversation cleared)"
    );
    assert_eq!(app.persona().system_prompt, "Be  brief.");
    assert_eq!(
        run(&mut app, "/show prompt"),
        "Current system prompt for Default:\n\nBe  brief."
    );
}

#[test]
fn show_validates_its_target() {
    let mut app = create_test_app();
    assert_eq!(run(&mut app, "/show"), "Usage: /show prompt");
    assert_eq!(run(&mut app, "/show palette"), "Unknown show type: palette");
}

#[test]
fn help_lists_visible_commands() {
    let mut app = create_test_app();
    let text = run(&mut app, "/commands");
    assert!(text.starts_with("Available Commands:"));
    assert!(text.contains("/resume [id]"));
    assert!(text.contains("/quit, :q"));
    assert!(text.contains("Esc cancels a reply in progress."));
    for command in all_commands() {
        if !command.usage.is_empty() {
            assert!(text.contains(command.help), "help for {}", command.name);
        }
    }
}

#[test]
fn conversation_commands_validate_arguments() {
    let mut app = create_test_app();
    assert_eq!(run(&mut app, "/resume abc"), "Invalid conversation id: abc");
    assert_eq!(run(&mut app, "/delete 1x"), "Invalid conversation id: 1x");
    assert_eq!(run(&mut app, "/rename"), "Usage: /rename <name>");
    assert_eq!(run(&mut app, "/delete"), "No active conversation to delete.");
}

#[test]
fn clear_is_silent() {
    let mut app = create_test_app();
    app.conversation().add_system_message("note");
    assert!(matches!(
        process_input(&mut app, "/clear"),
        CommandResult::Continue
    ));
    assert!(app.ui.messages.is_empty());
}

#[test]
fn manifest_validates_like_the_tool() {
    let mut app = create_test_app();
    assert_eq!(
        run(&mut app, "/manifest"),
        "Usage: /manifest <name> <image-url> <description>"
    );
    assert_eq!(
        run(&mut app, "/manifest Rin"),
        "🔥 Manifest failed: Missing required parameters (image_url, description). \
         Usage: /manifest <name> <image-url> <description>"
    );
    assert_eq!(app.persona().name, "Default");
}

#[test]
fn manifest_creates_and_switches_persona() {
    let mut app = create_test_app();
    let result = process_input(
        &mut app,
        "/manifest Rin https://example.com/rin.png A  quiet archer",
    );
    assert!(matches!(result, CommandResult::Request(_)));
    assert_eq!(app.persona().name, "Rin");
    assert_eq!(
        app.persona().image_url.as_deref(),
        Some("https://example.com/rin.png")
    );
    assert!(app.persona().system_prompt.contains("A  quiet archer"));
    assert_eq!(last_system_message(&app), "🔮 Manifested Rin!");
}
