//! Event polling, dispatching, and UI rendering loop.
//!
//! Terminal input is read on a dedicated task and drained here together with
//! worker reports. Both become [`AppAction`]s, which are applied to the
//! shared [`App`](crate::core::app::App) in arrival order; any requests they
//! start are spawned on the [`ChatStreamService`].

use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use ratatui::prelude::Size;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::is_command;
use crate::core::app::{
    apply_actions, AppAction, AppActionContext, AppActionDispatcher, AppActionEnvelope, AppCommand,
};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::ui::renderer::ui;
use crate::ui::theme::cursor_color;

use super::keybindings::{resolve_key, KeyBinding, KeyContext};
use super::lifecycle::{
    apply_cursor_color_to_terminal, restore_terminal, setup_terminal, SharedTerminal,
};
use super::setup::{bootstrap_app, LaunchOptions};
use super::AppHandle;

/// Lines moved per mouse wheel notch.
const WHEEL_STEP: u16 = 3;

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

async fn is_exit_requested(app: &AppHandle) -> bool {
    app.read(|app| app.is_exit_requested()).await
}

async fn current_terminal_size(terminal: &SharedTerminal) -> Size {
    let terminal_guard = terminal.lock().await;
    terminal_guard.size().unwrap_or_default()
}

async fn try_draw_frame(
    app: &AppHandle,
    terminal: &SharedTerminal,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> io::Result<()> {
    if !*request_redraw {
        return Ok(());
    }

    let now = Instant::now();
    if now.duration_since(*last_draw) < frame_duration {
        return Ok(());
    }

    let mut terminal_guard = terminal.lock().await;
    app.update(|app| terminal_guard.draw(|f| ui(f, app)))
        .await?;
    *last_draw = now;
    *request_redraw = false;
    Ok(())
}

struct EventProcessingOutcome {
    events_processed: bool,
    request_redraw: bool,
    exit_requested: bool,
}

async fn process_ui_events(
    app: &AppHandle,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    dispatcher: &AppActionDispatcher,
    term_size: Size,
) -> EventProcessingOutcome {
    let mut outcome = EventProcessingOutcome {
        events_processed: false,
        request_redraw: false,
        exit_requested: false,
    };
    let ctx = AppActionContext {
        term_width: term_size.width,
        term_height: term_size.height,
    };

    while let Ok(ev) = event_rx.try_recv() {
        outcome.events_processed = true;
        match ev {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if route_keyboard_event(app, dispatcher, key, ctx).await {
                    outcome.exit_requested = true;
                    break;
                }
            }
            UiEvent::Crossterm(Event::Paste(text)) => {
                handle_paste_event(app, &text).await;
            }
            UiEvent::Crossterm(Event::Mouse(mouse)) => match mouse.kind {
                MouseEventKind::ScrollUp => dispatcher
                    .dispatch_many([AppAction::ScrollUp { lines: WHEEL_STEP }], ctx),
                MouseEventKind::ScrollDown => dispatcher
                    .dispatch_many([AppAction::ScrollDown { lines: WHEEL_STEP }], ctx),
                _ => {}
            },
            UiEvent::Crossterm(_) => {}
        }
    }

    if outcome.events_processed {
        outcome.request_redraw = true;
    }

    outcome
}

/// Applies one key press. Returns `true` when the key asks to quit.
async fn route_keyboard_event(
    app: &AppHandle,
    dispatcher: &AppActionDispatcher,
    key: event::KeyEvent,
    ctx: AppActionContext,
) -> bool {
    let context = app
        .read(|app| KeyContext::from_picker_open(app.ui.picker.is_some()))
        .await;

    match resolve_key(&key, context) {
        KeyBinding::Exit => return true,
        KeyBinding::Submit => {
            if let Some(action) = app.update(take_submission).await {
                dispatcher.dispatch_many([action], ctx);
            }
        }
        KeyBinding::InsertNewline => {
            app.update(|app| {
                if app.ui.input_remaining() > 0 {
                    app.ui.textarea_mut().insert_newline();
                }
            })
            .await;
        }
        KeyBinding::Action(action) => dispatcher.dispatch_many([action], ctx),
        KeyBinding::TextInput => {
            app.update(|app| {
                let input = tui_textarea::Input::from(key);
                let inserts_char =
                    matches!(input.key, tui_textarea::Key::Char(_)) && !input.ctrl && !input.alt;
                if inserts_char && app.ui.input_remaining() == 0 {
                    return;
                }
                app.ui.textarea_mut().input(input);
            })
            .await;
        }
        KeyBinding::Ignored => {}
    }
    false
}

/// Turns the input box into the action Enter should run. Text typed while a
/// reply is pending stays in the box so it is not lost to the busy notice.
fn take_submission(app: &mut crate::core::app::App) -> Option<AppAction> {
    let text = app.ui.get_input_text();
    if text.trim().is_empty() {
        return None;
    }

    if is_command(&text) {
        app.ui.clear_input();
        return Some(AppAction::ProcessCommand {
            input: text.trim().to_string(),
        });
    }

    if !app.session.is_busy() {
        app.ui.clear_input();
    }
    Some(AppAction::SubmitMessage { message: text })
}

pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

async fn handle_paste_event(app: &AppHandle, text: &str) {
    let sanitized_text = sanitize_pasted_text(text);
    if sanitized_text.is_empty() {
        return;
    }
    app.update(|app| app.ui.insert_pasted(&sanitized_text)).await;
}

/// Drains worker reports for the current stream into actions. Consecutive
/// fragments are merged, and the merged text is flushed before any other
/// report so nothing is reordered.
fn process_stream_updates(
    dispatcher: &AppActionDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ctx: AppActionContext,
    current_stream_id: u64,
) -> bool {
    let mut received_any = false;
    let mut coalesced_chunks = String::new();
    let mut actions = Vec::new();

    while let Ok((message, msg_stream_id)) = rx.try_recv() {
        if msg_stream_id != current_stream_id {
            continue;
        }
        received_any = true;

        if let StreamMessage::Chunk(content) = message {
            coalesced_chunks.push_str(&content);
            continue;
        }

        if !coalesced_chunks.is_empty() {
            actions.push(AppAction::AppendResponseChunk {
                content: std::mem::take(&mut coalesced_chunks),
                stream_id: msg_stream_id,
            });
        }
        actions.push(AppAction::from_stream(message, msg_stream_id));
    }

    if !coalesced_chunks.is_empty() {
        actions.push(AppAction::AppendResponseChunk {
            content: coalesced_chunks,
            stream_id: current_stream_id,
        });
    }

    if !actions.is_empty() {
        dispatcher.dispatch_many(actions, ctx);
    }

    received_any
}

async fn drain_action_queue(
    app: &AppHandle,
    stream_service: &ChatStreamService,
    action_rx: &mut mpsc::UnboundedReceiver<AppActionEnvelope>,
) -> bool {
    let mut pending = Vec::new();
    while let Ok(envelope) = action_rx.try_recv() {
        pending.push(envelope);
    }

    if pending.is_empty() {
        return false;
    }

    let commands = app.update(|app| apply_actions(app, pending)).await;
    for cmd in commands {
        match cmd {
            AppCommand::SpawnStream(params) => {
                debug!(stream_id = params.stream_id, "spawning request");
                stream_service.spawn_stream(params);
            }
        }
    }
    true
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat(options: LaunchOptions) -> Result<(), Box<dyn Error>> {
    let app = bootstrap_app(options)?;
    let app = AppHandle::new(std::sync::Arc::new(tokio::sync::Mutex::new(app)));

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppActionEnvelope>();
    let action_dispatcher = AppActionDispatcher::new(action_tx);

    let initial_cursor_color = app.read(|app| cursor_color(&app.persona().palette)).await;
    let terminal = setup_terminal(initial_cursor_color)?;
    let mut active_cursor_color = initial_cursor_color;

    let (stream_service, mut rx) = ChatStreamService::new();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    const MAX_FPS: u64 = 60;
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;
    let mut last_clock_tick = Instant::now();

    info!("chat loop started");

    let result: Result<(), Box<dyn Error>> = 'main_loop: loop {
        if is_exit_requested(&app).await {
            break 'main_loop Ok(());
        }

        if let Err(err) = try_draw_frame(
            &app,
            &terminal,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        )
        .await
        {
            break 'main_loop Err(err.into());
        }

        let term_size = current_terminal_size(&terminal).await;
        let ctx = AppActionContext {
            term_width: term_size.width,
            term_height: term_size.height,
        };

        let event_outcome =
            process_ui_events(&app, &mut event_rx, &action_dispatcher, term_size).await;

        if event_outcome.exit_requested {
            break 'main_loop Ok(());
        }

        if event_outcome.request_redraw {
            request_redraw = true;
        }

        let current_stream_id = app.read(|app| app.session.current_stream_id).await;
        let received_any =
            process_stream_updates(&action_dispatcher, &mut rx, ctx, current_stream_id);
        if received_any {
            request_redraw = true;
        }

        if drain_action_queue(&app, &stream_service, &mut action_rx).await {
            request_redraw = true;
        }

        let persona_cursor_color = app.read(|app| cursor_color(&app.persona().palette)).await;
        if persona_cursor_color != active_cursor_color {
            if let Err(err) = apply_cursor_color_to_terminal(&terminal, persona_cursor_color).await
            {
                break 'main_loop Err(err.into());
            }
            active_cursor_color = persona_cursor_color;
        }

        // The header clock shows seconds.
        if last_clock_tick.elapsed() >= Duration::from_secs(1) {
            last_clock_tick = Instant::now();
            request_redraw = true;
        }

        let idle = !event_outcome.events_processed && !received_any && !request_redraw;
        if idle {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    event_reader_handle.abort();
    app.update(|app| {
        app.conversation().abandon_request();
    })
    .await;
    restore_terminal(&terminal).await?;
    info!("chat loop finished");

    result
}
