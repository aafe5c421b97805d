use super::{open_picker, App, AppAction, AppActionContext, AppCommand};
use crate::commands::{process_input, CommandResult};

/// Rows lost to the header, borders and input box when paging.
const PAGE_CHROME_ROWS: u16 = 14;

pub(super) fn handle_input_action(
    app: &mut App,
    action: AppAction,
    ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::ProcessCommand { input } => match process_input(app, &input) {
            CommandResult::Continue => None,
            CommandResult::Quit => {
                app.request_exit();
                None
            }
            CommandResult::OpenPicker(kind) => {
                open_picker(app, kind);
                None
            }
            CommandResult::Request(params) => Some(AppCommand::SpawnStream(params)),
        },
        AppAction::ScrollUp { lines } => {
            app.ui.scroll_up(lines);
            None
        }
        AppAction::ScrollDown { lines } => {
            app.ui.scroll_down(lines);
            None
        }
        AppAction::PageUp => {
            app.ui.scroll_up(page_size(ctx));
            None
        }
        AppAction::PageDown => {
            app.ui.scroll_down(page_size(ctx));
            None
        }
        AppAction::ScrollToBottom => {
            app.ui.scroll_to_bottom();
            None
        }
        _ => unreachable!("non-input action routed to input handler"),
    }
}

fn page_size(ctx: AppActionContext) -> u16 {
    ctx.term_height.saturating_sub(PAGE_CHROME_ROWS).max(1)
}
