use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::app::{App, PickerState};
use crate::ui::theme::{api_status_color, TranscriptStyle};
use crate::ui::transcript::status_line;

/// Rows in the info panel beside the portrait.
const INFO_ROWS: u16 = 10;
/// Tallest the input box grows before it scrolls.
const MAX_INPUT_ROWS: u16 = 5;

pub fn ui(f: &mut Frame, app: &mut App) {
    let style = TranscriptStyle::from_palette(&app.persona().palette);

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(style.border);
    let inner = outer.inner(f.area());
    f.render_widget(outer, f.area());
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let art = app.persona().ascii_art_or_placeholder().to_string();
    let art_height = art.lines().count() as u16;
    let header_height = art_height.max(INFO_ROWS + 2);
    let input_rows = (app.ui.textarea().lines().len() as u16).clamp(1, MAX_INPUT_ROWS);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header_height),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_rows),
        ])
        .split(inner);

    render_header(f, app, &style, &art, chunks[0]);
    render_rule(f, &style, chunks[1]);
    render_transcript(f, app, &style, chunks[2]);
    render_rule(f, &style, chunks[3]);
    f.render_widget(app.ui.textarea(), chunks[4]);

    if let Some(picker) = &app.ui.picker {
        render_picker(f, picker, &style, chunks[2]);
    }
}

fn render_rule(f: &mut Frame, style: &TranscriptStyle, area: Rect) {
    let rule = "─".repeat(area.width as usize);
    f.render_widget(Paragraph::new(Span::styled(rule, style.border)), area);
}

fn render_header(f: &mut Frame, app: &App, style: &TranscriptStyle, art: &str, area: Rect) {
    let art_width = art.lines().map(UnicodeWidthStr::width).max().unwrap_or(0) as u16;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(art_width.min(area.width)),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let art_lines: Vec<Line> = art
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), style.art)))
        .collect();
    f.render_widget(Paragraph::new(art_lines), columns[0]);

    let bar: Vec<Line> = (0..area.height)
        .map(|_| Line::from(Span::styled("│", style.border)))
        .collect();
    f.render_widget(Paragraph::new(bar), columns[1]);

    let panel = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(columns[2]);

    f.render_widget(Paragraph::new(info_lines(app, style)), panel[0]);
    render_rule(f, style, panel[1]);
    f.render_widget(
        Paragraph::new(status_line(&app.ui.status)).alignment(Alignment::Center),
        panel[2],
    );
}

fn info_lines(app: &App, style: &TranscriptStyle) -> Vec<Line<'static>> {
    let field = |label: &str, value: String, value_style: Style| {
        Line::from(vec![
            Span::styled(format!("{label}: "), style.label),
            Span::styled(value, value_style),
        ])
    };

    let persona = app.persona();
    let conversation = app
        .active_conversation()
        .map(|conversation| conversation.name.clone())
        .unwrap_or_else(|| "none".to_string());
    let api_status = app.ui.api_status;

    vec![
        Line::from(Span::styled(
            Local::now().format("%H:%M:%S").to_string(),
            style.clock,
        ))
        .alignment(Alignment::Center),
        Line::default(),
        field("persona", persona.name.clone(), style.value),
        field("provider", persona.provider_name.clone(), style.value),
        field("model", persona.model_name.clone(), style.value),
        field("conv", conversation, style.value),
        field(
            "status",
            api_status.as_str().to_string(),
            Style::default()
                .fg(api_status_color(api_status))
                .add_modifier(Modifier::BOLD),
        ),
    ]
}

fn render_transcript(f: &mut Frame, app: &mut App, style: &TranscriptStyle, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let total = app.ui.prewrapped_lines_cached(style, area.width).len();
    let offset = app
        .ui
        .sync_scroll(u16::try_from(total).unwrap_or(u16::MAX), area.height);

    let visible: Vec<Line> = app
        .ui
        .prewrapped_lines_cached(style, area.width)
        .iter()
        .skip(usize::from(offset))
        .take(usize::from(area.height))
        .cloned()
        .collect();
    f.render_widget(Paragraph::new(visible), area);
}

fn render_picker(f: &mut Frame, picker: &PickerState, style: &TranscriptStyle, area: Rect) {
    let popup = centered_rect(area, 70, 80);
    if popup.width < 4 || popup.height < 3 {
        return;
    }

    let items: Vec<ListItem> = picker
        .items
        .iter()
        .map(|item| {
            let marker = if item.current { "* " } else { "  " };
            let mut spans = vec![Span::styled(format!("{marker}{}", item.label), style.value)];
            if let Some(detail) = &item.detail {
                spans.push(Span::styled(format!("  {detail}"), style.label));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" {} ", picker.kind.title()))
                .title_bottom(Line::from(" ↑/↓ move • Enter select • Esc close ").right_aligned())
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(style.border),
        )
        .highlight_style(style.user.add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(picker.selected));
    f.render_widget(Clear, popup);
    f.render_stateful_widget(list, popup, &mut state);
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y) / 100) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
