//! Projects the transcript cache into display lines.
//!
//! The projection is independent of the viewport: wrapping happens later in
//! [`crate::utils::scroll::ScrollCalculator`].

use std::collections::VecDeque;

use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::app::StatusIndicator;
use crate::core::message::{Message, TranscriptRole};
use crate::ui::theme::{status_color, TranscriptStyle};

pub const SEPARATOR: &str = "───";

fn role_style(role: TranscriptRole, style: &TranscriptStyle) -> (Style, Alignment) {
    match role {
        TranscriptRole::User => (style.user, Alignment::Right),
        TranscriptRole::Assistant => (style.assistant, Alignment::Left),
        TranscriptRole::System => (style.system, Alignment::Left),
    }
}

fn push_block(lines: &mut Vec<Line<'static>>, content: &str, style: Style, alignment: Alignment) {
    for text in content.split('\n') {
        lines.push(Line::from(Span::styled(text.to_string(), style)).alignment(alignment));
    }
}

/// Builds the transcript lines for `messages`.
///
/// A separator in the color and alignment of the role that just finished
/// is inserted whenever the speaker changes. System messages are set apart
/// by blank lines and do not count as a speaker.
pub fn build_transcript_lines(
    messages: &VecDeque<Message>,
    style: &TranscriptStyle,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut last_speaker = None;
    for message in messages {
        push_message_lines(&mut lines, message, &mut last_speaker, style);
    }
    lines
}

/// Appends the lines of one message, including the separator it opens
/// with, and advances `last_speaker`.
pub fn push_message_lines(
    lines: &mut Vec<Line<'static>>,
    message: &Message,
    last_speaker: &mut Option<TranscriptRole>,
    style: &TranscriptStyle,
) {
    let (message_style, alignment) = role_style(message.role, style);

    if message.role.is_system() {
        lines.push(Line::default());
        push_block(lines, &message.content, message_style, alignment);
        lines.push(Line::default());
        return;
    }

    if let Some(previous) = last_speaker.filter(|previous| *previous != message.role) {
        let (separator_style, separator_alignment) = role_style(previous, style);
        lines.push(
            Line::from(Span::styled(SEPARATOR, separator_style)).alignment(separator_alignment),
        );
    }

    push_block(lines, &message.content, message_style, alignment);
    *last_speaker = Some(message.role);
}

/// The header's activity line, e.g. `🤔 processing...`.
pub fn status_line(status: &StatusIndicator) -> Line<'static> {
    Line::from(Span::styled(
        status.label(),
        Style::default()
            .fg(status_color(status))
            .add_modifier(Modifier::BOLD),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn project(messages: Vec<Message>) -> Vec<Line<'static>> {
        build_transcript_lines(&messages.into(), &TranscriptStyle::default())
    }

    fn texts(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn empty_cache_projects_nothing() {
        assert!(project(Vec::new()).is_empty());
    }

    #[test]
    fn separator_marks_speaker_changes() {
        let lines = project(vec![
            Message::user("hello"),
            Message::assistant("hi!"),
            Message::user("how are you?"),
        ]);
        assert_eq!(
            texts(&lines),
            vec!["hello", SEPARATOR, "hi!", SEPARATOR, "how are you?"]
        );
    }

    #[test]
    fn separator_uses_the_finished_speakers_look() {
        let style = TranscriptStyle::default();
        let lines = project(vec![Message::user("hello"), Message::assistant("hi!")]);

        assert_eq!(lines[0].alignment, Some(Alignment::Right));
        assert_eq!(lines[1].alignment, Some(Alignment::Right));
        assert_eq!(lines[1].spans[0].style, style.user);
        assert_eq!(lines[2].alignment, Some(Alignment::Left));
        assert_eq!(lines[2].spans[0].style.fg, Some(Color::Rgb(0xff, 0x79, 0xc6)));
    }

    #[test]
    fn consecutive_messages_of_one_role_share_a_block() {
        let lines = project(vec![Message::user("one"), Message::user("two")]);
        assert_eq!(texts(&lines), vec!["one", "two"]);
    }

    #[test]
    fn system_messages_do_not_reset_the_speaker() {
        let lines = project(vec![
            Message::user("hello"),
            Message::system("⚠️ Failed to save user message"),
            Message::assistant("hi!"),
        ]);
        assert_eq!(
            texts(&lines),
            vec![
                "hello",
                "",
                "⚠️ Failed to save user message",
                "",
                SEPARATOR,
                "hi!"
            ]
        );
        assert_eq!(lines[4].alignment, Some(Alignment::Right));
    }

    #[test]
    fn system_message_before_anyone_speaks_has_no_separator() {
        let lines = project(vec![
            Message::system("✨ Switched to persona: Io"),
            Message::assistant("Hello!"),
        ]);
        assert_eq!(texts(&lines), vec!["", "✨ Switched to persona: Io", "", "Hello!"]);
    }

    #[test]
    fn multiline_content_keeps_its_lines() {
        let lines = project(vec![Message::assistant("first\nsecond")]);
        assert_eq!(texts(&lines), vec!["first", "second"]);
        assert!(lines.iter().all(|line| line.alignment == Some(Alignment::Left)));
    }

    #[test]
    fn status_line_shows_icon_and_text() {
        let line = status_line(&StatusIndicator::Typing);
        assert_eq!(texts(&[line.clone()]), vec!["✎ typing.."]);
        assert_eq!(line.spans[0].style.fg, Some(Color::Indexed(12)));
        assert_eq!(texts(&[status_line(&StatusIndicator::AtEase)]), vec!["●"]);
    }
}
