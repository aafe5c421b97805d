use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use ratatui::text::Line;
use tui_textarea::{CursorMove, TextArea};

use super::picker::PickerState;
use crate::core::message::{Message, TranscriptRole};
use crate::ui::theme::TranscriptStyle;
use crate::ui::transcript::push_message_lines;
use crate::utils::scroll::ScrollCalculator;

/// The header's activity indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusIndicator {
    AtEase,
    Processing,
    /// Fragments are arriving.
    Typing,
    Manifesting(String),
}

impl StatusIndicator {
    pub fn icon(&self) -> &'static str {
        match self {
            StatusIndicator::AtEase => "●",
            StatusIndicator::Processing => "🤔",
            StatusIndicator::Typing => "✎",
            StatusIndicator::Manifesting(_) => "🔮",
        }
    }

    pub fn text(&self) -> String {
        match self {
            StatusIndicator::AtEase => String::new(),
            StatusIndicator::Processing => "processing...".to_string(),
            StatusIndicator::Typing => "typing..".to_string(),
            StatusIndicator::Manifesting(name) => format!("manifesting {name}"),
        }
    }

    pub fn label(&self) -> String {
        let text = self.text();
        if text.is_empty() {
            self.icon().to_string()
        } else {
            format!("{} {}", self.icon(), text)
        }
    }
}

/// Whether the last provider exchange succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Online,
    Offline,
}

impl ApiStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiStatus::Online => "online",
            ApiStatus::Offline => "offline",
        }
    }
}

pub struct UiState {
    pub messages: VecDeque<Message>,
    pub status: StatusIndicator,
    pub api_status: ApiStatus,
    /// First visible wrapped line of the transcript.
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    /// Largest useful offset as of the last frame.
    pub max_scroll: u16,
    textarea: TextArea<'static>,
    input_char_limit: usize,
    pub picker: Option<PickerState>,
    pub exit_requested: bool,
    prewrap_cache: Option<PrewrapCache>,
}

impl UiState {
    pub fn new(input_char_limit: usize) -> Self {
        let mut textarea = TextArea::default();
        textarea.set_placeholder_text("Send a message...");
        Self {
            messages: VecDeque::new(),
            status: StatusIndicator::AtEase,
            api_status: ApiStatus::Offline,
            scroll_offset: 0,
            auto_scroll: true,
            max_scroll: 0,
            textarea,
            input_char_limit,
            picker: None,
            exit_requested: false,
            prewrap_cache: None,
        }
    }

    pub fn set_status(&mut self, status: StatusIndicator) {
        self.status = status;
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.invalidate_prewrap_cache();
    }

    pub fn remove_message(&mut self, index: usize) -> Option<Message> {
        self.invalidate_prewrap_cache();
        self.messages.remove(index)
    }

    /// Appends streamed text to the message at `index`.
    pub fn append_to_message(&mut self, index: usize, chunk: &str) {
        if index + 1 != self.messages.len() {
            self.invalidate_prewrap_cache();
        }
        if let Some(message) = self.messages.get_mut(index) {
            message.content.push_str(chunk);
        }
    }

    /// Keeps the message at `index` on screen but out of the history.
    pub fn mark_local_only(&mut self, index: usize) {
        if let Some(message) = self.messages.get_mut(index) {
            message.local_only = true;
        }
    }

    /// Wrapped transcript lines for `width`, reused across frames. When only
    /// the last message changed, only that message is wrapped again.
    pub fn prewrapped_lines_cached(
        &mut self,
        style: &TranscriptStyle,
        width: u16,
    ) -> &[Line<'static>] {
        let messages_len = self.messages.len();
        let last_msg_hash = hash_last_message(&self.messages);

        let mut can_reuse = false;
        let mut only_last_changed = false;
        if let Some(cache) = &self.prewrap_cache {
            if cache.width == width && cache.style == *style && cache.messages_len == messages_len
            {
                if cache.last_msg_hash == last_msg_hash {
                    can_reuse = true;
                } else {
                    only_last_changed = true;
                }
            }
        }

        if only_last_changed {
            if let (Some(cache), Some(last)) = (self.prewrap_cache.as_mut(), self.messages.back()) {
                let mut speaker = cache.speaker_before_last;
                let mut tail = Vec::new();
                push_message_lines(&mut tail, last, &mut speaker, style);
                cache.lines.truncate(cache.last_start);
                cache
                    .lines
                    .extend(ScrollCalculator::prewrap_lines(&tail, width));
                cache.last_msg_hash = last_msg_hash;
            }
        } else if !can_reuse {
            self.prewrap_cache = Some(PrewrapCache::build(&self.messages, style, width));
        }

        match &self.prewrap_cache {
            Some(cache) => cache.lines.as_slice(),
            None => &[],
        }
    }

    pub fn invalidate_prewrap_cache(&mut self) {
        self.prewrap_cache = None;
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn textarea_mut(&mut self) -> &mut TextArea<'static> {
        &mut self.textarea
    }

    pub fn get_input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn input_char_count(&self) -> usize {
        let lines = self.textarea.lines();
        lines.iter().map(|line| line.chars().count()).sum::<usize>() + lines.len().saturating_sub(1)
    }

    pub fn input_char_limit(&self) -> usize {
        self.input_char_limit
    }

    /// Room left in the input box before the character limit.
    pub fn input_remaining(&self) -> usize {
        self.input_char_limit.saturating_sub(self.input_char_count())
    }

    pub fn set_input_text(&mut self, text: &str) {
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let mut textarea = TextArea::from(lines);
        textarea.set_placeholder_text("Send a message...");
        textarea.move_cursor(CursorMove::Bottom);
        textarea.move_cursor(CursorMove::End);
        self.textarea = textarea;
    }

    pub fn clear_input(&mut self) {
        self.set_input_text("");
    }

    /// Inserts pasted text, cut to the remaining room.
    pub fn insert_pasted(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let allowed: String = normalized.chars().take(self.input_remaining()).collect();
        if !allowed.is_empty() {
            self.textarea.insert_str(allowed);
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(self.max_scroll);
        if self.scroll_offset >= self.max_scroll {
            self.auto_scroll = true;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.auto_scroll = true;
        self.scroll_offset = self.max_scroll;
    }

    /// Reconciles the offset with a freshly measured transcript height and
    /// returns the offset to draw with.
    pub fn sync_scroll(&mut self, total_lines: u16, viewport_height: u16) -> u16 {
        self.max_scroll = total_lines.saturating_sub(viewport_height);
        if self.auto_scroll || self.scroll_offset > self.max_scroll {
            self.scroll_offset = self.max_scroll;
        }
        self.scroll_offset
    }
}

struct PrewrapCache {
    width: u16,
    style: TranscriptStyle,
    messages_len: usize,
    last_msg_hash: u64,
    lines: Vec<Line<'static>>,
    /// Index in `lines` where the last message's rows begin.
    last_start: usize,
    speaker_before_last: Option<TranscriptRole>,
}

impl PrewrapCache {
    fn build(messages: &VecDeque<Message>, style: &TranscriptStyle, width: u16) -> Self {
        let prefix_len = messages.len().saturating_sub(1);
        let mut speaker = None;
        let mut logical = Vec::new();
        for message in messages.iter().take(prefix_len) {
            push_message_lines(&mut logical, message, &mut speaker, style);
        }
        let mut lines = ScrollCalculator::prewrap_lines(&logical, width);
        let last_start = lines.len();
        let speaker_before_last = speaker;

        if let Some(last) = messages.back() {
            let mut tail = Vec::new();
            push_message_lines(&mut tail, last, &mut speaker, style);
            lines.extend(ScrollCalculator::prewrap_lines(&tail, width));
        }

        Self {
            width,
            style: *style,
            messages_len: messages.len(),
            last_msg_hash: hash_last_message(messages),
            lines,
            last_start,
            speaker_before_last,
        }
    }
}

fn hash_last_message(messages: &VecDeque<Message>) -> u64 {
    let mut h = DefaultHasher::new();
    if let Some(m) = messages.back() {
        m.role.hash(&mut h);
        m.content.hash(&mut h);
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::transcript::build_transcript_lines;

    fn wrapped_from_scratch(
        ui: &UiState,
        style: &TranscriptStyle,
        width: u16,
    ) -> Vec<Line<'static>> {
        ScrollCalculator::prewrap_lines(&build_transcript_lines(&ui.messages, style), width)
    }

    #[test]
    fn status_labels_match_indicator() {
        assert_eq!(StatusIndicator::AtEase.label(), "●");
        assert_eq!(StatusIndicator::Processing.label(), "🤔 processing...");
        assert_eq!(
            StatusIndicator::Manifesting("Rin".to_string()).label(),
            "🔮 manifesting Rin"
        );
        assert_eq!(StatusIndicator::Typing.label(), "✎ typing..");
    }

    #[test]
    fn input_round_trips_multiline_text() {
        let mut ui = UiState::new(2000);
        ui.set_input_text("hello\nworld");
        assert_eq!(ui.get_input_text(), "hello\nworld");
        assert_eq!(ui.input_char_count(), 11);
        ui.clear_input();
        assert_eq!(ui.get_input_text(), "");
    }

    #[test]
    fn paste_respects_character_limit() {
        let mut ui = UiState::new(5);
        ui.set_input_text("ab");
        ui.insert_pasted("cdefgh");
        assert_eq!(ui.get_input_text(), "abcde");
        assert_eq!(ui.input_remaining(), 0);
    }

    #[test]
    fn scrolling_up_pauses_auto_scroll_until_bottom() {
        let mut ui = UiState::new(10);
        assert_eq!(ui.sync_scroll(50, 10), 40);

        ui.scroll_up(5);
        assert!(!ui.auto_scroll);
        assert_eq!(ui.sync_scroll(60, 10), 35);

        ui.scroll_down(100);
        assert!(ui.auto_scroll);
        assert_eq!(ui.sync_scroll(60, 10), 50);
    }
    #[test]
    fn prewrap_cache_reuse_no_changes() {
        let style = TranscriptStyle::default();
        let mut ui = UiState::new(2000);
        for i in 0..50 {
            ui.push_message(if i % 2 == 0 {
                Message::user("lorem ipsum dolor sit amet consectetur adipiscing elit")
            } else {
                Message::assistant("lorem ipsum dolor sit amet consectetur adipiscing elit")
            });
        }
        let ptr1 = {
            let lines = ui.prewrapped_lines_cached(&style, 100);
            assert!(!lines.is_empty());
            lines.as_ptr()
        };
        let ptr2 = ui.prewrapped_lines_cached(&style, 100).as_ptr();
        assert_eq!(ptr1, ptr2, "cache should be reused when nothing changed");
    }

    #[test]
    fn prewrap_cache_invalidates_on_width_and_style_change() {
        let style = TranscriptStyle::default();
        let mut ui = UiState::new(2000);
        ui.push_message(Message::user("hello world, how are you today?"));

        let narrow = ui.prewrapped_lines_cached(&style, 10).len();
        let wide = ui.prewrapped_lines_cached(&style, 120).len();
        assert!(narrow > wide);
        assert_eq!(wide, 1);

        let mut other = style;
        other.user = other.user.add_modifier(ratatui::style::Modifier::ITALIC);
        let lines = ui.prewrapped_lines_cached(&other, 120).to_vec();
        assert_eq!(lines, wrapped_from_scratch(&ui, &other, 120));
    }

    #[test]
    fn prewrap_cache_rewraps_a_growing_last_message() {
        let style = TranscriptStyle::default();
        let mut ui = UiState::new(2000);
        ui.push_message(Message::user("Tell me a story"));
        ui.push_message(Message::assistant(""));
        ui.prewrapped_lines_cached(&style, 24);

        for chunk in ["Once upon ", "a time there ", "lived a very patient ", "crab."] {
            ui.append_to_message(1, chunk);
            let cached = ui.prewrapped_lines_cached(&style, 24).to_vec();
            assert_eq!(cached, wrapped_from_scratch(&ui, &style, 24));
        }
    }

    #[test]
    fn prewrap_cache_tracks_edits_behind_the_last_message() {
        let style = TranscriptStyle::default();
        let mut ui = UiState::new(2000);
        ui.push_message(Message::user("hello"));
        ui.push_message(Message::assistant(""));
        ui.push_message(Message::system("⏳ Still working on the last reply."));
        ui.prewrapped_lines_cached(&style, 40);

        ui.append_to_message(1, "streamed behind a notice");
        let cached = ui.prewrapped_lines_cached(&style, 40).to_vec();
        assert_eq!(cached, wrapped_from_scratch(&ui, &style, 40));

        ui.remove_message(1);
        ui.push_message(Message::system("⚠️ The provider returned an empty response."));
        let cached = ui.prewrapped_lines_cached(&style, 40).to_vec();
        assert_eq!(cached, wrapped_from_scratch(&ui, &style, 40));

        ui.clear_messages();
        assert!(ui.prewrapped_lines_cached(&style, 40).is_empty());
    }
}
