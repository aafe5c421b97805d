//! Styles derived from the active persona's palette.

use ratatui::style::{Color, Modifier, Style};

use crate::core::app::{ApiStatus, StatusIndicator};
use crate::core::persona::{Palette, PaletteSlot};
use crate::utils::color::{hex_or_reset, parse_hex_color};

/// Everything the transcript and header need to color themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptStyle {
    pub user: Style,
    pub assistant: Style,
    /// The persona portrait.
    pub art: Style,
    pub system: Style,
    pub border: Style,
    pub clock: Style,
    pub label: Style,
    pub value: Style,
}

impl TranscriptStyle {
    pub fn from_palette(palette: &Palette) -> Self {
        let color = |slot| Style::default().fg(hex_or_reset(palette.get(slot)));
        Self {
            user: color(PaletteSlot::User),
            assistant: color(PaletteSlot::Assistant),
            art: color(PaletteSlot::Accent),
            system: color(PaletteSlot::System),
            border: color(PaletteSlot::Border),
            clock: color(PaletteSlot::Clock).add_modifier(Modifier::BOLD),
            label: color(PaletteSlot::Label),
            value: color(PaletteSlot::Value),
        }
    }
}

impl Default for TranscriptStyle {
    fn default() -> Self {
        Self::from_palette(&Palette::default())
    }
}

/// Fixed terminal colors for the activity indicator.
pub fn status_color(status: &StatusIndicator) -> Color {
    match status {
        StatusIndicator::AtEase => Color::Indexed(10),
        StatusIndicator::Processing => Color::Indexed(11),
        StatusIndicator::Typing => Color::Indexed(12),
        StatusIndicator::Manifesting(_) => Color::Indexed(13),
    }
}

pub fn api_status_color(status: ApiStatus) -> Color {
    match status {
        ApiStatus::Online => Color::Indexed(10),
        ApiStatus::Offline => Color::Indexed(9),
    }
}

/// The input cursor follows the user's message color.
pub fn cursor_color(palette: &Palette) -> Option<Color> {
    parse_hex_color(palette.get(PaletteSlot::User))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_maps_slots() {
        let style = TranscriptStyle::default();
        assert_eq!(style.user.fg, Some(Color::Rgb(0x00, 0x61, 0xcd)));
        assert_eq!(style.assistant.fg, Some(Color::Rgb(0xff, 0x79, 0xc6)));
        assert_eq!(style.border.fg, Some(Color::Rgb(0x60, 0xa5, 0xfa)));
        assert_eq!(style.system.fg, Some(Color::Rgb(0xfb, 0xbf, 0x24)));
        assert_eq!(style.value.fg, Some(Color::Rgb(0x95, 0x00, 0x56)));
        assert!(style.clock.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn status_colors_are_terminal_indexed() {
        assert_eq!(status_color(&StatusIndicator::AtEase), Color::Indexed(10));
        assert_eq!(
            status_color(&StatusIndicator::Manifesting("Rin".into())),
            Color::Indexed(13)
        );
        assert_eq!(api_status_color(ApiStatus::Offline), Color::Indexed(9));
    }

    #[test]
    fn cursor_uses_user_color() {
        assert_eq!(
            cursor_color(&Palette::default()),
            Some(Color::Rgb(0x00, 0x61, 0xcd))
        );
    }
}
