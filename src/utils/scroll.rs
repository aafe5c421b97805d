use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Wrapping used by the transcript viewport.
pub struct ScrollCalculator;

impl ScrollCalculator {
    /// Pre-wrap the given lines to a specific width, preserving styles and
    /// alignment and wrapping at word boundaries (long words are broken).
    /// Rendering the result without ratatui's own wrapping keeps the line
    /// count used for scrolling equal to what is drawn.
    pub fn prewrap_lines(lines: &[Line<'_>], terminal_width: u16) -> Vec<Line<'static>> {
        let width = terminal_width as usize;
        let mut out = Vec::with_capacity(lines.len());

        for line in lines {
            let cells: Vec<(char, Style)> = line
                .spans
                .iter()
                .flat_map(|span| span.content.chars().map(move |ch| (ch, span.style)))
                .collect();

            if width == 0 || cells.is_empty() {
                out.push(Self::rebuild(line, &cells));
                continue;
            }

            for row in Self::wrap_cells(&cells, width) {
                out.push(Self::rebuild(line, &row));
            }
        }

        out
    }

    fn wrap_cells(cells: &[(char, Style)], width: usize) -> Vec<Vec<(char, Style)>> {
        let mut rows = Vec::new();
        let mut current: Vec<(char, Style)> = Vec::new();
        let mut current_width = 0usize;

        let mut index = 0;
        while index < cells.len() {
            if cells[index].0 == ' ' {
                if current_width < width {
                    current.push(cells[index]);
                    current_width += 1;
                } else {
                    // A wrap swallows the space that caused it.
                    Self::push_row(&mut current, &mut rows);
                    current_width = 0;
                }
                index += 1;
                continue;
            }

            let start = index;
            while index < cells.len() && cells[index].0 != ' ' {
                index += 1;
            }
            let word = &cells[start..index];
            let word_width: usize = word.iter().map(|(ch, _)| ch.width().unwrap_or(0)).sum();

            if current_width > 0 && current_width + word_width > width {
                Self::push_row(&mut current, &mut rows);
                current_width = 0;
            }
            for &cell in word {
                let cell_width = cell.0.width().unwrap_or(0);
                if current_width > 0 && current_width + cell_width > width {
                    Self::push_row(&mut current, &mut rows);
                    current_width = 0;
                }
                current.push(cell);
                current_width += cell_width;
            }
        }

        if !current.is_empty() || rows.is_empty() {
            rows.push(current);
        }
        rows
    }

    fn push_row(current: &mut Vec<(char, Style)>, rows: &mut Vec<Vec<(char, Style)>>) {
        while current.last().is_some_and(|(ch, _)| *ch == ' ') {
            current.pop();
        }
        rows.push(std::mem::take(current));
    }

    fn rebuild(template: &Line<'_>, cells: &[(char, Style)]) -> Line<'static> {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style: Option<Style> = None;

        for &(ch, style) in cells {
            if run_style.is_some_and(|current| current != style) {
                spans.push(Span::styled(std::mem::take(&mut run), run_style.unwrap_or_default()));
            }
            run_style = Some(style);
            run.push(ch);
        }
        if let Some(style) = run_style {
            spans.push(Span::styled(run, style));
        }

        let mut line = Line::from(spans).style(template.style);
        line.alignment = template.alignment;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::layout::Alignment;
    use ratatui::style::Color;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn short_lines_pass_through() {
        let lines = vec![Line::from("hello"), Line::from("")];
        let wrapped = ScrollCalculator::prewrap_lines(&lines, 20);
        assert_eq!(wrapped.len(), 2);
        assert_eq!(text_of(&wrapped[0]), "hello");
        assert_eq!(text_of(&wrapped[1]), "");
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let lines = vec![Line::from("the quick brown fox")];
        let wrapped = ScrollCalculator::prewrap_lines(&lines, 10);
        let texts: Vec<String> = wrapped.iter().map(text_of).collect();
        assert_eq!(texts, vec!["the quick", "brown fox"]);
    }

    #[test]
    fn breaks_words_longer_than_the_width() {
        let lines = vec![Line::from("abcdefghij")];
        let wrapped = ScrollCalculator::prewrap_lines(&lines, 4);
        let texts: Vec<String> = wrapped.iter().map(text_of).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wide_characters_count_double() {
        let lines = vec![Line::from("日本語テキスト")];
        let wrapped = ScrollCalculator::prewrap_lines(&lines, 6);
        let texts: Vec<String> = wrapped.iter().map(text_of).collect();
        assert_eq!(texts, vec!["日本語", "テキス", "ト"]);
    }

    #[test]
    fn keeps_alignment_and_style() {
        let style = Style::default().fg(Color::Red);
        let lines = vec![Line::from(Span::styled("one two three", style)).alignment(Alignment::Right)];
        let wrapped = ScrollCalculator::prewrap_lines(&lines, 7);
        assert_eq!(wrapped.len(), 2);
        for line in &wrapped {
            assert_eq!(line.alignment, Some(Alignment::Right));
            assert!(line.spans.iter().all(|span| span.style == style));
        }
        assert_eq!(text_of(&wrapped[0]), "one two");
        assert_eq!(text_of(&wrapped[1]), "three");
    }

    #[test]
    fn zero_width_leaves_lines_unwrapped() {
        let lines = vec![Line::from("a b c")];
        let wrapped = ScrollCalculator::prewrap_lines(&lines, 0);
        assert_eq!(wrapped.len(), 1);
        assert_eq!(text_of(&wrapped[0]), "a b c");
    }
}
