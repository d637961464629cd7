use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::session::blank::PLACEHOLDER;
use crate::session::input::{self, CharStatus};
use crate::session::segment::SegmentState;
use crate::ui::theme::{Theme, ThemeColors};

pub struct TypingArea<'a> {
    segment: &'a SegmentState,
    theme: &'a Theme,
}

impl<'a> TypingArea<'a> {
    pub fn new(segment: &'a SegmentState, theme: &'a Theme) -> Self {
        Self { segment, theme }
    }

    /// Char range of the blank as currently displayed: the placeholder
    /// before the player reaches it, the word being typed afterwards.
    fn blank_range(&self) -> Option<std::ops::Range<usize>> {
        let blank = self.segment.blank.as_ref()?;
        let start = blank.start();
        let typed = self.segment.typed_len();
        if typed > start {
            Some(start..typed)
        } else {
            Some(start..start + PLACEHOLDER.chars().count())
        }
    }
}

fn status_style(status: CharStatus, in_blank: bool, colors: &ThemeColors) -> Style {
    match status {
        CharStatus::Correct if in_blank => Style::default()
            .fg(colors.blank())
            .add_modifier(Modifier::UNDERLINED),
        CharStatus::Correct => Style::default().fg(colors.text_correct()),
        CharStatus::Incorrect(_) => Style::default()
            .fg(colors.text_incorrect())
            .bg(colors.text_incorrect_bg())
            .add_modifier(Modifier::UNDERLINED),
        CharStatus::Current => Style::default()
            .fg(colors.text_cursor_fg())
            .bg(colors.text_cursor_bg()),
        CharStatus::Pending if in_blank => Style::default()
            .fg(colors.blank())
            .add_modifier(Modifier::BOLD),
        CharStatus::Pending => Style::default().fg(colors.text_pending()),
    }
}

impl Widget for TypingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let statuses = input::classify(&self.segment.target, &self.segment.typed);
        let blank = self.blank_range();

        let spans: Vec<Span> = self
            .segment
            .target
            .chars()
            .zip(statuses)
            .enumerate()
            .map(|(idx, (expected, status))| {
                let in_blank = blank.as_ref().is_some_and(|r| r.contains(&idx));
                // Show what was actually typed for a miss, except for spaces
                // that would vanish on screen.
                let display = match status {
                    CharStatus::Incorrect(actual) if actual != ' ' => actual,
                    _ => expected,
                };
                Span::styled(display.to_string(), status_style(status, in_blank, colors))
            })
            .collect();

        let title = format!(" Story {:.0}% ", self.segment.progress() * 100.0);
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));

        Paragraph::new(Line::from(spans))
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
