use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::engine::rules::MAX_LIVES;
use crate::session::stats::StatsSnapshot;
use crate::ui::theme::Theme;

/// One-line header: lives, score, streak and the live speed figures.
pub struct StatsBar<'a> {
    stats: StatsSnapshot,
    lives: u8,
    score: u32,
    streak: u32,
    toast: Option<u32>,
    theme: &'a Theme,
}

impl<'a> StatsBar<'a> {
    pub fn new(stats: StatsSnapshot, lives: u8, score: u32, streak: u32, theme: &'a Theme) -> Self {
        Self {
            stats,
            lives,
            score,
            streak,
            toast: None,
            theme,
        }
    }

    pub fn toast(mut self, points: Option<u32>) -> Self {
        self.toast = points;
        self
    }
}

fn hearts(lives: u8) -> String {
    let full = lives.min(MAX_LIVES) as usize;
    let empty = MAX_LIVES as usize - full;
    format!("{}{}", "\u{2665}".repeat(full), "\u{00b7}".repeat(empty))
}

impl Widget for StatsBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let base = Style::default().fg(colors.header_fg()).bg(colors.header_bg());
        let accuracy_color = if self.stats.accuracy >= 95.0 {
            colors.success()
        } else if self.stats.accuracy >= 85.0 {
            colors.warning()
        } else {
            colors.error()
        };

        let mut spans = vec![
            Span::styled(" taletype ", base.add_modifier(Modifier::BOLD)),
            Span::styled(hearts(self.lives), base.fg(colors.error())),
            Span::styled(format!("  Score {}", self.score), base),
            Span::styled(format!("  Streak {}", self.streak), base),
            Span::styled(format!("  WPM {:.0}", self.stats.wpm), base.fg(colors.accent())),
            Span::styled(format!("  Acc {:.1}%", self.stats.accuracy), base.fg(accuracy_color)),
            Span::styled(
                format!("  Typed {} / Errors {}", self.stats.chars_typed, self.stats.mistakes),
                base.fg(colors.text_pending()),
            ),
        ];
        if let Some(points) = self.toast {
            spans.push(Span::styled(
                format!("  +{points} points!"),
                base.fg(colors.success()).add_modifier(Modifier::BOLD),
            ));
        }

        Paragraph::new(Line::from(spans))
            .style(base)
            .render(area, buf);
    }
}
