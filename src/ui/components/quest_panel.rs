use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::engine::quests::{Quest, QuestState};
use crate::ui::theme::Theme;

pub struct QuestPanel<'a> {
    quests: &'a [Quest],
    theme: &'a Theme,
}

impl<'a> QuestPanel<'a> {
    pub fn new(quests: &'a [Quest], theme: &'a Theme) -> Self {
        Self { quests, theme }
    }
}

fn marker(state: QuestState) -> &'static str {
    match state {
        QuestState::New => "+",
        QuestState::Active => "\u{25cb}",
        QuestState::Completed => "\u{2713}",
        QuestState::Failed => "\u{2717}",
    }
}

impl Widget for QuestPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let lines: Vec<Line> = if self.quests.is_empty() {
            vec![Line::from(Span::styled(
                "No quests yet",
                Style::default().fg(colors.text_pending()),
            ))]
        } else {
            self.quests
                .iter()
                .map(|quest| {
                    let style = match quest.state {
                        QuestState::New => Style::default()
                            .fg(colors.accent())
                            .add_modifier(Modifier::ITALIC),
                        QuestState::Active => Style::default().fg(colors.fg()),
                        QuestState::Completed => Style::default().fg(colors.success()),
                        QuestState::Failed => Style::default()
                            .fg(colors.error())
                            .add_modifier(Modifier::CROSSED_OUT),
                    };
                    Line::from(vec![
                        Span::styled(format!("{} ", marker(quest.state)), style),
                        Span::styled(quest.description.clone(), style),
                        Span::styled(
                            format!(" ({})", quest.reward_points),
                            Style::default().fg(colors.text_pending()),
                        ),
                    ])
                })
                .collect()
        };

        let block = Block::bordered()
            .title(" Quests ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
