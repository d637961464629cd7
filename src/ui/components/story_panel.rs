use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::oracle::SceneRef;
use crate::session::segment::StorySegment;
use crate::ui::theme::Theme;

/// The story so far, as the player typed it, newest last.
pub struct StoryPanel<'a> {
    history: &'a [StorySegment],
    theme: &'a Theme,
}

impl<'a> StoryPanel<'a> {
    pub fn new(history: &'a [StorySegment], theme: &'a Theme) -> Self {
        Self { history, theme }
    }
}

impl Widget for StoryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        // Only as many trailing segments as could fit, one per line at least.
        let visible = area.height.saturating_sub(2) as usize;
        let skip = self.history.len().saturating_sub(visible);

        let lines: Vec<Line> = self.history[skip..]
            .iter()
            .map(|segment| {
                Line::from(Span::styled(
                    segment.typed_text.clone(),
                    Style::default().fg(colors.fg()),
                ))
            })
            .collect();

        let block = Block::bordered()
            .title(" So far ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

pub struct ScenePanel<'a> {
    scene: Option<&'a SceneRef>,
    pending: bool,
    theme: &'a Theme,
}

impl<'a> ScenePanel<'a> {
    pub fn new(scene: Option<&'a SceneRef>, pending: bool, theme: &'a Theme) -> Self {
        Self {
            scene,
            pending,
            theme,
        }
    }
}

impl Widget for ScenePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let mut lines = Vec::new();

        match self.scene {
            Some(scene) => {
                lines.push(Line::from(Span::styled(
                    scene.caption.clone(),
                    Style::default().fg(colors.fg()).add_modifier(Modifier::ITALIC),
                )));
                lines.push(Line::from(Span::styled(
                    scene.uri.clone(),
                    Style::default().fg(colors.text_pending()),
                )));
            }
            None => lines.push(Line::from(Span::styled(
                "No scene yet",
                Style::default().fg(colors.text_pending()),
            ))),
        }
        if self.pending {
            lines.push(Line::from(Span::styled(
                "painting the next scene...",
                Style::default().fg(colors.accent_dim()),
            )));
        }

        let block = Block::bordered()
            .title(" Scene ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
