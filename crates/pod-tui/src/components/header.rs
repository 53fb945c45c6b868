//! Header component: app title and wall clock in a bordered strip.
//!
//! Not focusable.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::{
    component::{Component, RenderContext},
    theme::{C_ACCENT, C_PLAYING, C_PRIMARY, C_SECONDARY},
};

#[derive(Default)]
pub struct Header;

impl Header {
    pub fn new() -> Self {
        Self
    }
}

impl Component for Header {
    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, ctx: &RenderContext) {
        let clock = chrono::Local::now().format("%H:%M:%S").to_string();
        let mut spans = vec![
            Span::styled(
                "POD-TUI",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" - Podcast Explorer ", Style::default().fg(C_PRIMARY)),
            Span::styled(format!("[{}]", clock), Style::default().fg(C_SECONDARY)),
        ];
        if let Some(ep) = &ctx.session.playing {
            spans.push(Span::styled("  ▶ ", Style::default().fg(C_PLAYING)));
            spans.push(Span::styled(ep.title.clone(), Style::default().fg(C_SECONDARY)));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(C_ACCENT));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
    }
}
