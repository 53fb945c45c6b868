//! FilterInput: wraps tui-input for the footer filter / search bar.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_SECONDARY};

#[derive(Debug, PartialEq)]
pub enum FilterAction {
    Changed(String),
    /// Enter: the filter closed, carrying the final text.
    Confirmed(String),
    Cancelled,
    None,
}

pub struct FilterInput {
    input: Input,
    active: bool,
    prompt: String,
}

impl FilterInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prompt: prompt.into(),
        }
    }

    pub fn activate(&mut self) {
        self.input = Input::default();
        self.active = true;
    }

    /// Close and forget the typed text.
    pub fn close(&mut self) {
        self.input = Input::default();
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Esc cancels outright; Enter confirms. Everything else edits.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        if !self.active {
            return FilterAction::None;
        }
        match key.code {
            KeyCode::Esc => {
                self.close();
                FilterAction::Cancelled
            }
            KeyCode::Enter => {
                let text = self.input.value().to_string();
                self.close();
                FilterAction::Confirmed(text)
            }
            _ => match self.input.handle_event(&Event::Key(key)) {
                Some(change) if change.value => FilterAction::Changed(self.input.value().to_string()),
                _ => FilterAction::None,
            },
        }
    }

    /// Render the prompt, the typed text and a cursor into `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let prefix = format!("{}: ", self.prompt);
        let prefix_w = unicode_width::UnicodeWidthStr::width(prefix.as_str()) as u16;
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(prefix_w + 1) as usize);
        let value: String = self.input.value().chars().skip(scroll).collect();

        let line = Line::from(vec![
            Span::styled(prefix, Style::default().fg(C_SECONDARY)),
            Span::styled(value, Style::default().fg(C_FILTER_FG)),
        ]);
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(C_FILTER_BG)), area);

        if self.active && area.width > 0 {
            let cursor_x = area.x + prefix_w + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

impl Default for FilterInput {
    fn default() -> Self {
        Self::new("Filter / Search iTunes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_then_confirm() {
        let mut f = FilterInput::default();
        f.activate();
        assert_eq!(f.handle_key(key(KeyCode::Char('a'))), FilterAction::Changed("a".into()));
        assert_eq!(f.handle_key(key(KeyCode::Char('b'))), FilterAction::Changed("ab".into()));
        assert_eq!(f.handle_key(key(KeyCode::Backspace)), FilterAction::Changed("a".into()));
        assert_eq!(f.handle_key(key(KeyCode::Enter)), FilterAction::Confirmed("a".into()));
        assert!(!f.is_active());
        assert_eq!(f.input.value(), "");
    }

    #[test]
    fn esc_cancels_and_clears() {
        let mut f = FilterInput::default();
        f.activate();
        f.handle_key(key(KeyCode::Char('x')));
        assert_eq!(f.handle_key(key(KeyCode::Esc)), FilterAction::Cancelled);
        assert!(!f.is_active());
        assert_eq!(f.input.value(), "");
    }
}
