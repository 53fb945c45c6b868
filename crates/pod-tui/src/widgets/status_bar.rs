//! Footer: key hints, the filter bar while it is open, or the current
//! status message.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::C_MUTED;
use crate::widgets::filter_input::FilterInput;
use crate::widgets::toast::ToastManager;

const KEY_HINTS: &str =
    "↑/↓: Nav | Ent: Play | ←/→: Pane/Seek | Space: Pause | /: Filter | c: Reset | s: Sub | Tab: Pane | q: Quit";

pub fn draw_footer(frame: &mut Frame, area: Rect, filter: &FilterInput, toasts: &ToastManager) {
    if filter.is_active() {
        filter.draw(frame, area);
        return;
    }
    if toasts.message().is_some() {
        toasts.draw(frame, area);
        return;
    }
    let hints = Paragraph::new(Line::from(Span::styled(KEY_HINTS, Style::default().fg(C_MUTED))))
        .alignment(Alignment::Center);
    frame.render_widget(hints, area);
}
