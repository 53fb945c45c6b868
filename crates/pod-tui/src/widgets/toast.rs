//! Status messages: transient ones expire, persistent ones stay until
//! replaced or cleared.

use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ACCENT, C_ERROR, C_PAUSED};

/// Lifetime of a transient message.
pub const TRANSIENT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug)]
struct Toast {
    message: String,
    severity: Severity,
    /// `None` for persistent messages.
    expires: Option<Instant>,
}

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

#[derive(Debug, Default)]
pub struct ToastManager {
    current: Option<Toast>,
    spinner_frame: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, message: String, severity: Severity, expires: Option<Instant>) {
        self.current = Some(Toast {
            message,
            severity,
            expires,
        });
    }

    /// Short-lived message (progress notes, remote failures).
    pub fn transient(&mut self, message: impl Into<String>, severity: Severity) {
        self.set(message.into(), severity, Some(Instant::now() + TRANSIENT));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.transient(message, Severity::Info);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.transient(message, Severity::Warning);
    }

    /// Message that stays until something replaces it (local-resource failures).
    pub fn persistent(&mut self, message: impl Into<String>) {
        self.set(message.into(), Severity::Error, None);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Drop an expired message and advance the spinner. Call each tick.
    pub fn tick(&mut self) {
        self.expire(Instant::now());
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
    }

    fn expire(&mut self, now: Instant) {
        if self
            .current
            .as_ref()
            .and_then(|t| t.expires)
            .is_some_and(|at| at <= now)
        {
            self.current = None;
        }
    }

    pub fn message(&self) -> Option<(&str, Severity)> {
        self.current.as_ref().map(|t| (t.message.as_str(), t.severity))
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    /// Render the current message on one row of `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let Some((message, severity)) = self.message() else {
            return;
        };
        let color = match severity {
            Severity::Info => C_ACCENT,
            Severity::Warning => C_PAUSED,
            Severity::Error => C_ERROR,
        };
        let line = Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_expires_persistent_stays() {
        let mut toasts = ToastManager::new();
        toasts.info("Searching...");
        toasts.expire(Instant::now() + TRANSIENT + Duration::from_millis(1));
        assert!(toasts.message().is_none());

        toasts.persistent("Error: mpv binary not found");
        toasts.expire(Instant::now() + Duration::from_secs(3600));
        assert_eq!(
            toasts.message(),
            Some(("Error: mpv binary not found", Severity::Error))
        );

        toasts.info("Resuming from 02:05...");
        assert_eq!(toasts.message().map(|m| m.1), Some(Severity::Info));
    }
}
