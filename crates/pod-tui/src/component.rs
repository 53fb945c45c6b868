//! Component trait: the interface every UI panel implements.
//!
//! - Components own only view state (scroll position).
//! - Everything they show comes from `RenderContext`, read-only.
//! - Key handling lives in the Navigator, not here.

use ratatui::{layout::Rect, Frame};

use crate::session::{Pane, SessionState};
use crate::widgets::toast::ToastManager;

/// Read-only view of everything a frame needs.
pub struct RenderContext<'a> {
    pub session: &'a SessionState,
    pub toasts: &'a ToastManager,
    pub filter_active: bool,
}

impl RenderContext<'_> {
    /// True while a non-empty filter is being typed against `list`'s rows.
    pub fn filtering(&self, list: Pane) -> bool {
        let on_catalog = self.session.pane == Pane::Catalog;
        self.filter_active
            && on_catalog == (list == Pane::Catalog)
            && self.session.filter_query.as_deref().is_some_and(|q| !q.is_empty())
    }
}

pub trait Component {
    /// Render the component into `area`.
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, ctx: &RenderContext);
}
