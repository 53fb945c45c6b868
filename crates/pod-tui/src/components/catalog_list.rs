//! CatalogList component, the left pane: aggregate row, subscriptions,
//! discovery or search results.

use pod_proto::{CatalogEntry, EntryKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use crate::{
    component::{Component, RenderContext},
    session::Pane,
    theme::{
        style_default, style_muted, style_selected, style_selected_focused, C_ACCENT, C_FILTER_FG,
        C_SEPARATOR, C_STARS,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

pub const SEARCH_HINT: &str = "[Enter] to search iTunes";

#[derive(Default)]
pub struct CatalogList {
    list_state: ListState,
}

impl CatalogList {
    pub fn new() -> Self {
        Self::default()
    }

    fn render_item(entry: &CatalogEntry, subscribed: bool, style: Style) -> ListItem<'static> {
        match entry.kind {
            EntryKind::Separator => ListItem::new(Line::from(Span::styled(
                entry.name.clone(),
                Style::default().fg(C_SEPARATOR),
            ))),
            EntryKind::NewEpisodes => ListItem::new(Line::from(Span::styled(
                entry.name.clone(),
                style.fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ))),
            EntryKind::Show => {
                let marker = if subscribed {
                    Span::styled("★ ", Style::default().fg(C_STARS))
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![marker, Span::styled(entry.name.clone(), style)]))
            }
        }
    }
}

impl Component for CatalogList {
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, ctx: &RenderContext) {
        let session = ctx.session;
        let badge = ctx.filtering(Pane::Catalog).then(|| Badge {
            text: "FILTER".to_string(),
            color: C_FILTER_FG,
        });
        let block = pane_chrome("Podcasts", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let visible = session.visible_catalog();
        let mut items: Vec<ListItem> = visible
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = match (i == session.selected_catalog, focused) {
                    (true, true) => style_selected_focused(),
                    (true, false) => style_selected(),
                    _ => style_default(),
                };
                Self::render_item(entry, session.is_subscribed(&entry.name), style)
            })
            .collect();

        let has_rows = visible.iter().any(|e| !e.is_separator());
        if ctx.filtering(Pane::Catalog) && !visible.iter().any(|e| e.is_show()) {
            items.push(ListItem::new(""));
            items.push(ListItem::new(Span::styled(SEARCH_HINT, style_muted())));
        } else if !has_rows {
            items.push(ListItem::new(Span::styled("  Loading charts...", style_muted())));
        }

        self.list_state.select(has_rows.then_some(session.selected_catalog));
        frame.render_stateful_widget(List::new(items), inner, &mut self.list_state);
    }
}
