//! EpisodeList component, the middle pane.

use pod_proto::{EntryKind, Episode};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use crate::{
    component::{Component, RenderContext},
    session::Pane,
    components::catalog_list::SEARCH_HINT,
    theme::{
        style_default, style_muted, style_secondary, style_selected, style_selected_focused,
        C_PLAYING, C_SHOW_TAG,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

#[derive(Default)]
pub struct EpisodeList {
    list_state: ListState,
}

impl EpisodeList {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `date - title`, with the show name in brackets for aggregate lists.
pub fn episode_line(ep: &Episode, playing: bool, tag_show: bool, style: Style) -> Line<'static> {
    let mut spans = vec![if playing {
        Span::styled("▶ ", Style::default().fg(C_PLAYING))
    } else {
        Span::raw("  ")
    }];
    spans.push(Span::styled(format!("{} - ", ep.date), style_secondary()));
    if tag_show {
        spans.push(Span::styled(
            format!("[{}] ", ep.podcast_name),
            Style::default().fg(C_SHOW_TAG),
        ));
    }
    spans.push(Span::styled(ep.title.clone(), style));
    Line::from(spans)
}

impl Component for EpisodeList {
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, ctx: &RenderContext) {
        let session = ctx.session;
        let badge = session.loading.as_ref().map(|_| Badge {
            text: ctx.toasts.spinner().to_string(),
            color: C_PLAYING,
        });
        let block = pane_chrome("Episodes", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let Some(loading) = &session.loading {
            frame.render_widget(
                Span::styled(format!("  {}", loading), style_muted()),
                inner,
            );
            return;
        }

        let visible = session.visible_episodes();
        if visible.is_empty() {
            let mut lines = vec![Line::from(Span::styled("  No episodes found.", style_muted()))];
            if ctx.filtering(Pane::Episodes) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(SEARCH_HINT, style_muted())));
            }
            frame.render_widget(ratatui::widgets::Paragraph::new(lines), inner);
            return;
        }

        let tag_show = session
            .selected_entry()
            .is_some_and(|e| e.kind == EntryKind::NewEpisodes);
        let playing_url = session.playing.as_ref().map(|p| p.url.as_str());
        let items: Vec<ListItem> = visible
            .iter()
            .enumerate()
            .map(|(i, ep)| {
                let style = match (i == session.selected_episode, focused) {
                    (true, true) => style_selected_focused(),
                    (true, false) => style_selected(),
                    _ => style_default(),
                };
                ListItem::new(episode_line(ep, playing_url == Some(ep.url.as_str()), tag_show, style))
            })
            .collect();

        self.list_state.select(Some(session.selected_episode));
        frame.render_stateful_widget(List::new(items), inner, &mut self.list_state);
    }
}
