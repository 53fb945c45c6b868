//! Detail component, the right pane. Shows the playing episode, the highlighted
//! episode, or information about the highlighted show.

use pod_proto::{CatalogEntry, EntryKind, Episode};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    component::{Component, RenderContext},
    session::Pane,
    theme::{style_muted, style_secondary, C_ACCENT, C_PAUSED, C_PLAYING, C_PRIMARY},
    widgets::{pane_chrome::pane_chrome, progress_bar::draw_progress},
};

const MIN_DESCRIPTION_CHARS: usize = 200;

#[derive(Default)]
pub struct Detail;

impl Detail {
    pub fn new() -> Self {
        Self
    }
}

enum Target<'a> {
    Episode { episode: &'a Episode, is_playing: bool },
    Show(&'a CatalogEntry),
    Nothing,
}

fn target<'a>(ctx: &'a RenderContext) -> Target<'a> {
    let session = ctx.session;
    if let Some(ep) = &session.playing {
        return Target::Episode {
            episode: ep,
            is_playing: true,
        };
    }
    if matches!(session.pane, Pane::Episodes | Pane::Detail) {
        if let Some(ep) = session.selected_episode() {
            return Target::Episode {
                episode: ep,
                is_playing: false,
            };
        }
    }
    match session.selected_entry() {
        Some(entry) if !entry.is_separator() => Target::Show(entry),
        _ => Target::Nothing,
    }
}

/// Cut `text` to `max` chars on a char boundary, marking the cut with `...`.
pub fn truncate_description(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

/// Char budget for a description in a pane of `width` x `height` cells.
pub fn description_budget(width: u16, height: u16) -> usize {
    (width as usize * height as usize / 10).max(MIN_DESCRIPTION_CHARS)
}

fn fit_title(title: &str, width: usize) -> String {
    if title.width() <= width {
        return title.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in title.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

impl Detail {
    fn draw_episode(
        frame: &mut Frame,
        area: Rect,
        ctx: &RenderContext,
        ep: &Episode,
        is_playing: bool,
    ) {
        let [title_area, meta_area, bar_area, status_area, _, desc_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

        frame.render_widget(
            Span::styled(
                fit_title(&ep.title, area.width as usize),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
            title_area,
        );

        let mut meta = vec![Span::styled(ep.date.clone(), style_secondary())];
        if !ep.duration.is_empty() {
            meta.push(Span::styled(format!(" [{}]", ep.duration), style_muted()));
        }
        frame.render_widget(Line::from(meta), meta_area);

        let (pos, dur) = if is_playing {
            (ctx.session.playback.position, ctx.session.playback.duration)
        } else {
            (0.0, 0.0)
        };
        draw_progress(frame, bar_area, pos, dur);

        let (label, style) = match (is_playing, ctx.session.playback.paused) {
            (true, Some(true)) => ("⏸ PAUSED", Style::default().fg(C_PAUSED)),
            (true, _) => ("▶ PLAYING", Style::default().fg(C_PLAYING)),
            (false, _) => ("○ READY", style_muted()),
        };
        frame.render_widget(
            Span::styled(label, style.add_modifier(Modifier::BOLD)),
            status_area,
        );

        let budget = description_budget(desc_area.width, desc_area.height);
        frame.render_widget(
            Paragraph::new(truncate_description(&ep.description, budget))
                .style(style_secondary())
                .wrap(Wrap { trim: true }),
            desc_area,
        );
    }

    fn draw_show(frame: &mut Frame, area: Rect, entry: &CatalogEntry) {
        let mut lines = vec![Line::from(Span::styled(
            entry.name.clone(),
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ))];
        if entry.kind == EntryKind::Show && !entry.publisher.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("by {}", entry.publisher),
                style_secondary(),
            )));
        }
        lines.push(Line::from(""));
        let budget = description_budget(area.width, area.height);
        lines.push(Line::from(Span::styled(
            truncate_description(entry.best_description(), budget),
            style_secondary(),
        )));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
    }
}

impl Component for Detail {
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, ctx: &RenderContext) {
        let block = pane_chrome("Info / Now Playing", focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match target(ctx) {
            Target::Episode {
                episode,
                is_playing,
            } => Self::draw_episode(frame, inner, ctx, episode, is_playing),
            Target::Show(entry) => Self::draw_show(frame, inner, entry),
            Target::Nothing => frame.render_widget(
                Paragraph::new("Select a podcast to see details.").style(style_muted()),
                inner,
            ),
        }
    }
}
