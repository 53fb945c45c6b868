//! SessionState: everything the event loop mutates and the renderer reads.
//!
//! Owned by the `App` for the lifetime of the process. Background work never
//! touches it directly; results arrive as messages and are applied by the
//! single owner.

use pod_proto::{CatalogEntry, EntryKind, Episode, SubscriptionStore};

const SUBSCRIPTIONS_HEADER: &str = "--- SUBSCRIPTIONS ---";
const DISCOVERY_HEADER: &str = "--- DISCOVERY ---";
const SEARCH_HEADER: &str = "--- SEARCH RESULTS ---";

/// The three panes, in Tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pane {
    #[default]
    Catalog,
    Episodes,
    Detail,
}

/// Last values reported by the player. Kept between polls so a failed query
/// falls back to the previous reading.
#[derive(Debug, Clone, Default)]
pub struct PlaybackInfo {
    pub position: f64,
    pub duration: f64,
    pub paused: Option<bool>,
}

pub struct SessionState {
    pub subscriptions: SubscriptionStore,
    /// Top charts, or the last podcast search.
    pub discovery: Vec<CatalogEntry>,
    pub showing_search: bool,
    /// Rows of the catalog pane, rebuilt from subscriptions + discovery.
    pub catalog: Vec<CatalogEntry>,
    pub episodes: Vec<Episode>,
    /// Index into the *visible* catalog rows.
    pub selected_catalog: usize,
    /// Index into the *visible* episodes.
    pub selected_episode: usize,
    pub pane: Pane,
    /// Live filter text while the filter bar is open.
    pub filter_query: Option<String>,
    /// Set while a refresh is in flight.
    pub loading: Option<String>,
    pub playing: Option<Episode>,
    pub playback: PlaybackInfo,
}

impl SessionState {
    pub fn new(subscriptions: SubscriptionStore) -> Self {
        let mut session = Self {
            subscriptions,
            discovery: Vec::new(),
            showing_search: false,
            catalog: Vec::new(),
            episodes: Vec::new(),
            selected_catalog: 0,
            selected_episode: 0,
            pane: Pane::Catalog,
            filter_query: None,
            loading: None,
            playing: None,
            playback: PlaybackInfo::default(),
        };
        session.rebuild_catalog();
        session
    }

    /// Rebuild the catalog rows: aggregate row and subscriptions (newest
    /// first) when there are any, then the discovery / search section.
    pub fn rebuild_catalog(&mut self) {
        let mut rows = Vec::new();
        if !self.subscriptions.is_empty() {
            rows.push(CatalogEntry::new_episodes());
            rows.push(CatalogEntry::separator(SUBSCRIPTIONS_HEADER));
            rows.extend(self.subscriptions.sorted_by_latest());
        }
        let label = if self.showing_search {
            SEARCH_HEADER
        } else {
            DISCOVERY_HEADER
        };
        rows.push(CatalogEntry::separator(label));
        rows.extend(self.discovery.iter().cloned());
        self.catalog = rows;
        self.clamp_selection();
    }

    /// Row index of the first discovery / search result, if any.
    pub fn first_discovery_row(&self) -> Option<usize> {
        let header = self
            .catalog
            .iter()
            .position(|e| e.is_separator() && (e.name == DISCOVERY_HEADER || e.name == SEARCH_HEADER))?;
        (header + 1 < self.catalog.len()).then_some(header + 1)
    }

    /// The live filter text, if it applies to `pane`'s list. The catalog is
    /// filtered only from the catalog pane; episodes from the other two.
    fn active_query(&self, pane: Pane) -> Option<&str> {
        let scoped = (self.pane == Pane::Catalog) == (pane == Pane::Catalog);
        self.filter_query
            .as_deref()
            .filter(|q| scoped && !q.is_empty())
    }

    pub fn visible_catalog(&self) -> Vec<&CatalogEntry> {
        match self.active_query(Pane::Catalog) {
            Some(q) => filter_catalog(&self.catalog, q),
            None => self.catalog.iter().collect(),
        }
    }

    pub fn visible_episodes(&self) -> Vec<&Episode> {
        match self.active_query(Pane::Episodes) {
            Some(q) => filter_episodes(&self.episodes, q),
            None => self.episodes.iter().collect(),
        }
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.visible_catalog().get(self.selected_catalog).copied()
    }

    pub fn selected_episode(&self) -> Option<&Episode> {
        self.visible_episodes().get(self.selected_episode).copied()
    }

    /// Keep both selections inside their visible lists and off separators.
    pub fn clamp_selection(&mut self) {
        let visible = self.visible_catalog();
        let mut idx = self.selected_catalog.min(visible.len().saturating_sub(1));
        if visible.get(idx).is_some_and(|e| e.is_separator()) {
            let forward = (idx..visible.len()).find(|&i| !visible[i].is_separator());
            let backward = || (0..idx).rev().find(|&i| !visible[i].is_separator());
            idx = forward.or_else(backward).unwrap_or(idx);
        }
        self.selected_catalog = idx;

        let ep_len = self.visible_episodes().len();
        self.selected_episode = self.selected_episode.min(ep_len.saturating_sub(1));
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.subscriptions.contains(name)
    }

    /// Copy a freshly resolved feed locator / long description back onto every
    /// row and subscription describing the same show.
    pub fn apply_resolved(&mut self, resolved: &CatalogEntry) {
        if resolved.kind != EntryKind::Show {
            return;
        }
        let merge = |target: &mut CatalogEntry| {
            if target.feed_url.is_none() {
                target.feed_url = resolved.feed_url.clone();
            }
            if target.long_description.is_none() {
                target.long_description = resolved.long_description.clone();
            }
        };
        self.catalog
            .iter_mut()
            .chain(self.discovery.iter_mut())
            .filter(|e| e.is_show() && e.name == resolved.name)
            .for_each(merge);
        if let Some(sub) = self.subscriptions.get_mut(&resolved.name) {
            merge(sub);
        }
    }

    /// Record the newest episode date for a show on its catalog rows.
    pub fn set_latest_date(&mut self, name: &str, date: &str) {
        self.catalog
            .iter_mut()
            .chain(self.discovery.iter_mut())
            .filter(|e| e.is_show() && e.name == name)
            .for_each(|e| e.latest_date = Some(date.to_string()));
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Entries whose name or description contains `query` (case-insensitive),
/// plus every separator.
pub fn filter_catalog<'a>(entries: &'a [CatalogEntry], query: &str) -> Vec<&'a CatalogEntry> {
    let q = query.to_lowercase();
    entries
        .iter()
        .filter(|e| e.is_separator() || contains_ci(&e.name, &q) || contains_ci(&e.description, &q))
        .collect()
}

/// Episodes whose title or description contains `query` (case-insensitive).
pub fn filter_episodes<'a>(episodes: &'a [Episode], query: &str) -> Vec<&'a Episode> {
    let q = query.to_lowercase();
    episodes
        .iter()
        .filter(|e| contains_ci(&e.title, &q) || contains_ci(&e.description, &q))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn session_with(subs: Vec<CatalogEntry>, discovery: Vec<CatalogEntry>) -> SessionState {
        let store = SubscriptionStore::in_memory(PathBuf::from("/nonexistent/subs.json"), subs);
        let mut session = SessionState::new(store);
        session.discovery = discovery;
        session.rebuild_catalog();
        session
    }

    #[test]
    fn catalog_layout_with_subscriptions() {
        let session = session_with(
            vec![CatalogEntry::show("Sub", "P")],
            vec![CatalogEntry::show("Chart", "Q")],
        );
        let names: Vec<_> = session.catalog.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["--- NEW EPISODES ---", SUBSCRIPTIONS_HEADER, "Sub", DISCOVERY_HEADER, "Chart"]
        );
        assert_eq!(session.first_discovery_row(), Some(4));
    }

    #[test]
    fn empty_subscriptions_skip_to_first_show() {
        let session = session_with(Vec::new(), vec![CatalogEntry::show("Chart", "Q")]);
        assert_eq!(session.catalog[0].name, DISCOVERY_HEADER);
        assert_eq!(session.selected_catalog, 1);
        assert_eq!(session.selected_entry().unwrap().name, "Chart");
    }

    #[test]
    fn filter_keeps_separators_and_matches_case_insensitively() {
        let entries = vec![
            CatalogEntry::separator("--- A ---"),
            CatalogEntry::show("Rust Weekly", "x"),
            CatalogEntry::show("Cooking", "y").with_description("About RUST removal"),
            CatalogEntry::show("Gardening", "z"),
            CatalogEntry::separator("--- B ---"),
        ];
        let names: Vec<_> = filter_catalog(&entries, "rUsT")
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["--- A ---", "Rust Weekly", "Cooking", "--- B ---"]);
    }

    #[test]
    fn filter_does_not_mutate_underlying_lists() {
        let mut session = session_with(
            Vec::new(),
            vec![CatalogEntry::show("Alpha", ""), CatalogEntry::show("Beta", "")],
        );
        session.filter_query = Some("beta".into());
        assert_eq!(session.visible_catalog().len(), 2);
        assert_eq!(session.catalog.len(), 3);
        session.filter_query = None;
        assert_eq!(session.visible_catalog().len(), 3);
    }

    #[test]
    fn filter_applies_to_focused_list_only() {
        let mut session = session_with(
            vec![CatalogEntry::show("Sub", "")],
            vec![CatalogEntry::show("Alpha", "")],
        );
        session.episodes = vec![
            Episode::new("Interview", "a.mp3", "Sub").unwrap(),
            Episode::new("Other", "b.mp3", "Sub").unwrap(),
        ];
        session.filter_query = Some("interview".into());

        session.pane = Pane::Catalog;
        assert_eq!(session.visible_episodes().len(), 2);
        assert!(session.visible_catalog().iter().all(|e| e.is_separator()));

        for pane in [Pane::Episodes, Pane::Detail] {
            session.pane = pane;
            assert_eq!(session.visible_catalog().len(), session.catalog.len());
            assert_eq!(session.visible_episodes().len(), 1);
        }
    }

    #[test]
    fn episode_filter_uses_title_and_description() {
        let eps = vec![
            Episode::new("Interview", "a.mp3", "S").unwrap(),
            Episode::new("Other", "b.mp3", "S")
                .unwrap()
                .with_description("an INTERVIEW special"),
            Episode::new("Third", "c.mp3", "S").unwrap(),
        ];
        assert_eq!(filter_episodes(&eps, "interview").len(), 2);
    }

    #[test]
    fn apply_resolved_fills_missing_feed() {
        let mut session = session_with(
            vec![CatalogEntry::show("Show", "P")],
            vec![CatalogEntry::show("Show", "P")],
        );
        let resolved = CatalogEntry::show("Show", "P").with_feed_url("https://f/rss");
        session.apply_resolved(&resolved);
        assert!(session
            .catalog
            .iter()
            .filter(|e| e.name == "Show")
            .all(|e| e.feed_url.as_deref() == Some("https://f/rss")));
        assert_eq!(
            session.subscriptions.entries()[0].feed_url.as_deref(),
            Some("https://f/rss")
        );
    }
}
