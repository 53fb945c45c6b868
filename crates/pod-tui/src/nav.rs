//! Navigator: turns key presses into selection changes and Actions.
//!
//! Owns pane focus and the filter bar. After every key it compares the
//! selected catalog row with the one last refreshed and asks for a refresh
//! (or an invalidation, for rows with nothing to fetch) when they differ.

use pod_proto::protocol::PlayerCommand;
use pod_proto::CatalogEntry;
use ratatui::crossterm::event::{KeyCode, KeyEvent};

use crate::action::Action;
use crate::fetch::RefreshTarget;
use crate::focus::FocusRing;
use crate::session::{Pane, SessionState};
use crate::widgets::filter_input::{FilterAction, FilterInput};

const SEEK_STEP_SECS: f64 = 10.0;

#[derive(Default)]
pub struct Navigator {
    focus: FocusRing,
    filter: FilterInput,
    last_target: Option<String>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> Pane {
        self.focus.current()
    }

    pub fn filter(&self) -> &FilterInput {
        &self.filter
    }

    pub fn handle_key(&mut self, key: KeyEvent, session: &mut SessionState) -> Vec<Action> {
        let mut actions = if self.filter.is_active() {
            self.filter_key(key, session)
        } else {
            self.normal_key(key, session)
        };
        session.pane = self.focus.current();
        session.clamp_selection();
        actions.extend(self.sync_target(session));
        actions
    }

    /// Refresh request for the selected catalog row, if it changed since the
    /// last call.
    pub fn sync_target(&mut self, session: &SessionState) -> Option<Action> {
        let entry = session.selected_entry();
        let key = entry.map(target_key);
        if key == self.last_target {
            return None;
        }
        self.last_target = key;
        let target = entry.and_then(|e| RefreshTarget::for_entry(e, session.subscriptions.entries()));
        Some(match target {
            Some(t) => Action::Refresh(t),
            None => Action::Invalidate,
        })
    }

    fn normal_key(&mut self, key: KeyEvent, session: &mut SessionState) -> Vec<Action> {
        let pane = self.focus.current();
        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Up | KeyCode::Char('k') => {
                move_selection(session, pane, -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                move_selection(session, pane, 1);
            }
            KeyCode::Tab => {
                self.focus.next();
            }
            KeyCode::Left if pane == Pane::Detail => {
                return vec![Action::Player(PlayerCommand::SeekRelative(-SEEK_STEP_SECS))];
            }
            KeyCode::Right if pane == Pane::Detail => {
                return vec![Action::Player(PlayerCommand::SeekRelative(SEEK_STEP_SECS))];
            }
            KeyCode::Left => {
                self.focus.step_left();
            }
            KeyCode::Right => {
                self.focus.step_right();
            }
            KeyCode::Char('h') => self.focus.set(Pane::Catalog),
            KeyCode::Char('l') => self.focus.set(Pane::Episodes),
            KeyCode::Char(' ') => return vec![Action::Player(PlayerCommand::TogglePause)],
            KeyCode::Char('s') => {
                if let Some(entry) = session.selected_entry().filter(|e| e.is_show()) {
                    return vec![Action::ToggleSubscription(entry.clone())];
                }
            }
            KeyCode::Char('c') => return vec![Action::ResetDiscovery],
            KeyCode::Char('/') => {
                self.filter.activate();
                session.filter_query = Some(String::new());
            }
            KeyCode::Enter => match pane {
                Pane::Catalog => {
                    if session.selected_entry().is_some_and(|e| !e.is_separator()) {
                        self.focus.set(Pane::Episodes);
                        session.selected_episode = 0;
                    }
                }
                Pane::Episodes => {
                    if let Some(ep) = session.selected_episode() {
                        return vec![Action::Play(ep.clone())];
                    }
                }
                Pane::Detail => {}
            },
            _ => {}
        }
        Vec::new()
    }

    fn filter_key(&mut self, key: KeyEvent, session: &mut SessionState) -> Vec<Action> {
        let pane = self.focus.current();
        match key.code {
            KeyCode::Tab => {
                self.filter.close();
                session.filter_query = None;
                self.focus.next();
                return Vec::new();
            }
            KeyCode::Up => {
                move_selection(session, pane, -1);
                return Vec::new();
            }
            KeyCode::Down => {
                move_selection(session, pane, 1);
                return Vec::new();
            }
            _ => {}
        }

        match self.filter.handle_key(key) {
            FilterAction::Changed(text) => {
                session.filter_query = Some(text);
                Vec::new()
            }
            FilterAction::Cancelled => {
                session.filter_query = None;
                Vec::new()
            }
            FilterAction::Confirmed(text) => {
                session.filter_query = None;
                vec![confirm_action(text, pane)]
            }
            FilterAction::None => Vec::new(),
        }
    }
}

/// What a confirmed filter turns into.
fn confirm_action(text: String, pane: Pane) -> Action {
    let query = text.trim();
    if query.is_empty() {
        Action::ResetDiscovery
    } else if query.starts_with("http") {
        Action::SubscribeFeed(query.to_string())
    } else if pane == Pane::Catalog {
        Action::SearchPodcasts(query.to_string())
    } else {
        Action::SearchEpisodes(query.to_string())
    }
}

fn target_key(entry: &CatalogEntry) -> String {
    format!("{:?}/{}", entry.kind, entry.name)
}

/// Move the active pane's selection by one row. Catalog moves skip a
/// separator with one extra step; a move that would still land on a
/// separator is rejected. Returns whether the selection changed.
pub fn move_selection(session: &mut SessionState, pane: Pane, dir: isize) -> bool {
    match pane {
        Pane::Catalog => {
            let visible = session.visible_catalog();
            let next = step_over_separators(visible.len(), session.selected_catalog, dir, |i| {
                visible[i].is_separator()
            });
            match next {
                Some(idx) => {
                    session.selected_catalog = idx;
                    true
                }
                None => false,
            }
        }
        Pane::Episodes | Pane::Detail => {
            let len = session.visible_episodes().len();
            match step_over_separators(len, session.selected_episode, dir, |_| false) {
                Some(idx) => {
                    session.selected_episode = idx;
                    true
                }
                None => false,
            }
        }
    }
}

fn step_over_separators(
    len: usize,
    current: usize,
    dir: isize,
    is_separator: impl Fn(usize) -> bool,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let clamp = |i: isize| i.clamp(0, len as isize - 1) as usize;
    let mut next = clamp(current as isize + dir);
    if is_separator(next) {
        next = clamp(next as isize + dir);
    }
    (next != current && !is_separator(next)).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session_with;
    use pod_proto::Episode;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(nav: &mut Navigator, session: &mut SessionState, text: &str) -> Vec<Action> {
        text.chars()
            .flat_map(|c| nav.handle_key(key(KeyCode::Char(c)), session))
            .collect()
    }

    /// NEW EPISODES, SUBSCRIPTIONS, Sub, DISCOVERY, Alpha, Beta
    fn populated() -> SessionState {
        session_with(
            vec![CatalogEntry::show("Sub", "")],
            vec![
                CatalogEntry::show("Alpha", "").with_description("science"),
                CatalogEntry::show("Beta", "").with_description("history"),
            ],
        )
    }

    #[test]
    fn moves_skip_separators() {
        let mut session = populated();
        session.selected_catalog = 2;
        assert!(move_selection(&mut session, Pane::Catalog, 1));
        assert_eq!(session.selected_entry().unwrap().name, "Alpha");
        assert!(move_selection(&mut session, Pane::Catalog, -1));
        assert_eq!(session.selected_entry().unwrap().name, "Sub");
        // Sub -> header -> NEW EPISODES
        assert!(move_selection(&mut session, Pane::Catalog, -1));
        assert_eq!(session.selected_catalog, 0);
    }

    #[test]
    fn move_onto_leading_separator_is_rejected() {
        let mut session = session_with(Vec::new(), vec![CatalogEntry::show("Only", "")]);
        assert_eq!(session.selected_catalog, 1);
        assert!(!move_selection(&mut session, Pane::Catalog, -1));
        assert_eq!(session.selected_catalog, 1);
        assert!(!move_selection(&mut session, Pane::Catalog, 1));
    }

    #[test]
    fn first_sync_requests_refresh_then_stays_quiet() {
        let mut session = populated();
        let mut nav = Navigator::new();
        match nav.sync_target(&session) {
            Some(Action::Refresh(RefreshTarget::NewEpisodes(subs))) => assert_eq!(subs.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(nav.sync_target(&session).is_none());

        let actions = nav.handle_key(key(KeyCode::Char('j')), &mut session);
        // NEW EPISODES -> header is skipped -> Sub
        assert!(matches!(
            actions.as_slice(),
            [Action::Refresh(RefreshTarget::Show(e))] if e.name == "Sub"
        ));
    }

    #[test]
    fn enter_on_catalog_focuses_episodes() {
        let mut session = populated();
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        session.selected_episode = 3;
        let actions = nav.handle_key(key(KeyCode::Enter), &mut session);
        assert!(actions.is_empty());
        assert_eq!(nav.focus(), Pane::Episodes);
        assert_eq!(session.pane, Pane::Episodes);
        assert_eq!(session.selected_episode, 0);
    }

    #[test]
    fn enter_on_episodes_plays_selected() {
        let mut session = populated();
        session.episodes = vec![
            Episode::new("One", "https://cdn/1.mp3", "Sub").unwrap(),
            Episode::new("Two", "https://cdn/2.mp3", "Sub").unwrap(),
        ];
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        nav.handle_key(key(KeyCode::Char('l')), &mut session);
        nav.handle_key(key(KeyCode::Down), &mut session);
        let actions = nav.handle_key(key(KeyCode::Enter), &mut session);
        assert!(matches!(actions.as_slice(), [Action::Play(ep)] if ep.title == "Two"));
    }

    #[test]
    fn arrows_seek_only_in_detail() {
        let mut session = populated();
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        nav.handle_key(key(KeyCode::Right), &mut session);
        nav.handle_key(key(KeyCode::Right), &mut session);
        assert_eq!(nav.focus(), Pane::Detail);
        let actions = nav.handle_key(key(KeyCode::Left), &mut session);
        assert!(matches!(
            actions.as_slice(),
            [Action::Player(PlayerCommand::SeekRelative(s))] if *s == -10.0
        ));
        assert_eq!(nav.focus(), Pane::Detail);
    }

    #[test]
    fn live_filter_narrows_and_escape_restores() {
        let mut session = populated();
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        nav.handle_key(key(KeyCode::Char('/')), &mut session);
        type_text(&mut nav, &mut session, "HIST");
        let names: Vec<_> = session.visible_catalog().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["--- SUBSCRIPTIONS ---", "--- DISCOVERY ---", "Beta"]);

        nav.handle_key(key(KeyCode::Esc), &mut session);
        assert!(!nav.filter().is_active());
        assert_eq!(session.visible_catalog().len(), session.catalog.len());
    }

    #[test]
    fn episode_filter_leaves_catalog_selection_alone() {
        let mut session = populated();
        session.selected_catalog = 2;
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        nav.handle_key(key(KeyCode::Char('l')), &mut session);
        session.episodes = vec![
            Episode::new("An interview", "https://cdn/1.mp3", "Sub").unwrap(),
            Episode::new("Solo", "https://cdn/2.mp3", "Sub").unwrap(),
        ];

        let mut actions = nav.handle_key(key(KeyCode::Char('/')), &mut session);
        actions.extend(type_text(&mut nav, &mut session, "interview"));

        assert!(actions.is_empty(), "unexpected {actions:?}");
        assert_eq!(session.selected_entry().unwrap().name, "Sub");
        assert_eq!(session.episodes.len(), 2);
        let titles: Vec<_> = session.visible_episodes().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["An interview"]);
    }

    #[test]
    fn confirmed_filter_routes_by_content_and_pane() {
        assert!(matches!(confirm_action("".into(), Pane::Catalog), Action::ResetDiscovery));
        assert!(matches!(
            confirm_action("https://example.com/feed.xml".into(), Pane::Catalog),
            Action::SubscribeFeed(u) if u == "https://example.com/feed.xml"
        ));
        assert!(matches!(
            confirm_action("rust".into(), Pane::Catalog),
            Action::SearchPodcasts(q) if q == "rust"
        ));
        assert!(matches!(
            confirm_action("rust".into(), Pane::Episodes),
            Action::SearchEpisodes(q) if q == "rust"
        ));
    }

    #[test]
    fn tab_closes_filter() {
        let mut session = populated();
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        nav.handle_key(key(KeyCode::Char('/')), &mut session);
        type_text(&mut nav, &mut session, "zzz");
        nav.handle_key(key(KeyCode::Tab), &mut session);
        assert!(!nav.filter().is_active());
        assert!(session.filter_query.is_none());
        assert_eq!(nav.focus(), Pane::Episodes);
    }

    #[test]
    fn subscribe_ignores_aggregate_row() {
        let mut session = populated();
        let mut nav = Navigator::new();
        nav.sync_target(&session);
        assert!(nav.handle_key(key(KeyCode::Char('s')), &mut session).is_empty());
    }
}
