//! App: event loop.
//!
//! - `App` owns the `SessionState`, the components and the subsystems.
//! - Background tasks (terminal input, catalog queries, player polls) report
//!   back over a `tokio::mpsc` channel as `AppMessage`s.
//! - Episode refreshes come back on their own channel and are committed by
//!   the `FetchOrchestrator` only if they are still current.
//! - The Navigator turns keys into `Action`s; `dispatch` carries them out.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use pod_proto::config::FetchConfig;
use pod_proto::{CatalogEntry, Episode};

use crate::{
    action::Action,
    catalog::CatalogClient,
    component::{Component, RenderContext},
    components::{catalog_list::CatalogList, detail::Detail, episode_list::EpisodeList, header::Header},
    feed::EpisodeSource,
    fetch::{CommitOutcome, FetchCompleted, FetchOrchestrator},
    nav::Navigator,
    player::{PlayerController, PlayerState, PlayerStatus},
    session::{Pane, SessionState},
    widgets::{
        status_bar,
        toast::{Severity, ToastManager},
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// Top charts loaded (or failed).
    Discovery(Result<Vec<CatalogEntry>, String>),
    PodcastSearch(Result<Vec<CatalogEntry>, String>),
    /// Episode search results, tagged with the generation they were issued at.
    EpisodeSearch(u64, Result<Vec<Episode>, String>),
    /// Status poll, tagged with the player launch it was issued under.
    PlayerStatus(u64, PlayerStatus),
}

const STATUS_POLL: Duration = Duration::from_secs(1);

pub struct App {
    session: SessionState,
    nav: Navigator,
    toast: ToastManager,
    catalog: CatalogClient,
    fetch: FetchOrchestrator,
    player: PlayerController,
    header: Header,
    catalog_list: CatalogList,
    episode_list: EpisodeList,
    detail: Detail,
    tx: Option<mpsc::Sender<AppMessage>>,
    results_rx: Option<mpsc::Receiver<FetchCompleted>>,
    poll_in_flight: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        session: SessionState,
        catalog: CatalogClient,
        source: Arc<dyn EpisodeSource>,
        limits: FetchConfig,
        player: PlayerController,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::channel::<FetchCompleted>(64);
        Self {
            session,
            nav: Navigator::new(),
            toast: ToastManager::new(),
            catalog,
            fetch: FetchOrchestrator::new(source, limits, results_tx),
            player,
            header: Header::new(),
            catalog_list: CatalogList::new(),
            episode_list: EpisodeList::new(),
            detail: Detail::new(),
            tx: None,
            results_rx: Some(results_rx),
            poll_in_flight: false,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.tx = Some(tx.clone());
        let Some(mut results_rx) = self.results_rx.take() else {
            anyhow::bail!("App::run called twice");
        };
        info!("pod-tui started");

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        self.load_discovery();
        self.sync_after_rebuild();

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry + spinner animation + clock.
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut status_poll = tokio::time::interval(STATUS_POLL);
        status_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }

            if self.should_quit {
                break;
            }

            needs_redraw = tokio::select! {
                Some(msg) = rx.recv() => self.handle_message(msg).await,

                Some(done) = results_rx.recv() => {
                    let outcome = self.fetch.commit(&mut self.session, done);
                    self.on_commit(outcome);
                    true
                }

                _ = status_poll.tick() => {
                    self.poll_player();
                    true
                }

                _ = toast_tick.tick() => {
                    self.toast.tick();
                    true
                }
            };
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        return false;
                    }
                    let actions = self.nav.handle_key(key, &mut self.session);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(..) => {}
                _ => return false,
            },

            AppMessage::Discovery(result) => match result {
                Ok(entries) => {
                    info!("discovery: {} chart entries", entries.len());
                    self.session.discovery = entries;
                    self.session.showing_search = false;
                    self.session.rebuild_catalog();
                    self.sync_after_rebuild();
                }
                Err(e) => {
                    warn!("discovery: {}", e);
                    self.toast.transient(format!("Chart error: {}", e), Severity::Error);
                }
            },

            AppMessage::PodcastSearch(result) => match result {
                Ok(entries) if entries.is_empty() => self.toast.info("No results found."),
                Ok(entries) => {
                    info!("search: {} podcasts", entries.len());
                    self.session.discovery = entries;
                    self.session.showing_search = true;
                    self.session.rebuild_catalog();
                    if let Some(row) = self.session.first_discovery_row() {
                        self.session.selected_catalog = row;
                    }
                    self.session.clamp_selection();
                    self.toast.clear();
                    self.sync_after_rebuild();
                }
                Err(e) => {
                    warn!("search: {}", e);
                    self.toast.transient(format!("Search error: {}", e), Severity::Error);
                }
            },

            AppMessage::EpisodeSearch(ticket, result) => {
                if !self.fetch.is_current(ticket) {
                    debug!("episode search: dropping stale result {}", ticket);
                    return false;
                }
                self.session.loading = None;
                match result {
                    Ok(episodes) if episodes.is_empty() => self.toast.info("No results found."),
                    Ok(episodes) => {
                        self.session.episodes = episodes;
                        self.session.selected_episode = 0;
                        self.toast.clear();
                    }
                    Err(e) => {
                        warn!("episode search: {}", e);
                        self.toast.transient(format!("Search error: {}", e), Severity::Error);
                    }
                }
            }

            AppMessage::PlayerStatus(launch_id, status) => {
                self.poll_in_flight = false;
                self.on_player_status(launch_id, status);
            }
        }
        true
    }

    /// Refresh or clear the episode list if the selected catalog row changed.
    fn sync_after_rebuild(&mut self) {
        match self.nav.sync_target(&self.session) {
            Some(Action::Refresh(target)) => {
                self.fetch.request_refresh(&mut self.session, target);
            }
            Some(Action::Invalidate) => self.clear_episodes(),
            _ => {}
        }
    }

    fn clear_episodes(&mut self) {
        self.fetch.invalidate(&mut self.session);
        self.session.episodes.clear();
        self.session.selected_episode = 0;
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match action {
            Action::Refresh(target) => {
                self.fetch.request_refresh(&mut self.session, target);
            }
            Action::Invalidate => self.clear_episodes(),
            Action::Play(episode) => self.play(episode).await,
            Action::Player(cmd) => {
                self.player.spawn_command(cmd);
            }
            Action::ToggleSubscription(entry) => {
                let now_subscribed = self.session.subscriptions.toggle(&entry);
                self.persist_subscriptions();
                self.session.rebuild_catalog();
                self.toast.info(if now_subscribed {
                    format!("Subscribed to {}", entry.name)
                } else {
                    format!("Unsubscribed from {}", entry.name)
                });
                self.sync_after_rebuild();
            }
            Action::SubscribeFeed(url) => {
                let entry = CatalogEntry::custom_feed(&url);
                if self.session.subscriptions.add(entry) {
                    self.persist_subscriptions();
                    self.session.rebuild_catalog();
                    if let Some(idx) = self.session.visible_catalog().iter().position(|e| e.is_show() && e.name == url) {
                        self.session.selected_catalog = idx;
                    }
                    self.toast.info("Custom feed added.");
                    self.sync_after_rebuild();
                } else {
                    self.toast.info("Already subscribed.");
                }
            }
            Action::ResetDiscovery => {
                self.toast.info("Updating discovery charts...");
                self.load_discovery();
            }
            Action::SearchPodcasts(term) => {
                self.toast
                    .transient(format!("Searching iTunes for '{}'...", term), Severity::Info);
                let client = self.catalog.clone();
                self.spawn_query(async move {
                    AppMessage::PodcastSearch(client.search_podcasts(&term).await.map_err(|e| e.to_string()))
                });
            }
            Action::SearchEpisodes(term) => {
                let ticket = self.fetch.invalidate(&mut self.session);
                self.session.episodes.clear();
                self.session.selected_episode = 0;
                self.session.loading = Some(format!("Searching episodes for '{}'...", term));
                let client = self.catalog.clone();
                self.spawn_query(async move {
                    AppMessage::EpisodeSearch(
                        ticket,
                        client.search_episodes(&term).await.map_err(|e| e.to_string()),
                    )
                });
            }
            Action::Quit => {
                self.player.shutdown(self.session.playback.position).await;
                self.should_quit = true;
            }
        }
    }

    async fn play(&mut self, episode: Episode) {
        self.toast.info(format!("Loading: {}", episode.title));
        match self.player.play(&episode).await {
            Ok(outcome) => {
                self.session.playback = Default::default();
                self.session.playing = Some(episode);
                match outcome.status_message() {
                    Some(msg) => self.toast.info(msg),
                    None => self.toast.clear(),
                }
            }
            Err(e) => {
                error!("player: {}", e);
                self.session.playing = None;
                self.toast.persistent(format!("Playback error: {}", e));
            }
        }
    }

    fn on_commit(&mut self, outcome: CommitOutcome) {
        let CommitOutcome::Applied {
            episodes,
            failed,
            error,
            persist_error,
        } = outcome
        else {
            return;
        };
        debug!("fetch: committed {} episodes", episodes);
        self.session.clamp_selection();
        if let Some(e) = persist_error {
            self.toast.persistent(format!("Could not save subscriptions: {}", e));
        } else if let Some(e) = error {
            self.toast.transient(format!("Feed error: {}", e), Severity::Error);
        } else if failed > 0 {
            self.toast.warning(format!("{} feeds could not be loaded.", failed));
        }
    }

    fn persist_subscriptions(&mut self) {
        if let Err(e) = self.session.subscriptions.save() {
            error!("subscriptions: {}", e);
            self.toast.persistent(format!("Could not save subscriptions: {}", e));
        }
    }

    // ── Background work ───────────────────────────────────────────────────────

    fn spawn_query<F>(&self, fut: F)
    where
        F: std::future::Future<Output = AppMessage> + Send + 'static,
    {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            let _ = tx.send(fut.await).await;
        });
    }

    fn load_discovery(&self) {
        let client = self.catalog.clone();
        self.spawn_query(async move {
            AppMessage::Discovery(client.top_charts().await.map_err(|e| e.to_string()))
        });
    }

    fn poll_player(&mut self) {
        if self.player.reap() {
            self.session.playing = None;
            self.session.playback = Default::default();
            return;
        }
        if self.player.state() == PlayerState::Idle || self.poll_in_flight {
            return;
        }
        let channel = self.player.channel();
        let launch_id = self.player.launch_id();
        self.poll_in_flight = true;
        self.spawn_query(async move { AppMessage::PlayerStatus(launch_id, channel.poll_status().await) });
    }

    fn on_player_status(&mut self, launch_id: u64, status: PlayerStatus) {
        if self.session.playing.is_none() || launch_id != self.player.launch_id() {
            return;
        }
        let playback = &mut self.session.playback;
        if let Some(pos) = status.position {
            playback.position = pos;
        }
        if let Some(dur) = status.duration {
            playback.duration = dur;
        }
        if status.paused.is_some() {
            playback.paused = status.paused;
        }
        if let Err(e) = self.player.on_status(launch_id, &status, Instant::now()) {
            warn!("history: {}", e);
            self.toast.warning(format!("Could not save position: {}", e));
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);
        let [catalog_area, episodes_area, detail_area] = Layout::horizontal([
            Constraint::Fill(10),
            Constraint::Fill(12),
            Constraint::Fill(20),
        ])
        .areas(body_area);

        let focus = self.nav.focus();
        let ctx = RenderContext {
            session: &self.session,
            toasts: &self.toast,
            filter_active: self.nav.filter().is_active(),
        };
        self.header.draw(frame, header_area, false, &ctx);
        self.catalog_list
            .draw(frame, catalog_area, focus == Pane::Catalog, &ctx);
        self.episode_list
            .draw(frame, episodes_area, focus == Pane::Episodes, &ctx);
        self.detail.draw(frame, detail_area, focus == Pane::Detail, &ctx);
        status_bar::draw_footer(frame, footer_area, self.nav.filter(), &self.toast);
    }
}
