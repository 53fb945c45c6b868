//! Fetch orchestrator: background episode refreshes with generation tickets.
//!
//! Every refresh bumps a global generation counter and carries the new value
//! as its ticket. Work is never cancelled; results come back over an mpsc
//! channel and only the one whose ticket still matches the counter is
//! committed to the session. Everything else is dropped without side effects.

use std::sync::Arc;

use futures_util::future::join_all;
use pod_proto::config::FetchConfig;
use pod_proto::model::sort_newest_first;
use pod_proto::{CatalogEntry, EntryKind, Episode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::feed::{EpisodeSource, FeedError};
use crate::session::SessionState;

pub type Ticket = u64;

/// What a refresh should populate the episode list with.
#[derive(Debug, Clone)]
pub enum RefreshTarget {
    Show(CatalogEntry),
    NewEpisodes(Vec<CatalogEntry>),
}

impl RefreshTarget {
    /// Refresh target for a catalog row. Separators have nothing to fetch.
    pub fn for_entry(entry: &CatalogEntry, subscriptions: &[CatalogEntry]) -> Option<Self> {
        match entry.kind {
            EntryKind::Show => Some(Self::Show(entry.clone())),
            EntryKind::NewEpisodes => Some(Self::NewEpisodes(subscriptions.to_vec())),
            EntryKind::Separator => None,
        }
    }

    fn loading_label(&self) -> &'static str {
        match self {
            Self::Show(_) => "Fetching episodes...",
            Self::NewEpisodes(_) => "Refreshing all subscriptions...",
        }
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Show {
        /// The entry as the resolver left it (feed locator memoized).
        entry: CatalogEntry,
        result: Result<Vec<Episode>, FeedError>,
    },
    NewEpisodes {
        resolved: Vec<CatalogEntry>,
        episodes: Vec<Episode>,
        failed: usize,
    },
}

#[derive(Debug)]
pub struct FetchCompleted {
    pub ticket: Ticket,
    pub outcome: FetchOutcome,
}

#[derive(Debug, PartialEq)]
pub enum CommitOutcome {
    /// A newer refresh was issued after this one; nothing changed.
    Stale,
    Applied {
        episodes: usize,
        /// Aggregate sub-fetches that failed.
        failed: usize,
        /// Single-show fetch error, for a transient status.
        error: Option<String>,
        /// Subscription store write error, for a persistent status.
        persist_error: Option<String>,
    },
}

pub struct FetchOrchestrator {
    generation: Ticket,
    source: Arc<dyn EpisodeSource>,
    limits: FetchConfig,
    results_tx: mpsc::Sender<FetchCompleted>,
}

impl FetchOrchestrator {
    pub fn new(
        source: Arc<dyn EpisodeSource>,
        limits: FetchConfig,
        results_tx: mpsc::Sender<FetchCompleted>,
    ) -> Self {
        Self {
            generation: 0,
            source,
            limits,
            results_tx,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket == self.generation
    }

    /// Start a refresh. The episode list is cleared immediately and a loading
    /// status set; the result arrives later on the results channel.
    pub fn request_refresh(&mut self, session: &mut SessionState, target: RefreshTarget) -> Ticket {
        self.generation += 1;
        let ticket = self.generation;
        session.episodes.clear();
        session.selected_episode = 0;
        session.loading = Some(target.loading_label().to_string());

        let source = Arc::clone(&self.source);
        let tx = self.results_tx.clone();
        let show_limit = self.limits.show_limit;
        let aggregate_limit = self.limits.aggregate_limit;
        debug!("fetch: ticket {} for {:?}", ticket, target_name(&target));

        tokio::spawn(async move {
            let outcome = match target {
                RefreshTarget::Show(mut entry) => {
                    let result = source.fetch_episodes(&mut entry, show_limit).await;
                    FetchOutcome::Show { entry, result }
                }
                RefreshTarget::NewEpisodes(subs) => {
                    fetch_all(source, subs, aggregate_limit).await
                }
            };
            if tx.send(FetchCompleted { ticket, outcome }).await.is_err() {
                debug!("fetch: receiver gone, dropping ticket {}", ticket);
            }
        });
        ticket
    }

    /// Supersede any in-flight refresh without starting a new one.
    pub fn invalidate(&mut self, session: &mut SessionState) -> Ticket {
        self.generation += 1;
        session.loading = None;
        self.generation
    }

    /// Apply a finished refresh if its ticket is still current.
    pub fn commit(&self, session: &mut SessionState, done: FetchCompleted) -> CommitOutcome {
        if !self.is_current(done.ticket) {
            debug!(
                "fetch: discarding stale ticket {} (current {})",
                done.ticket, self.generation
            );
            return CommitOutcome::Stale;
        }
        session.loading = None;

        match done.outcome {
            FetchOutcome::Show { entry, result } => {
                session.apply_resolved(&entry);
                let (episodes, error) = match result {
                    Ok(eps) => (eps, None),
                    Err(e) => {
                        warn!("fetch: '{}' failed: {}", entry.name, e);
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                let persist_error = record_latest(session, &entry.name, &episodes);
                let count = episodes.len();
                session.episodes = episodes;
                session.selected_episode = 0;
                CommitOutcome::Applied {
                    episodes: count,
                    failed: 0,
                    error,
                    persist_error,
                }
            }
            FetchOutcome::NewEpisodes {
                resolved,
                episodes,
                failed,
            } => {
                for entry in &resolved {
                    session.apply_resolved(entry);
                }
                info!(
                    "fetch: new episodes ready ({} episodes, {} feeds failed)",
                    episodes.len(),
                    failed
                );
                let count = episodes.len();
                session.episodes = episodes;
                session.selected_episode = 0;
                CommitOutcome::Applied {
                    episodes: count,
                    failed,
                    error: None,
                    persist_error: None,
                }
            }
        }
    }
}

fn target_name(target: &RefreshTarget) -> String {
    match target {
        RefreshTarget::Show(e) => e.name.clone(),
        RefreshTarget::NewEpisodes(subs) => format!("{} subscriptions", subs.len()),
    }
}

/// Update the show's newest-episode date; persist if it is a subscription.
fn record_latest(session: &mut SessionState, name: &str, episodes: &[Episode]) -> Option<String> {
    let newest = episodes.first().map(|e| e.date.as_str()).filter(|d| !d.is_empty())?;
    let changed = session
        .catalog
        .iter()
        .chain(session.discovery.iter())
        .chain(session.subscriptions.entries().iter())
        .filter(|e| e.is_show() && e.name == name)
        .any(|e| e.latest_date.as_deref() != Some(newest));
    if !changed {
        return None;
    }
    let newest = newest.to_string();
    session.set_latest_date(name, &newest);
    if !session.subscriptions.set_latest_date(name, &newest) {
        return None;
    }
    match session.subscriptions.save() {
        Ok(()) => None,
        Err(e) => {
            warn!("fetch: saving subscriptions failed: {}", e);
            Some(e.to_string())
        }
    }
}

/// One sub-task per subscription; failures are counted and contribute nothing.
async fn fetch_all(
    source: Arc<dyn EpisodeSource>,
    subs: Vec<CatalogEntry>,
    limit: usize,
) -> FetchOutcome {
    let handles = subs.into_iter().map(|mut entry| {
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            let result = source.fetch_episodes(&mut entry, limit).await;
            (entry, result)
        })
    });

    let mut resolved = Vec::new();
    let mut episodes = Vec::new();
    let mut failed = 0usize;
    for joined in join_all(handles).await {
        match joined {
            Ok((entry, Ok(eps))) => {
                episodes.extend(eps);
                resolved.push(entry);
            }
            Ok((entry, Err(e))) => {
                warn!("fetch: '{}' failed during aggregate refresh: {}", entry.name, e);
                failed += 1;
                resolved.push(entry);
            }
            Err(e) => {
                warn!("fetch: aggregate sub-task panicked: {}", e);
                failed += 1;
            }
        }
    }
    sort_newest_first(&mut episodes);
    FetchOutcome::NewEpisodes {
        resolved,
        episodes,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session_with;
    use futures_util::future::BoxFuture;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Canned episodes per show name; "broken" always fails.
    struct FakeSource {
        shows: HashMap<String, Vec<Episode>>,
        delay: Duration,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                shows: HashMap::new(),
                delay: Duration::ZERO,
            }
        }

        fn with_show(mut self, name: &str, dates: &[&str]) -> Self {
            let eps = dates
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    Episode::new(format!("{name} #{i}"), format!("https://cdn/{name}/{i}.mp3"), name)
                        .unwrap()
                        .with_date(*d)
                })
                .collect();
            self.shows.insert(name.to_string(), eps);
            self
        }
    }

    impl EpisodeSource for FakeSource {
        fn fetch_episodes<'a>(
            &'a self,
            entry: &'a mut CatalogEntry,
            limit: usize,
        ) -> BoxFuture<'a, Result<Vec<Episode>, FeedError>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                if entry.name == "broken" {
                    return Err(FeedError::Status(500));
                }
                entry.feed_url = Some(format!("https://feeds/{}", entry.name));
                let mut eps = self.shows.get(&entry.name).cloned().unwrap_or_default();
                eps.truncate(limit);
                Ok(eps)
            })
        }
    }

    fn orchestrator(source: FakeSource) -> (FetchOrchestrator, mpsc::Receiver<FetchCompleted>) {
        let (tx, rx) = mpsc::channel(16);
        (
            FetchOrchestrator::new(Arc::new(source), FetchConfig::default(), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn only_latest_refresh_commits() {
        let source = FakeSource::new()
            .with_show("A", &["2024-01-01 00:00"])
            .with_show("B", &["2024-02-01 00:00", "2024-01-15 00:00"]);
        let (mut orch, mut rx) = orchestrator(source);
        let mut session = session_with(Vec::new(), Vec::new());

        let first = orch.request_refresh(&mut session, RefreshTarget::Show(CatalogEntry::show("A", "")));
        let second = orch.request_refresh(&mut session, RefreshTarget::Show(CatalogEntry::show("B", "")));
        assert!(second > first);

        let mut results = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        // Commit the older ticket last to make sure arrival order is irrelevant.
        results.sort_by_key(|r| std::cmp::Reverse(r.ticket));

        let newer = results.remove(0);
        assert!(matches!(orch.commit(&mut session, newer), CommitOutcome::Applied { episodes: 2, .. }));
        let older = results.remove(0);
        assert_eq!(orch.commit(&mut session, older), CommitOutcome::Stale);

        assert_eq!(session.episodes.len(), 2);
        assert!(session.episodes.iter().all(|e| e.podcast_name == "B"));
        assert!(session.loading.is_none());
    }

    #[tokio::test]
    async fn stale_result_has_no_side_effects() {
        let source = FakeSource::new().with_show("A", &["2024-05-05 10:00"]);
        let (mut orch, mut rx) = orchestrator(source);
        let mut session = session_with(Vec::new(), vec![CatalogEntry::show("A", "")]);

        orch.request_refresh(&mut session, RefreshTarget::Show(CatalogEntry::show("A", "")));
        orch.invalidate(&mut session);
        let done = rx.recv().await.unwrap();

        assert_eq!(orch.commit(&mut session, done), CommitOutcome::Stale);
        assert!(session.episodes.is_empty());
        let row = session.catalog.iter().find(|e| e.name == "A").unwrap();
        assert!(row.latest_date.is_none());
        assert!(row.feed_url.is_none());
    }

    #[tokio::test]
    async fn aggregate_tolerates_failing_show() {
        let source = FakeSource::new()
            .with_show("A", &["2024-01-01 00:00", "2023-12-01 00:00"])
            .with_show("C", &["2024-03-01 00:00"]);
        let (mut orch, mut rx) = orchestrator(source);
        let subs = vec![
            CatalogEntry::show("A", ""),
            CatalogEntry::show("broken", ""),
            CatalogEntry::show("C", ""),
        ];
        let mut session = session_with(subs.clone(), Vec::new());

        orch.request_refresh(&mut session, RefreshTarget::NewEpisodes(subs));
        assert_eq!(session.loading.as_deref(), Some("Refreshing all subscriptions..."));
        let done = rx.recv().await.unwrap();

        match orch.commit(&mut session, done) {
            CommitOutcome::Applied { episodes, failed, .. } => {
                assert_eq!(episodes, 3);
                assert_eq!(failed, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        let dates: Vec<_> = session.episodes.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-01 00:00", "2024-01-01 00:00", "2023-12-01 00:00"]);
    }

    #[tokio::test]
    async fn aggregate_limit_applies_per_show() {
        let dates: Vec<String> = (1..=12).map(|d| format!("2024-01-{d:02} 00:00")).collect();
        let refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        let source = FakeSource::new().with_show("A", &refs);
        let (mut orch, mut rx) = orchestrator(source);
        let subs = vec![CatalogEntry::show("A", "")];
        let mut session = session_with(subs.clone(), Vec::new());

        orch.request_refresh(&mut session, RefreshTarget::NewEpisodes(subs));
        let done = rx.recv().await.unwrap();
        orch.commit(&mut session, done);
        assert_eq!(session.episodes.len(), FetchConfig::default().aggregate_limit);
    }

    #[tokio::test]
    async fn show_commit_updates_latest_and_writes_back_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.json");
        let store = pod_proto::SubscriptionStore::in_memory(path.clone(), vec![CatalogEntry::show("A", "")]);
        let mut session = SessionState::new(store);

        let source = FakeSource::new().with_show("A", &["2024-07-01 09:30"]);
        let (mut orch, mut rx) = orchestrator(source);
        orch.request_refresh(&mut session, RefreshTarget::Show(CatalogEntry::show("A", "")));
        let done = rx.recv().await.unwrap();
        assert!(matches!(
            orch.commit(&mut session, done),
            CommitOutcome::Applied { persist_error: None, .. }
        ));

        let sub = &session.subscriptions.entries()[0];
        assert_eq!(sub.latest_date.as_deref(), Some("2024-07-01 09:30"));
        assert_eq!(sub.feed_url.as_deref(), Some("https://feeds/A"));
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("2024-07-01 09:30"));
    }

    #[tokio::test]
    async fn single_show_error_commits_empty_list() {
        let (mut orch, mut rx) = orchestrator(FakeSource::new());
        let mut session = session_with(Vec::new(), Vec::new());
        orch.request_refresh(&mut session, RefreshTarget::Show(CatalogEntry::show("broken", "")));
        let done = rx.recv().await.unwrap();
        match orch.commit(&mut session, done) {
            CommitOutcome::Applied { episodes: 0, error: Some(_), .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn separators_have_no_target() {
        assert!(RefreshTarget::for_entry(&CatalogEntry::separator("--- X ---"), &[]).is_none());
        let subs = vec![CatalogEntry::show("A", "")];
        match RefreshTarget::for_entry(&CatalogEntry::new_episodes(), &subs) {
            Some(RefreshTarget::NewEpisodes(s)) => assert_eq!(s.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
