//! Action enum: what the navigator asks the App to carry out.

use pod_proto::protocol::PlayerCommand;
use pod_proto::{CatalogEntry, Episode};

use crate::fetch::RefreshTarget;

/// Key handling never performs I/O itself; it returns Actions and the App
/// dispatches each one.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Episodes ─────────────────────────────────────────────────────────────
    Refresh(RefreshTarget),
    /// Selection moved to a row with nothing to fetch.
    Invalidate,

    // ── Playback ─────────────────────────────────────────────────────────────
    Play(Episode),
    Player(PlayerCommand),

    // ── Catalog ──────────────────────────────────────────────────────────────
    ToggleSubscription(CatalogEntry),
    SubscribeFeed(String),
    ResetDiscovery,
    SearchPodcasts(String),
    SearchEpisodes(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
