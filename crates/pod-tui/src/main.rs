mod action;
mod app;
mod catalog;
mod component;
mod components;
mod feed;
mod fetch;
mod focus;
mod nav;
mod player;
mod session;
mod theme;
mod widgets;

use std::sync::Arc;

use pod_proto::config::Config;
use pod_proto::{platform, PlaybackHistory, SubscriptionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cache_dir = platform::cache_dir();
    std::fs::create_dir_all(&cache_dir)?;

    let log_path = cache_dir.join("pod-tui.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("pod-tui log: {}", log_path.display());

    tracing::info!("pod-tui starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {}, using defaults", e);
        Config::default()
    });

    // ── Persistent state ─────────────────────────────────────────────────────
    let subscriptions = SubscriptionStore::load(config.paths.subscriptions.clone());
    let history = PlaybackHistory::load(config.paths.history.clone());
    tracing::info!(
        "loaded {} subscriptions, {} saved positions",
        subscriptions.entries().len(),
        history.len()
    );

    // ── Subsystems ───────────────────────────────────────────────────────────
    let catalog = catalog::CatalogClient::new(&config.network)?;
    let resolver = Arc::new(feed::FeedResolver::new(catalog.clone()));
    let player = player::PlayerController::new(
        &config.player,
        history,
        platform::mpv_socket_path(),
        cache_dir.join("mpv.log"),
    );

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let session = session::SessionState::new(subscriptions);
    let app = app::App::new(session, catalog, resolver, config.fetch.clone(), player);
    app.run().await?;

    Ok(())
}
