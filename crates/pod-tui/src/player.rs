//! Playback controller: owns the mpv process and talks to it over its
//! control socket.
//!
//! ```text
//!   Idle ──play()──▶ Launching ──first status reply──▶ Controlling
//!     ▲                  │                                  │
//!     └──── reap(): process exited / play() replaces it ────┘
//! ```
//!
//! The control channel has no request ids, so every request opens its own
//! connection and the `ControlChannel` lock keeps at most one in flight.
//!
//! Platform notes:
//! - Unix:    Unix domain socket
//! - Windows: named pipe `\\.\pipe\<name>`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pod_proto::config::PlayerConfig;
use pod_proto::protocol::{command_frame, parse_property_response, property_query_frame, PlayerCommand};
use pod_proto::{Episode, PlaybackHistory, StoreError};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::widgets::progress_bar::format_time;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

const COMMAND_TIMEOUT: Duration = Duration::from_millis(50);
const QUERY_TIMEOUT: Duration = Duration::from_millis(100);

/// Fixed flags for every launch, before the socket and start offset.
const BASE_ARGS: [&str; 6] = [
    "--no-video",
    "--no-terminal",
    "--user-agent=Mozilla/5.0",
    "--demuxer-max-bytes=50M",
    "--network-timeout=30",
    "--ytdl=no",
];

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("mpv binary not found")]
    BinaryNotFound,

    #[error("cannot open player log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch player: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Launching,
    Controlling,
}

/// Result of a successful `play`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOutcome {
    /// Offset playback resumed from, when above the resume threshold.
    pub resumed_from: Option<f64>,
}

impl PlayOutcome {
    /// Status line for a fresh launch; `None` when starting from zero.
    pub fn status_message(&self) -> Option<String> {
        self.resumed_from
            .map(|pos| format!("Resuming from {}...", format_time(pos)))
    }
}

/// One status poll. `None` fields mean the query failed or had no value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStatus {
    pub position: Option<f64>,
    pub duration: Option<f64>,
    pub paused: Option<bool>,
}

impl PlayerStatus {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.duration.is_none() && self.paused.is_none()
    }
}

/// Command line for one launch, without the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub args: Vec<String>,
    pub resumed_from: Option<f64>,
}

/// Build the player arguments. A stored offset above `threshold` seconds is
/// passed as `--start`; anything at or below it starts from zero.
pub fn launch_plan(
    socket: &Path,
    url: &str,
    stored_offset: f64,
    threshold: f64,
    extra_args: &[String],
) -> LaunchPlan {
    let mut args: Vec<String> = BASE_ARGS.iter().map(|a| a.to_string()).collect();
    args.insert(2, pod_proto::platform::mpv_socket_arg(socket));
    let resumed_from = (stored_offset > threshold).then_some(stored_offset);
    if let Some(offset) = resumed_from {
        args.push(format!("--start={}", offset as i64));
    }
    args.extend(extra_args.iter().cloned());
    args.push(url.to_string());
    LaunchPlan { args, resumed_from }
}

// ── Control channel ──────────────────────────────────────────────────────────

/// Cloneable handle to the control socket. Every clone shares one lock.
#[derive(Clone)]
pub struct ControlChannel {
    socket: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl ControlChannel {
    pub fn new(socket: PathBuf) -> Self {
        Self {
            socket,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Fire-and-forget. Failures are logged at debug and otherwise ignored.
    pub async fn send_command(&self, command: &PlayerCommand) {
        let frame = command_frame(&command.to_args());
        if let Err(e) = self.exchange(&frame, false, COMMAND_TIMEOUT).await {
            debug!("player: command {:?} dropped: {}", command, e);
        }
    }

    /// Read one property. Any failure, or a null value, is `None`.
    pub async fn query_property(&self, name: &str) -> Option<Value> {
        let frame = property_query_frame(name);
        match self.exchange(&frame, true, QUERY_TIMEOUT).await {
            Ok(Some(line)) => parse_property_response(&line),
            Ok(None) => None,
            Err(e) => {
                debug!("player: query {} failed: {}", name, e);
                None
            }
        }
    }

    pub async fn poll_status(&self) -> PlayerStatus {
        PlayerStatus {
            position: self.query_property("time-pos").await.and_then(|v| v.as_f64()),
            duration: self.query_property("duration").await.and_then(|v| v.as_f64()),
            paused: self.query_property("pause").await.and_then(|v| v.as_bool()),
        }
    }

    async fn exchange(
        &self,
        frame: &str,
        want_reply: bool,
        limit: Duration,
    ) -> std::io::Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let attempt = async {
            let stream = self.connect().await?;
            round_trip(stream, frame, want_reply).await
        };
        tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "control channel timeout"))?
    }

    #[cfg(unix)]
    async fn connect(&self) -> std::io::Result<UnixStream> {
        UnixStream::connect(&self.socket).await
    }

    #[cfg(windows)]
    async fn connect(&self) -> std::io::Result<tokio::net::windows::named_pipe::NamedPipeClient> {
        ClientOptions::new().open(&self.socket)
    }
}

async fn round_trip<S>(mut stream: S, frame: &str, want_reply: bool) -> std::io::Result<Option<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(frame.as_bytes()).await?;
    if !want_reply {
        return Ok(None);
    }
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(Some(line))
}

// ── Controller ───────────────────────────────────────────────────────────────

pub struct PlayerController {
    state: PlayerState,
    process: Option<tokio::process::Child>,
    binary: Option<PathBuf>,
    channel: ControlChannel,
    history: PlaybackHistory,
    log_path: PathBuf,
    resume_threshold: f64,
    extra_args: Vec<String>,
    save_interval: Duration,
    last_save_check: Option<Instant>,
    active_url: Option<String>,
    /// Bumped on every `play`; status polls carry the value they started under.
    launch_id: u64,
}

impl PlayerController {
    pub fn new(config: &PlayerConfig, history: PlaybackHistory, socket: PathBuf, log_path: PathBuf) -> Self {
        Self {
            state: PlayerState::Idle,
            process: None,
            binary: config.binary.clone(),
            channel: ControlChannel::new(socket),
            history,
            log_path,
            resume_threshold: config.resume_threshold_secs,
            extra_args: config.extra_args.clone(),
            save_interval: Duration::from_secs(config.save_interval_secs),
            last_save_check: None,
            active_url: None,
            launch_id: 0,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn channel(&self) -> ControlChannel {
        self.channel.clone()
    }

    pub fn launch_id(&self) -> u64 {
        self.launch_id
    }

    #[cfg(test)]
    pub fn history(&self) -> &PlaybackHistory {
        &self.history
    }

    /// Replace whatever is playing with `episode`.
    pub async fn play(&mut self, episode: &Episode) -> Result<PlayOutcome, PlayerError> {
        self.kill().await;
        self.launch_id += 1;

        let binary = self
            .binary
            .clone()
            .or_else(pod_proto::platform::find_mpv_binary)
            .ok_or(PlayerError::BinaryNotFound)?;

        #[cfg(unix)]
        let _ = tokio::fs::remove_file(self.channel.socket()).await;

        let stored = self.history.position_for(&episode.url);
        let plan = launch_plan(
            self.channel.socket(),
            &episode.url,
            stored,
            self.resume_threshold,
            &self.extra_args,
        );

        if let Some(parent) = self.log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let log_err = |source| PlayerError::Log {
            path: self.log_path.clone(),
            source,
        };
        let stdout_log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(log_err)?;
        let stderr_log = stdout_log.try_clone().map_err(log_err)?;

        info!("player: launching {} for '{}'", binary.display(), episode.title);
        debug!("player: args {:?}", plan.args);
        let child = tokio::process::Command::new(&binary)
            .args(&plan.args)
            .stdin(std::process::Stdio::null())
            .stdout(stdout_log)
            .stderr(stderr_log)
            .kill_on_drop(true)
            .spawn()
            .map_err(PlayerError::Spawn)?;
        info!("player: spawned pid {:?}", child.id());

        self.process = Some(child);
        self.state = PlayerState::Launching;
        self.active_url = Some(episode.url.clone());
        self.last_save_check = Some(Instant::now());
        Ok(PlayOutcome {
            resumed_from: plan.resumed_from,
        })
    }

    /// Send `command` on its own task so the caller never waits on the channel
    /// lock. Nothing is sent while idle.
    pub fn spawn_command(&self, command: PlayerCommand) -> Option<tokio::task::JoinHandle<()>> {
        if self.state == PlayerState::Idle {
            return None;
        }
        let channel = self.channel.clone();
        Some(tokio::spawn(async move { channel.send_command(&command).await }))
    }

    /// Fold a status poll into the state machine and persist the position when
    /// the save interval has elapsed. Polls started under an earlier launch are
    /// ignored. Returns whether history was written.
    pub fn on_status(&mut self, launch_id: u64, status: &PlayerStatus, now: Instant) -> Result<bool, StoreError> {
        if launch_id != self.launch_id {
            debug!("player: dropping status from launch {}", launch_id);
            return Ok(false);
        }
        if self.state == PlayerState::Launching && !status.is_empty() {
            debug!("player: control channel answering");
            self.state = PlayerState::Controlling;
        }
        match status.position {
            Some(pos) => self.record_position(pos, now),
            None => Ok(false),
        }
    }

    /// Throttled position save. The check time advances even when nothing is
    /// written.
    pub fn record_position(&mut self, position: f64, now: Instant) -> Result<bool, StoreError> {
        if let Some(last) = self.last_save_check {
            if now.duration_since(last) < self.save_interval {
                return Ok(false);
            }
        }
        self.last_save_check = Some(now);
        let Some(url) = &self.active_url else {
            return Ok(false);
        };
        if !self.history.record(url, position) {
            return Ok(false);
        }
        self.history.save()?;
        Ok(true)
    }

    /// Non-blocking liveness check. Returns `true` when a process that was
    /// running has exited.
    pub fn reap(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                match status.code() {
                    Some(code) => info!("player: exited with code {}", code),
                    None => info!("player: terminated by signal"),
                }
                self.process = None;
                self.state = PlayerState::Idle;
                self.active_url = None;
                true
            }
            Err(e) => {
                warn!("player: liveness check failed: {}", e);
                false
            }
        }
    }

    async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            debug!("player: stopping previous process");
            let _ = p.kill().await;
        }
        self.state = PlayerState::Idle;
        self.active_url = None;
    }

    /// Save the last known position and stop the player.
    pub async fn shutdown(&mut self, last_position: f64) {
        if let Some(url) = &self.active_url {
            if self.history.record(url, last_position) {
                if let Err(e) = self.history.save() {
                    warn!("player: saving history on exit failed: {}", e);
                }
            }
        }
        if self.state != PlayerState::Idle {
            self.channel.send_command(&PlayerCommand::Stop).await;
        }
        self.kill().await;
    }
}
