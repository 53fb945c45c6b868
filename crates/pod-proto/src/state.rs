//! Persisted user state: subscriptions and playback positions.
//!
//! Both stores are plain JSON files rewritten wholesale on every change.
//! Loading is lenient: a missing or unreadable file starts an empty store
//! (an unreadable one is first copied to `<file>.bak`), and a subscription
//! record that does not decode is skipped on its own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::model::{CatalogEntry, DATE_FORMAT};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the JSON in `path`. A missing file gives `None`; so does one that
/// fails to parse, after it has been copied aside to `<file>.bak`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let Ok(content) = std::fs::read_to_string(path) else {
        debug!("store: {} not present, starting empty", path.display());
        return None;
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("store: {} unreadable ({}), starting empty", path.display(), e);
            back_up(path);
            None
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn back_up(path: &Path) {
    let backup = backup_path(path);
    match std::fs::copy(path, &backup) {
        Ok(_) => warn!("store: previous contents kept in {}", backup.display()),
        Err(e) => warn!("store: could not back up {}: {}", path.display(), e),
    }
}

// ── Subscriptions ─────────────────────────────────────────────────────────────

/// The user's subscriptions, keyed by show name.
#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    path: PathBuf,
    entries: Vec<CatalogEntry>,
}

impl SubscriptionStore {
    pub fn load(path: PathBuf) -> Self {
        let records: Vec<serde_json::Value> = read_json(&path).unwrap_or_default();
        let entries = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| match serde_json::from_value::<CatalogEntry>(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("store: skipping subscription #{} in {}: {}", i, path.display(), e);
                    None
                }
            })
            .collect();
        Self { path, entries }
    }

    pub fn in_memory(path: PathBuf, entries: Vec<CatalogEntry>) -> Self {
        Self { path, entries }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        write_json(&self.path, &self.entries)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CatalogEntry> {
        self.entries.iter_mut().find(|s| s.name == name)
    }

    /// Subscriptions with the most recently updated shows first.
    pub fn sorted_by_latest(&self) -> Vec<CatalogEntry> {
        let mut subs = self.entries.clone();
        subs.sort_by(|a, b| {
            b.latest_date
                .as_deref()
                .unwrap_or("")
                .cmp(a.latest_date.as_deref().unwrap_or(""))
        });
        subs
    }

    /// Add `entry` unless a subscription with the same name exists.
    /// Returns whether the set changed.
    pub fn add(&mut self, entry: CatalogEntry) -> bool {
        if !entry.is_show() || self.contains(&entry.name) {
            return false;
        }
        let mut sub = entry;
        if sub.latest_date.is_none() {
            sub.latest_date = Some(chrono::Local::now().format(DATE_FORMAT).to_string());
        }
        self.entries.push(sub);
        true
    }

    /// Subscribe or unsubscribe by name. Returns `true` if the entry is now
    /// subscribed. Separators and the aggregate row are ignored.
    pub fn toggle(&mut self, entry: &CatalogEntry) -> bool {
        if !entry.is_show() {
            return false;
        }
        if let Some(pos) = self.entries.iter().position(|s| s.name == entry.name) {
            self.entries.remove(pos);
            false
        } else {
            self.add(entry.clone())
        }
    }

    /// Record the newest known episode timestamp. Returns whether it changed.
    pub fn set_latest_date(&mut self, name: &str, date: &str) -> bool {
        match self.get_mut(name) {
            Some(sub) if sub.latest_date.as_deref() != Some(date) => {
                sub.latest_date = Some(date.to_string());
                true
            }
            _ => false,
        }
    }
}

// ── Playback history ──────────────────────────────────────────────────────────

/// Last known playback offset per audio locator, in seconds.
#[derive(Debug, Clone)]
pub struct PlaybackHistory {
    path: PathBuf,
    positions: HashMap<String, f64>,
}

impl PlaybackHistory {
    pub fn load(path: PathBuf) -> Self {
        let mut positions: HashMap<String, f64> = read_json(&path).unwrap_or_default();
        positions.retain(|_, v| v.is_finite() && *v >= 0.0);
        Self { path, positions }
    }

    pub fn in_memory(path: PathBuf) -> Self {
        Self {
            path,
            positions: HashMap::new(),
        }
    }

    pub fn position_for(&self, url: &str) -> f64 {
        self.positions.get(url).copied().unwrap_or(0.0)
    }

    /// Store `secs` for `url`. Non-positive or non-finite values are ignored.
    pub fn record(&mut self, url: &str, secs: f64) -> bool {
        if !(secs.is_finite() && secs > 0.0) {
            return false;
        }
        self.positions.insert(url.to_string(), secs);
        true
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        write_json(&self.path, &self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SubscriptionStore {
        SubscriptionStore::in_memory(PathBuf::from("/nonexistent/subs.json"), Vec::new())
    }

    #[test]
    fn toggle_twice_restores_set() {
        let mut subs = store();
        subs.add(CatalogEntry::show("Existing", "P"));
        let before: Vec<String> = subs.entries().iter().map(|e| e.name.clone()).collect();

        let show = CatalogEntry::show("New Show", "Pub");
        assert!(subs.toggle(&show));
        assert!(subs.contains("New Show"));
        assert!(!subs.toggle(&show));

        let after: Vec<String> = subs.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn add_stamps_latest_date() {
        let mut subs = store();
        subs.add(CatalogEntry::show("S", "P"));
        let date = subs.entries()[0].latest_date.clone().unwrap();
        assert_eq!(date.len(), "YYYY-MM-DD HH:MM".len());
    }

    #[test]
    fn toggle_ignores_non_shows() {
        let mut subs = store();
        assert!(!subs.toggle(&CatalogEntry::separator("--- DISCOVERY ---")));
        assert!(!subs.toggle(&CatalogEntry::new_episodes()));
        assert!(subs.is_empty());
    }

    #[test]
    fn sorted_by_latest_puts_newest_first() {
        let mut a = CatalogEntry::show("A", "");
        a.latest_date = Some("2024-01-01 00:00".into());
        let mut b = CatalogEntry::show("B", "");
        b.latest_date = Some("2024-06-01 00:00".into());
        let subs = SubscriptionStore::in_memory(PathBuf::new(), vec![a, b]);
        let names: Vec<_> = subs.sorted_by_latest().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn history_ignores_non_positive() {
        let mut h = PlaybackHistory::in_memory(PathBuf::new());
        assert!(!h.record("u", 0.0));
        assert!(!h.record("u", -3.0));
        assert!(!h.record("u", f64::NAN));
        assert!(h.record("u", 42.5));
        assert_eq!(h.position_for("u"), 42.5);
        assert_eq!(h.position_for("other"), 0.0);
    }
}
