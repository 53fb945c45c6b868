//! Shared model, persistence and platform helpers for pod-tui.

pub mod config;
pub mod model;
pub mod platform;
pub mod protocol;
pub mod state;

pub use model::{CatalogEntry, EntryKind, Episode};
pub use state::{PlaybackHistory, StoreError, SubscriptionStore};
