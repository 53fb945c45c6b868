//! Feed resolver: catalog entry → feed locator → playable episodes.
//!
//! Resolution is memoized on the entry itself: once a feed locator is known it
//! is returned unchanged. Parsing accepts RSS 2.0 and Atom and normalises every
//! item into a [`FeedItem`] before the audio locator is picked, so the ranking
//! rules live in one place.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use pod_proto::model::DATE_FORMAT;
use pod_proto::{CatalogEntry, Episode};
use regex::Regex;
use tracing::{debug, warn};

use crate::catalog::{CatalogClient, CatalogError};

/// Extensions that mark a locator as audio.
const AUDIO_EXTENSIONS: [&str; 5] = [".mp3", ".m4a", ".aac", ".wav", ".ogg"];
/// Path markers used by podcast redirectors and CDNs.
const AUDIO_MARKERS: [&str; 3] = ["podcast", "audio", "redirect"];

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(u16),

    #[error("feed parse error: {0}")]
    Parse(String),
}

/// Anything that can produce the episodes of a catalog entry.
///
/// `entry` is borrowed mutably so resolution can memoize the feed locator and
/// long description on it.
pub trait EpisodeSource: Send + Sync + 'static {
    fn fetch_episodes<'a>(
        &'a self,
        entry: &'a mut CatalogEntry,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Episode>, FeedError>>;
}

// ── Normalised feed item ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemLink {
    pub href: String,
    pub mime_type: Option<String>,
    pub rel: Option<String>,
}

/// Format-independent view of one feed entry.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub published_raw: Option<String>,
    pub duration: Option<String>,
    pub enclosures: Vec<String>,
    pub links: Vec<ItemLink>,
    pub media: Vec<String>,
}

fn has_audio_extension(url: &str) -> bool {
    let lower = url.to_lowercase();
    AUDIO_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

fn looks_like_audio(url: &str) -> bool {
    let lower = url.to_lowercase();
    has_audio_extension(&lower) || AUDIO_MARKERS.iter().any(|m| lower.contains(m))
}

impl FeedItem {
    /// Candidate audio locators in priority order: enclosures, audio-typed or
    /// enclosure-rel links, media content, links with an audio extension.
    pub fn audio_candidates(&self) -> Vec<&str> {
        let mut candidates: Vec<&str> = Vec::new();
        candidates.extend(self.enclosures.iter().map(String::as_str));
        candidates.extend(
            self.links
                .iter()
                .filter(|l| {
                    let typed_audio = l
                        .mime_type
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains("audio"));
                    typed_audio || l.rel.as_deref() == Some("enclosure")
                })
                .map(|l| l.href.as_str()),
        );
        candidates.extend(self.media.iter().map(String::as_str));
        candidates.extend(
            self.links
                .iter()
                .filter(|l| has_audio_extension(&l.href))
                .map(|l| l.href.as_str()),
        );
        candidates.retain(|c| !c.trim().is_empty());
        candidates
    }

    /// First candidate passing the audio heuristic, else the first candidate.
    pub fn audio_locator(&self) -> Option<&str> {
        let candidates = self.audio_candidates();
        candidates
            .iter()
            .copied()
            .find(|c| looks_like_audio(c))
            .or_else(|| candidates.first().copied())
    }

    fn date_text(&self) -> String {
        match (&self.published, &self.published_raw) {
            (Some(dt), _) => dt.format(DATE_FORMAT).to_string(),
            (None, Some(raw)) => raw.chars().take(16).collect(),
            (None, None) => String::new(),
        }
    }

    /// Build the episode, or `None` when no audio locator exists.
    pub fn into_episode(self, show_name: &str) -> Option<Episode> {
        let url = self.audio_locator()?.to_string();
        let date = self.date_text();
        let description = strip_html(self.summary.as_deref().unwrap_or(""));
        Episode::new(
            self.title.unwrap_or_else(|| "Unknown".to_string()),
            url,
            show_name,
        )
        .map(|ep| {
            ep.with_date(date)
                .with_description(description)
                .with_duration(self.duration.unwrap_or_else(|| "0".to_string()))
        })
    }
}

pub fn strip_html(text: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    match TAGS.get_or_init(|| Regex::new(r"<[^<]+?>").ok()) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// ── RSS ──────────────────────────────────────────────────────────────────────

fn rss_ext_attr_values(
    ext: &BTreeMap<String, BTreeMap<String, Vec<rss::extension::Extension>>>,
    prefix: &str,
    name: &str,
    attr: &str,
) -> Vec<String> {
    let mut out = Vec::new();
    let Some(group) = ext.get(prefix) else {
        return out;
    };
    let direct = group.get(name).into_iter().flatten();
    // media:group wraps media:content in many feeds
    let nested = group
        .get("group")
        .into_iter()
        .flatten()
        .flat_map(|g| g.children().get(name).into_iter().flatten());
    for e in direct.chain(nested) {
        if let Some(v) = e.attrs().get(attr) {
            out.push(v.clone());
        }
    }
    out
}

fn rss_atom_links(
    ext: &BTreeMap<String, BTreeMap<String, Vec<rss::extension::Extension>>>,
) -> Vec<ItemLink> {
    ext.get("atom")
        .and_then(|g| g.get("link"))
        .into_iter()
        .flatten()
        .filter_map(|e| {
            let attrs = e.attrs();
            Some(ItemLink {
                href: attrs.get("href")?.clone(),
                mime_type: attrs.get("type").cloned(),
                rel: attrs.get("rel").cloned(),
            })
        })
        .collect()
}

impl From<&rss::Item> for FeedItem {
    fn from(item: &rss::Item) -> Self {
        let ext = item.extensions();

        let mut links = Vec::new();
        if let Some(link) = item.link() {
            links.push(ItemLink {
                href: link.to_string(),
                mime_type: None,
                rel: Some("alternate".to_string()),
            });
        }
        links.extend(rss_atom_links(ext));

        let summary = item
            .description()
            .map(String::from)
            .or_else(|| item.itunes_ext().and_then(|i| i.summary()).map(String::from))
            .or_else(|| item.content().map(String::from));

        let published_raw = item.pub_date().map(String::from).or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().first().cloned())
        });
        let published = published_raw
            .as_deref()
            .and_then(|raw| parse_rfc2822(raw).or_else(|| parse_rfc3339(raw)));

        FeedItem {
            title: item.title().map(String::from),
            summary,
            published,
            published_raw,
            duration: item
                .itunes_ext()
                .and_then(|i| i.duration())
                .map(String::from),
            enclosures: item
                .enclosure()
                .map(|e| e.url().to_string())
                .into_iter()
                .collect(),
            links,
            media: rss_ext_attr_values(ext, "media", "content", "url"),
        }
    }
}

// ── Atom ─────────────────────────────────────────────────────────────────────

fn atom_ext_values<'a>(
    ext: &'a BTreeMap<String, BTreeMap<String, Vec<atom_syndication::extension::Extension>>>,
    prefix: &str,
    name: &str,
) -> Vec<&'a atom_syndication::extension::Extension> {
    ext.get(prefix)
        .and_then(|g| g.get(name))
        .map(|v| v.iter().collect())
        .unwrap_or_default()
}

impl From<&atom_syndication::Entry> for FeedItem {
    fn from(entry: &atom_syndication::Entry) -> Self {
        let ext = entry.extensions();

        let links = entry
            .links()
            .iter()
            .map(|l| ItemLink {
                href: l.href().to_string(),
                mime_type: l.mime_type().map(String::from),
                rel: Some(l.rel().to_string()),
            })
            .collect();

        let summary = entry
            .summary()
            .map(|t| t.value.clone())
            .or_else(|| entry.content().and_then(|c| c.value()).map(String::from));

        let published = entry
            .published()
            .copied()
            .unwrap_or_else(|| *entry.updated());

        FeedItem {
            title: Some(entry.title().value.clone()),
            summary,
            published: Some(published.with_timezone(&Utc)),
            published_raw: Some(published.to_rfc3339()),
            duration: atom_ext_values(ext, "itunes", "duration")
                .first()
                .and_then(|e| e.value())
                .map(String::from),
            enclosures: Vec::new(),
            links,
            media: atom_ext_values(ext, "media", "content")
                .into_iter()
                .filter_map(|e| e.attrs().get("url").cloned())
                .collect(),
        }
    }
}

/// Parse a feed document, keeping at most `limit` source items.
///
/// Items without any audio candidate are dropped; order is the feed's own.
pub fn parse_feed(body: &[u8], show_name: &str, limit: usize) -> Result<Vec<Episode>, FeedError> {
    let items: Vec<FeedItem> = match rss::Channel::read_from(body) {
        Ok(channel) => channel.items().iter().take(limit).map(FeedItem::from).collect(),
        Err(rss_err) => match atom_syndication::Feed::read_from(body) {
            Ok(feed) => feed.entries().iter().take(limit).map(FeedItem::from).collect(),
            Err(atom_err) => {
                return Err(FeedError::Parse(format!(
                    "not RSS ({}) nor Atom ({})",
                    rss_err, atom_err
                )))
            }
        },
    };
    Ok(items
        .into_iter()
        .filter_map(|item| item.into_episode(show_name))
        .collect())
}

// ── Resolver ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FeedResolver {
    catalog: CatalogClient,
}

impl FeedResolver {
    pub fn new(catalog: CatalogClient) -> Self {
        Self { catalog }
    }

    /// Feed locator for `entry`, looked up on first use and cached on it.
    /// Failures are logged and reported as `None`.
    pub async fn resolve(&self, entry: &mut CatalogEntry) -> Option<String> {
        if entry.is_separator() {
            return None;
        }
        if let Some(url) = &entry.feed_url {
            return Some(url.clone());
        }

        let hit: Result<_, CatalogError> = match &entry.catalog_id {
            Some(id) => self.catalog.lookup(id).await,
            None => self.catalog.find_by_name(&entry.name).await,
        };
        match hit {
            Ok(Some(hit)) => {
                entry.feed_url = hit.feed_url.filter(|u| !u.is_empty());
                if hit.description.is_some() {
                    entry.long_description = hit.description;
                }
                debug!("feed: resolved '{}' -> {:?}", entry.name, entry.feed_url);
                entry.feed_url.clone()
            }
            Ok(None) => {
                debug!("feed: no catalog match for '{}'", entry.name);
                None
            }
            Err(e) => {
                warn!("feed: resolving '{}' failed: {}", entry.name, e);
                None
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.catalog.http().get(url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl EpisodeSource for FeedResolver {
    fn fetch_episodes<'a>(
        &'a self,
        entry: &'a mut CatalogEntry,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Episode>, FeedError>> {
        Box::pin(async move {
            let Some(url) = self.resolve(entry).await else {
                return Ok(Vec::new());
            };
            let body = self.download(&url).await?;
            let episodes = parse_feed(&body, &entry.name, limit)?;
            debug!("feed: '{}' -> {} episodes", entry.name, episodes.len());
            Ok(episodes)
        })
    }
}
