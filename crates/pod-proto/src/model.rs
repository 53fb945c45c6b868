use serde::{Deserialize, Serialize};

/// Timestamp layout shared by episodes and subscriptions. Lexicographic order
/// on strings in this layout is chronological order.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// What a row in the catalog pane stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A subscribed show or a discovery / search result.
    #[default]
    Show,
    /// The "new episodes" row aggregating every subscription.
    NewEpisodes,
    /// Non-selectable header row.
    Separator,
}

/// A row of the catalog pane.
///
/// Persisted subscriptions use the same shape, so the serde field names stay
/// compatible with existing `subscriptions.json` files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "is_show")]
    pub kind: EntryKind,
    pub name: String,
    #[serde(default, rename = "artist", deserialize_with = "null_as_default")]
    pub publisher: String,
    /// Feed locator, resolved lazily through the catalog API.
    #[serde(default, rename = "feed_url", deserialize_with = "empty_as_none")]
    pub feed_url: Option<String>,
    #[serde(default, rename = "itunes_id", deserialize_with = "id_as_string")]
    pub catalog_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, rename = "full_description", skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, rename = "latest_date", skip_serializing_if = "Option::is_none")]
    pub latest_date: Option<String>,
}

fn is_show(kind: &EntryKind) -> bool {
    *kind == EntryKind::Show
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// Catalog ids arrive as strings from the charts endpoint and as numbers from
/// lookup / search results.
fn id_as_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl CatalogEntry {
    pub fn show(name: impl Into<String>, publisher: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publisher: publisher.into(),
            ..Self::default()
        }
    }

    pub fn separator(label: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Separator,
            name: label.into(),
            ..Self::default()
        }
    }

    pub fn new_episodes() -> Self {
        Self {
            kind: EntryKind::NewEpisodes,
            name: "--- NEW EPISODES ---".to_string(),
            description: "Latest episodes from your subscriptions.".to_string(),
            ..Self::default()
        }
    }

    /// A subscription pointing straight at a feed the user typed in.
    pub fn custom_feed(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: url.clone(),
            publisher: "RSS".to_string(),
            feed_url: Some(url),
            description: "Custom RSS Feed".to_string(),
            ..Self::default()
        }
    }

    pub fn with_catalog_id(mut self, id: impl Into<String>) -> Self {
        self.catalog_id = Some(id.into());
        self
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_separator(&self) -> bool {
        self.kind == EntryKind::Separator
    }

    pub fn is_show(&self) -> bool {
        self.kind == EntryKind::Show
    }

    /// Text shown in the info pane: the long description once resolved.
    pub fn best_description(&self) -> &str {
        self.long_description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.description)
    }
}

/// One playable unit of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub description: String,
    /// Audio resource locator. Never empty.
    pub url: String,
    /// `YYYY-MM-DD HH:MM`, or a best-effort prefix of the raw feed date.
    pub date: String,
    pub duration: String,
    pub podcast_name: String,
}

impl Episode {
    /// Builds an episode, refusing an empty audio locator.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        podcast_name: impl Into<String>,
    ) -> Option<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return None;
        }
        Some(Self {
            title: title.into(),
            description: String::new(),
            url,
            date: String::new(),
            duration: "0".to_string(),
            podcast_name: podcast_name.into(),
        })
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }
}

/// Sorts newest first; stable, so equal timestamps keep feed order.
pub fn sort_newest_first(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| b.date.cmp(&a.date));
}
