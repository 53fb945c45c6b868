//! Remote podcast catalog client (top charts, lookup by id, search).

use std::time::Duration;

use pod_proto::config::NetworkConfig;
use pod_proto::{CatalogEntry, Episode};
use serde::Deserialize;
use tracing::debug;

const CHARTS_BASE: &str = "https://rss.applemarketingtools.com/api/v2";
const LOOKUP_URL: &str = "https://itunes.apple.com/lookup";
const SEARCH_URL: &str = "https://itunes.apple.com/search";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned status {0}")]
    Status(u16),
}

// ── Wire shapes ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartsResponse {
    #[serde(default)]
    feed: ChartsFeed,
}

#[derive(Debug, Default, Deserialize)]
struct ChartsFeed {
    #[serde(default)]
    results: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist_name: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    genres: Vec<ChartGenre>,
}

#[derive(Debug, Deserialize)]
struct ChartGenre {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// A podcast from lookup or search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastHit {
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub collection_id: Option<u64>,
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub primary_genre_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeHit {
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    episode_url: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    track_time_millis: Option<u64>,
    #[serde(default)]
    collection_name: Option<String>,
}

impl PodcastHit {
    fn into_entry(self) -> CatalogEntry {
        let mut entry = CatalogEntry::show(
            self.collection_name.unwrap_or_else(|| "Unknown".to_string()),
            self.artist_name.unwrap_or_else(|| "Unknown".to_string()),
        )
        .with_description(self.primary_genre_name.unwrap_or_else(|| "Podcast".to_string()));
        entry.catalog_id = self.collection_id.map(|id| id.to_string());
        entry.feed_url = self.feed_url.filter(|u| !u.is_empty());
        entry.long_description = self.description;
        entry
    }
}

impl EpisodeHit {
    fn into_episode(self) -> Option<Episode> {
        let date = self
            .release_date
            .map(|d| d.chars().take(16).collect::<String>().replace('T', " "))
            .unwrap_or_default();
        Episode::new(
            self.track_name.unwrap_or_else(|| "Unknown".to_string()),
            self.episode_url.unwrap_or_default(),
            self.collection_name.unwrap_or_else(|| "Unknown".to_string()),
        )
        .map(|ep| {
            ep.with_date(date)
                .with_description(self.description.unwrap_or_default())
                .with_duration((self.track_time_millis.unwrap_or(0) / 1000).to_string())
        })
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Cheap to clone; every clone shares one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    country: String,
    chart_limit: usize,
    search_limit: usize,
}

impl CatalogClient {
    pub fn new(config: &NetworkConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            country: config.country.clone(),
            chart_limit: config.chart_limit,
            search_limit: config.search_limit,
        })
    }

    /// The shared HTTP client, also used for feed downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        debug!("catalog: GET {} {:?}", url, query);
        let response = self.http.get(url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    /// Top podcast charts for the configured storefront.
    pub async fn top_charts(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = format!(
            "{}/{}/podcasts/top/{}/podcasts.json",
            CHARTS_BASE, self.country, self.chart_limit
        );
        let data: ChartsResponse = self.get_json(&url, &[]).await?;
        Ok(data
            .feed
            .results
            .into_iter()
            .map(|r| {
                let genre = r
                    .genres
                    .into_iter()
                    .next()
                    .map(|g| g.name)
                    .filter(|g| !g.is_empty())
                    .unwrap_or_else(|| "Podcast".to_string());
                let mut entry = CatalogEntry::show(r.name, r.artist_name).with_description(genre);
                if !r.id.is_empty() {
                    entry.catalog_id = Some(r.id);
                }
                entry
            })
            .collect())
    }

    /// First podcast matching a catalog id.
    pub async fn lookup(&self, catalog_id: &str) -> Result<Option<PodcastHit>, CatalogError> {
        let data: SearchResponse<PodcastHit> = self
            .get_json(LOOKUP_URL, &[("id", catalog_id.to_string())])
            .await?;
        Ok(data.results.into_iter().next())
    }

    /// Best podcast match for a show name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<PodcastHit>, CatalogError> {
        let data: SearchResponse<PodcastHit> = self
            .get_json(
                SEARCH_URL,
                &[
                    ("term", name.to_string()),
                    ("entity", "podcast".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(data.results.into_iter().next())
    }

    pub async fn search_podcasts(&self, term: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let data: SearchResponse<PodcastHit> = self
            .get_json(
                SEARCH_URL,
                &[
                    ("term", term.to_string()),
                    ("entity", "podcast".to_string()),
                    ("limit", self.search_limit.to_string()),
                ],
            )
            .await?;
        Ok(data.results.into_iter().map(PodcastHit::into_entry).collect())
    }

    /// Episode-level search. Hits without an audio locator are dropped.
    pub async fn search_episodes(&self, term: &str) -> Result<Vec<Episode>, CatalogError> {
        let data: SearchResponse<EpisodeHit> = self
            .get_json(
                SEARCH_URL,
                &[
                    ("term", term.to_string()),
                    ("entity", "podcastEpisode".to_string()),
                    ("limit", self.search_limit.to_string()),
                ],
            )
            .await?;
        Ok(data
            .results
            .into_iter()
            .filter_map(EpisodeHit::into_episode)
            .collect())
    }
}
