use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Explicit player binary. When unset, mpv is looked up beside the
    /// executable and then on PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// Stored offsets at or below this many seconds restart from zero.
    #[serde(default = "default_resume_threshold")]
    pub resume_threshold_secs: f64,
    /// Minimum spacing between playback-position saves.
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
    /// Appended to the player command line before the locator.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Storefront for the top charts listing.
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_chart_limit")]
    pub chart_limit: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Episodes kept when refreshing a single show.
    #[serde(default = "default_show_limit")]
    pub show_limit: usize,
    /// Episodes taken from each subscription for the new-episodes view.
    #[serde(default = "default_aggregate_limit")]
    pub aggregate_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_subscriptions_file")]
    pub subscriptions: PathBuf,
    #[serde(default = "default_history_file")]
    pub history: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: None,
            resume_threshold_secs: default_resume_threshold(),
            save_interval_secs: default_save_interval(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            country: default_country(),
            chart_limit: default_chart_limit(),
            search_limit: default_search_limit(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            show_limit: default_show_limit(),
            aggregate_limit: default_aggregate_limit(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            subscriptions: default_subscriptions_file(),
            history: default_history_file(),
        }
    }
}

fn default_resume_threshold() -> f64 {
    10.0
}

fn default_save_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    5
}

fn default_country() -> String {
    "us".to_string()
}

fn default_chart_limit() -> usize {
    50
}

fn default_search_limit() -> usize {
    50
}

fn default_user_agent() -> String {
    concat!("pod-tui/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_show_limit() -> usize {
    100
}

fn default_aggregate_limit() -> usize {
    8
}

fn default_subscriptions_file() -> PathBuf {
    platform::config_dir().join("subscriptions.json")
}

fn default_history_file() -> PathBuf {
    platform::config_dir().join("history.json")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load the config file, writing the defaults out on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.player.resume_threshold_secs, 10.0);
        assert_eq!(config.player.save_interval_secs, 5);
        assert_eq!(config.fetch.show_limit, 100);
        assert_eq!(config.fetch.aggregate_limit, 8);
        assert_eq!(config.network.timeout_secs, 5);
        assert!(config.paths.subscriptions.ends_with("pod-tui/subscriptions.json"));
        assert!(config.paths.history.ends_with("pod-tui/history.json"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [network]
            country = "se"

            [fetch]
            aggregate_limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.network.country, "se");
        assert_eq!(config.network.chart_limit, 50);
        assert_eq!(config.fetch.aggregate_limit, 3);
        assert_eq!(config.fetch.show_limit, 100);
        assert!(config.player.binary.is_none());
    }
}
