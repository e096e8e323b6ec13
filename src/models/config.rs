//! Application configuration structures.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{EpisodeType, MatchMode, TitleMappingRule};

pub const ENV_ACCESS_TOKEN: &str = "FILLERSYNC_ACCESS_TOKEN";
pub const ENV_CLIENT_ID: &str = "FILLERSYNC_CLIENT_ID";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings shared by all services
    #[serde(default)]
    pub http: HttpConfig,

    /// Roster site settings
    #[serde(default)]
    pub roster: RosterConfig,

    /// Remote catalog API settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Reconciliation behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Local file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Shows kept in sync by `sync-all`
    #[serde(default)]
    pub shows: Vec<ShowConfig>,

    /// Per-show title cleanup, keyed by roster show id
    #[serde(default)]
    pub title_mappings: HashMap<String, TitleMappingRule>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.roster.base_url.trim().is_empty() {
            return Err(AppError::validation("roster.base_url is empty"));
        }
        if self.catalog.api_url.trim().is_empty() {
            return Err(AppError::validation("catalog.api_url is empty"));
        }
        if self.sync.batch_size == 0 {
            return Err(AppError::validation("sync.batch_size must be > 0"));
        }
        if self.sync.max_attempts == 0 {
            return Err(AppError::validation("sync.max_attempts must be > 0"));
        }
        for show in &self.shows {
            if show.library_title.trim().is_empty() && show.roster_id.is_none() {
                return Err(AppError::validation(
                    "shows entries need a library_title or a roster_id",
                ));
            }
        }
        Ok(())
    }

    /// Override catalog credentials from `FILLERSYNC_ACCESS_TOKEN` and
    /// `FILLERSYNC_CLIENT_ID`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.catalog.access_token = token.trim().to_string();
        }
        if let Some(client_id) = lookup(ENV_CLIENT_ID).filter(|v| !v.trim().is_empty()) {
            self.catalog.client_id = client_id.trim().to_string();
        }
    }

    /// Title cleanup rule for a roster show, if any.
    pub fn title_mapping(&self, roster_id: &str) -> Option<&TitleMappingRule> {
        self.title_mappings.get(roster_id)
    }

    /// Find a configured show by roster id or library title.
    pub fn find_show(&self, name: &str) -> Option<&ShowConfig> {
        let lowered = name.trim().to_lowercase();
        self.shows.iter().find(|show| {
            show.roster_id.as_deref() == Some(name.trim())
                || show.library_title.to_lowercase() == lowered
        })
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between consecutive shows in `sync-all`, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Roster site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "defaults::roster_url")]
    pub base_url: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::roster_url(),
        }
    }
}

/// Remote catalog API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// API root
    #[serde(default = "defaults::catalog_api_url")]
    pub api_url: String,

    /// Public site root used for list links
    #[serde(default = "defaults::catalog_site_url")]
    pub site_url: String,

    /// API application key
    #[serde(default)]
    pub client_id: String,

    /// OAuth bearer token
    #[serde(default)]
    pub access_token: String,

    /// Owner of the synchronized lists
    #[serde(default)]
    pub username: String,

    /// Privacy of newly created lists
    #[serde(default = "defaults::list_privacy")]
    pub list_privacy: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::catalog_api_url(),
            site_url: defaults::catalog_site_url(),
            client_id: String::new(),
            access_token: String::new(),
            username: String::new(),
            list_privacy: defaults::list_privacy(),
        }
    }
}

/// Reconciliation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Default matching mode
    #[serde(default)]
    pub match_by: MatchMode,

    /// Remote ids submitted per add request
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Attempts per batch while rate limited (including the first)
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on every further retry
    #[serde(default = "defaults::initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Pause after each successful batch
    #[serde(default = "defaults::batch_pause")]
    pub batch_pause_ms: u64,
}

impl SyncConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            match_by: MatchMode::default(),
            batch_size: defaults::batch_size(),
            max_attempts: defaults::max_attempts(),
            initial_backoff_ms: defaults::initial_backoff(),
            batch_pause_ms: defaults::batch_pause(),
        }
    }
}

/// Local file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// File name of the failure log inside `data_dir`
    #[serde(default = "defaults::failure_log")]
    pub failure_log: String,
}

impl PathsConfig {
    pub fn failure_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.failure_log)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            failure_log: defaults::failure_log(),
        }
    }
}

/// A show kept in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowConfig {
    /// Title in the local media library
    #[serde(default)]
    pub library_title: String,

    /// Roster show id; resolved from `library_title` when absent
    #[serde(default)]
    pub roster_id: Option<String>,

    /// Catalog show id or slug
    #[serde(default)]
    pub catalog_id: Option<String>,

    /// TMDB id used to look the show up in the catalog
    #[serde(default)]
    pub tmdb_id: Option<u64>,

    /// Lists maintained for this show
    #[serde(default = "defaults::episode_types")]
    pub episode_types: Vec<EpisodeType>,
}

impl ShowConfig {
    /// Name used in log lines.
    pub fn display_name(&self) -> &str {
        if self.library_title.is_empty() {
            self.roster_id.as_deref().unwrap_or("unknown")
        } else {
            &self.library_title
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::EpisodeType;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; fillersync/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Remote defaults
    pub fn roster_url() -> String {
        "https://www.animefillerlist.com".into()
    }
    pub fn catalog_api_url() -> String {
        "https://api.trakt.tv".into()
    }
    pub fn catalog_site_url() -> String {
        "https://trakt.tv".into()
    }
    pub fn list_privacy() -> String {
        "private".into()
    }

    // Sync defaults
    pub fn batch_size() -> usize {
        10
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn initial_backoff() -> u64 {
        1000
    }
    pub fn batch_pause() -> u64 {
        500
    }

    // Path defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn failure_log() -> String {
        "failed_episodes.log".into()
    }

    pub fn episode_types() -> Vec<EpisodeType> {
        EpisodeType::ALL.to_vec()
    }
}
