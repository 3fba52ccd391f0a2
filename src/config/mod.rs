//! Configuration management for the herald engine
//!
//! Handles loading and validating configuration from environment variables
//! and TOML files. Validation failures are fatal for the process: the engine
//! refuses to start without a destination id, and never discovers missing
//! configuration mid-cycle.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Which kinds of sources the engine draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentMode {
    /// Alternate between news and social sources
    Mixed,
    /// News sources only
    NewsOnly,
    /// Social sources only
    SocialOnly,
}

impl ContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::NewsOnly => "news-only",
            Self::SocialOnly => "social-only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mixed" => Some(Self::Mixed),
            "news-only" | "news" => Some(Self::NewsOnly),
            "social-only" | "social" => Some(Self::SocialOnly),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scheduling configuration
    pub scheduler: SchedulerConfig,

    /// Candidate selection configuration
    pub selection: SelectionConfig,

    /// Retry policy configuration
    pub retry: RetryConfig,

    /// Durable state configuration
    pub storage: StorageConfig,

    /// Destination configuration
    pub destination: DestinationConfig,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds to sleep between the end of one cycle and the start of the next
    pub interval_secs: u64,

    /// Hard wall-clock bound on a single cycle
    pub cycle_deadline_secs: u64,

    /// Run the dedup prune once every this many cycles
    pub prune_every_cycles: u64,

    /// Which source kinds to draw from
    pub content_mode: ContentMode,
}

/// Candidate selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Half-life of the recency decay, in hours
    pub recency_half_life_hours: f64,

    /// Weight of the recency component
    pub recency_weight: f64,

    /// Weight of the quality component
    pub quality_weight: f64,

    /// Minimum body-text length considered substantial
    pub min_text_len: usize,

    /// Score bonus for candidates carrying a media reference
    pub media_bonus: f64,

    /// How many recently-published categories feed the diversity penalty
    pub diversity_window: usize,

    /// Penalty per occurrence of the candidate's category in the window
    pub diversity_penalty: f64,

    /// Title keywords that demote a candidate
    pub blocked_keywords: Vec<String>,

    /// Penalty applied when a blocked keyword appears in the title
    pub blocked_penalty: f64,
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts for a transient failure (total attempts = budget + 1)
    pub budget: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
}

/// Durable state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the posted-record and stats stores
    pub data_dir: PathBuf,

    /// Posted records older than this many days are pruned
    pub retention_days: i64,
}

impl StorageConfig {
    /// Path of the dedup store
    pub fn posted_path(&self) -> PathBuf {
        self.data_dir.join("posted.json")
    }

    /// Path of the stats store
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("stats.json")
    }

    /// Path of the news candidate spool
    pub fn news_spool_path(&self) -> PathBuf {
        self.data_dir.join("news_spool.json")
    }

    /// Path of the social candidate spool
    pub fn social_spool_path(&self) -> PathBuf {
        self.data_dir.join("social_spool.json")
    }

    /// Path of the publish outbox
    pub fn outbox_path(&self) -> PathBuf {
        self.data_dir.join("outbox.jsonl")
    }
}

/// Destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Identifier of the page/community posts are published to
    pub page_id: String,

    /// Human-readable destination label for logs and `info` output
    pub label: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let interval_secs = env_parse("HERALD_INTERVAL_SECS", 600);
        let cycle_deadline_secs = env_parse("HERALD_CYCLE_DEADLINE_SECS", 120);
        let prune_every_cycles = env_parse("HERALD_PRUNE_EVERY_CYCLES", 50);

        let content_mode = std::env::var("HERALD_CONTENT_MODE")
            .ok()
            .and_then(|v| ContentMode::parse(&v))
            .unwrap_or(ContentMode::Mixed);

        let data_dir = std::env::var("HERALD_DATA_DIR")
            .unwrap_or_else(|_| String::from("data"))
            .into();

        let retention_days = env_parse("HERALD_RETENTION_DAYS", 30);

        let page_id = std::env::var("HERALD_PAGE_ID").unwrap_or_default();
        let label = std::env::var("HERALD_PAGE_LABEL").ok();

        Ok(Self {
            scheduler: SchedulerConfig {
                interval_secs,
                cycle_deadline_secs,
                prune_every_cycles,
                content_mode,
            },
            selection: SelectionConfig::default(),
            retry: RetryConfig {
                budget: env_parse("HERALD_RETRY_BUDGET", 2),
                base_delay_ms: env_parse("HERALD_RETRY_BASE_DELAY_MS", 1000),
                max_delay_ms: env_parse("HERALD_RETRY_MAX_DELAY_MS", 30_000),
            },
            storage: StorageConfig {
                data_dir,
                retention_days,
            },
            destination: DestinationConfig { page_id, label },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            EngineError::config(format!(
                "failed to parse TOML config {}: {e}",
                path.display()
            ))
        })?;

        Ok(config)
    }

    /// Validate configuration values. A missing destination id is the
    /// fatal-for-process case: the engine must not start without one.
    pub fn validate(&self) -> Result<()> {
        if self.destination.page_id.is_empty() {
            return Err(EngineError::config(
                "destination page_id is required (set HERALD_PAGE_ID)",
            ));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(EngineError::config("interval_secs must be greater than 0"));
        }

        if self.scheduler.cycle_deadline_secs == 0 {
            return Err(EngineError::config(
                "cycle_deadline_secs must be greater than 0",
            ));
        }

        if self.scheduler.prune_every_cycles == 0 {
            return Err(EngineError::config(
                "prune_every_cycles must be greater than 0",
            ));
        }

        if self.selection.recency_half_life_hours <= 0.0 {
            return Err(EngineError::config(
                "recency_half_life_hours must be positive",
            ));
        }

        if self.storage.retention_days <= 0 {
            return Err(EngineError::config("retention_days must be positive"));
        }

        Ok(())
    }

    /// Get the sleep interval as a Duration
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }

    /// Get the cycle deadline as a Duration
    #[must_use]
    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.scheduler.cycle_deadline_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig {
                interval_secs: 600,
                cycle_deadline_secs: 120,
                prune_every_cycles: 50,
                content_mode: ContentMode::Mixed,
            },
            selection: SelectionConfig::default(),
            retry: RetryConfig {
                budget: 2,
                base_delay_ms: 1000,
                max_delay_ms: 30_000,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                retention_days: 30,
            },
            destination: DestinationConfig {
                page_id: String::new(),
                label: None,
            },
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            recency_half_life_hours: 12.0,
            recency_weight: 1.0,
            quality_weight: 1.0,
            min_text_len: 50,
            media_bonus: 0.5,
            diversity_window: 5,
            diversity_penalty: 0.3,
            blocked_keywords: vec![
                "death".into(),
                "accident".into(),
                "murder".into(),
                "suicide".into(),
            ],
            blocked_penalty: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.destination.page_id = "page-123".into();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_page_id_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("page_id"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = valid_config();
        config.scheduler.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let mut config = valid_config();
        config.scheduler.cycle_deadline_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let config = valid_config();
        assert_eq!(config.interval(), Duration::from_secs(600));
        assert_eq!(config.cycle_deadline(), Duration::from_secs(120));
    }

    #[test]
    fn test_content_mode_parse() {
        assert_eq!(ContentMode::parse("mixed"), Some(ContentMode::Mixed));
        assert_eq!(ContentMode::parse("news-only"), Some(ContentMode::NewsOnly));
        assert_eq!(ContentMode::parse("social"), Some(ContentMode::SocialOnly));
        assert_eq!(ContentMode::parse("bogus"), None);
    }

    #[test]
    fn test_storage_paths() {
        let config = valid_config();
        assert!(config.storage.posted_path().ends_with("posted.json"));
        assert!(config.storage.stats_path().ends_with("stats.json"));
    }
}
