use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconcile::merge::ReconcileConfig;
use crate::scoring::engine::ScoringConfig;

// =============================================================================
// Time and cost constants
// =============================================================================

/// Default enrichment cache time-to-live in milliseconds (7 days)
pub const DEFAULT_CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Timeout for scraping fetch operations in milliseconds (10 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 10_000;

/// Timeout for paid analysis calls in milliseconds (30 seconds)
pub const ANALYSIS_TIMEOUT_MS: u64 = 30_000;

/// Estimated cost of one paid analysis call, in dollars
pub const DEFAULT_COST_PER_CALL: f64 = 0.0008;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level tracker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub cache: CacheConfig,
    pub thresholds: QualityThresholds,
    pub scoring: ScoringConfig,
    pub reconcile: ReconcileConfig,
    pub analysis: AnalysisConfig,
}

impl TrackerConfig {
    /// Load configuration from a JSON file; a missing path yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            _ => Self::default(),
        };

        config
            .scoring
            .weights
            .validate()
            .map_err(ConfigError::Invalid)?;

        Ok(config)
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Enrichment cache time-to-live in milliseconds
    pub ttl_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

/// Candidate quality gates and the catalog size cap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_buzz_score: f64,
    pub min_vision: f64,
    pub min_ability: f64,
    pub confidence_threshold: u8,
    pub min_name_length: usize,
    pub max_tools: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_buzz_score: 40.0,
            min_vision: 40.0,
            min_ability: 40.0,
            confidence_threshold: 70,
            min_name_length: 3,
            max_tools: 150,
        }
    }
}

/// Paid analysis endpoint configuration. The credential comes from the
/// environment, never from the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_ms: u64,
    /// Estimated cost of one call, used for cost accounting.
    pub cost_per_call: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "sonar".to_string(),
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
            timeout_ms: ANALYSIS_TIMEOUT_MS,
            cost_per_call: DEFAULT_COST_PER_CALL,
        }
    }
}

/// Returns the path to the data directory for toolradar.
/// Uses $XDG_DATA_HOME/toolradar if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/toolradar,
/// or ./toolradar if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the enrichment cache database.
pub fn db_path() -> PathBuf {
    data_dir().join("enrichment.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("toolradar.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("toolradar")
}
