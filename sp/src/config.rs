//! Study plan generator configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hard ceiling on pipeline-level regenerations, whatever the config says
pub const MAX_REGENERATIONS: u32 = 3;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM endpoint configuration
    pub llm: LlmConfig,

    /// Transport retry policy
    pub retry: RetryConfig,

    /// Pipeline-level settings
    pub generation: GenerationSettings,

    /// Debug artifact storage
    pub artifacts: ArtifactsConfig,

    /// Plan and session storage
    pub storage: StorageConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .studyplan.yml
        let local_config = PathBuf::from(".studyplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/studyplan/studyplan.yml
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => [Some(PathBuf::from(".studyplan.yml")), user_config_path()]
                .into_iter()
                .flatten()
                .collect(),
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Number of LLM rounds the pipeline may spend on one request
    pub fn generation_rounds(&self) -> u32 {
        1 + self.generation.max_regenerations.min(MAX_REGENERATIONS)
    }

    /// Longest a single request can legitimately stay `generating`
    ///
    /// Every round may use all transport attempts at the full timeout plus the
    /// maximum backoff between them. A minute of slack covers extraction,
    /// validation and storage.
    pub fn generation_budget(&self) -> Duration {
        let attempts = self.retry.max_attempts.max(1);
        let per_round = Duration::from_millis(self.llm.timeout_ms) * attempts
            + Duration::from_millis(self.retry.max_backoff_ms) * (attempts - 1);
        per_round * self.generation_rounds() + Duration::from_secs(60)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("studyplan").join("studyplan.yml"))
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyplan")
}

/// LLM endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Per-attempt request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.7,
            max_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Transport retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per LLM call, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Jitter as a fraction of the computed delay (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            jitter: 0.25,
        }
    }
}

/// Pipeline-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Full regenerations allowed after extraction or validation failure
    #[serde(rename = "max-regenerations")]
    pub max_regenerations: u32,

    /// Interval between progress estimate updates
    #[serde(rename = "progress-tick-ms")]
    pub progress_tick_ms: u64,

    /// Typical end-to-end duration, used to shape the progress curve
    #[serde(rename = "expected-duration-ms")]
    pub expected_duration_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_regenerations: 1,
            progress_tick_ms: 500,
            expected_duration_ms: 60_000,
        }
    }
}

/// Debug artifact storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Operator-visible directory for prompt/response/error files
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: data_dir().join("debug"),
        }
    }
}

/// Plan and session storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding accepted plans
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,

    /// Directory of persisted generation snapshots, one file per session
    #[serde(rename = "session-dir")]
    pub session_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = data_dir();
        Self {
            db_path: base.join("plans.db"),
            session_dir: base.join("sessions"),
        }
    }
}
