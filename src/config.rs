//! Configuration types for datagen-client

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Environment variable holding the service root URL
pub const ENV_BASE_URL: &str = "DATAGEN_BASE_URL";
/// Environment variable overriding the poll interval (milliseconds)
pub const ENV_POLL_INTERVAL_MS: &str = "DATAGEN_POLL_INTERVAL_MS";
/// Environment variable overriding the number of preview lines
pub const ENV_PREVIEW_LINES: &str = "DATAGEN_PREVIEW_LINES";
/// Environment variable overriding the artifact download directory
pub const ENV_DOWNLOAD_DIR: &str = "DATAGEN_DOWNLOAD_DIR";

/// Generation service connection settings
///
/// `base_url` is the one place the service root is configured. Every request issuer and the
/// download link resolver derive their URLs from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service root (e.g. `https://datagen.example.com` or `http://127.0.0.1:8000`)
    pub base_url: Url,

    /// Transport-level timeout for every request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ServiceConfig {
    /// Create service settings for the given root with default timeout and user agent
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Status polling and preview settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between two status polls (default: 3 seconds)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub interval: Duration,

    /// Delay between completion and the preview fetch (default: 600 ms)
    ///
    /// Gives the backend time to flush the artifact before the preview reads it.
    #[serde(default = "default_preview_settle_delay", with = "duration_ms_serde")]
    pub preview_settle_delay: Duration,

    /// Number of records requested from `/preview` (default: 8)
    #[serde(default = "default_preview_lines")]
    pub preview_lines: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            preview_settle_delay: default_preview_settle_delay(),
            preview_lines: default_preview_lines(),
        }
    }
}

/// Retry configuration for transient failures
///
/// The default performs a single attempt per request (fail fast). Raising `max_attempts`
/// enables exponential backoff for transient network and 5xx/429 failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// File collision handling strategy for downloaded artifacts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Refuse to download, keep existing
    Skip,
}

/// Local artifact download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory artifacts are written to (default: "./datasets")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// What to do when the destination file already exists
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// Main configuration for JobController
///
/// Fields are organized into logical sub-configs:
/// - [`service`](ServiceConfig) - service root, timeouts
/// - [`polling`](PollingConfig) - poll cadence, preview settle delay and size
/// - [`retry`](RetryConfig) - optional backoff for transient failures
/// - [`download`](DownloadConfig) - where artifacts land on disk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Generation service connection settings
    pub service: ServiceConfig,

    /// Status polling and preview settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,

    /// Artifact download settings
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Config {
    /// Create a configuration for the given service root with defaults everywhere else
    pub fn new(base_url: Url) -> Self {
        Self {
            service: ServiceConfig::new(base_url),
            polling: PollingConfig::default(),
            retry: RetryConfig::default(),
            download: DownloadConfig::default(),
        }
    }

    /// Build a configuration from environment variables
    ///
    /// Required:
    /// - `DATAGEN_BASE_URL` - service root
    ///
    /// Optional:
    /// - `DATAGEN_POLL_INTERVAL_MS` - poll interval in milliseconds
    /// - `DATAGEN_PREVIEW_LINES` - preview size
    /// - `DATAGEN_DOWNLOAD_DIR` - artifact directory
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or any value fails to parse
    /// or validate.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(ENV_BASE_URL)
            .map_err(|_| Error::config(ENV_BASE_URL, format!("{ENV_BASE_URL} not set")))?;
        let base_url = Url::parse(raw.trim())
            .map_err(|e| Error::config(ENV_BASE_URL, format!("invalid URL {raw:?}: {e}")))?;

        let mut config = Config::new(base_url);

        if let Ok(value) = std::env::var(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = value.trim().parse().map_err(|_| {
                Error::config(
                    ENV_POLL_INTERVAL_MS,
                    format!("expected milliseconds, got {value:?}"),
                )
            })?;
            config.polling.interval = Duration::from_millis(ms);
        }

        if let Ok(value) = std::env::var(ENV_PREVIEW_LINES) {
            config.polling.preview_lines = value.trim().parse().map_err(|_| {
                Error::config(
                    ENV_PREVIEW_LINES,
                    format!("expected a number, got {value:?}"),
                )
            })?;
        }

        if let Ok(value) = std::env::var(ENV_DOWNLOAD_DIR) {
            config.download.download_dir = PathBuf::from(value);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the controller cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        match self.service.base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::config(
                    "base_url",
                    format!("unsupported scheme {other:?}, expected http or https"),
                ));
            }
        }
        if self.service.base_url.cannot_be_a_base() {
            return Err(Error::config("base_url", "URL cannot be used as a base"));
        }
        if self.service.request_timeout.is_zero() {
            return Err(Error::config("request_timeout", "must be greater than zero"));
        }
        if self.polling.interval.is_zero() {
            return Err(Error::config("interval", "must be greater than zero"));
        }
        if self.polling.preview_lines == 0 {
            return Err(Error::config("preview_lines", "must be at least 1"));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            return Err(Error::config(
                "backoff_multiplier",
                format!("must be between 1.0 and {MAX_BACKOFF_MULTIPLIER}, got {multiplier}"),
            ));
        }
        if self.retry.max_delay > MAX_RETRY_DELAY {
            return Err(Error::config(
                "max_delay",
                format!("must be at most {}s", MAX_RETRY_DELAY.as_secs()),
            ));
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(Error::config("initial_delay", "must not exceed max_delay"));
        }
        Ok(())
    }
}

/// Largest accepted `retry.backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// Largest accepted `retry.max_delay`
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("datagen-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_preview_settle_delay() -> Duration {
    Duration::from_millis(600)
}

fn default_preview_lines() -> u32 {
    8
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./datasets")
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8000").unwrap()
    }

    fn clear_env() {
        // SAFETY: env mutation is confined to #[serial] tests
        unsafe {
            std::env::remove_var(ENV_BASE_URL);
            std::env::remove_var(ENV_POLL_INTERVAL_MS);
            std::env::remove_var(ENV_PREVIEW_LINES);
            std::env::remove_var(ENV_DOWNLOAD_DIR);
        }
    }

    #[test]
    fn defaults_match_web_client_behavior() {
        let config = Config::new(base());

        assert_eq!(config.polling.interval, Duration::from_secs(3));
        assert_eq!(config.polling.preview_settle_delay, Duration::from_millis(600));
        assert_eq!(config.polling.preview_lines, 8);
        assert_eq!(config.service.request_timeout, Duration::from_secs(30));
        assert_eq!(
            config.retry.max_attempts, 0,
            "requests must be single-attempt unless retries are explicitly enabled"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn minimal_json_fills_in_defaults() {
        let json = r#"{"service":{"base_url":"https://datagen.example.com"}}"#;
        let config: Config = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.service.base_url.as_str(), "https://datagen.example.com/");
        assert_eq!(config.polling.interval, Duration::from_secs(3));
        assert_eq!(config.download.file_collision, FileCollisionAction::Rename);
    }

    #[test]
    fn missing_base_url_is_rejected() {
        let result = serde_json::from_str::<Config>(r#"{"polling":{}}"#);
        assert!(result.is_err(), "service.base_url has no default");
    }

    #[test]
    fn polling_durations_serialize_as_milliseconds() {
        let polling = PollingConfig {
            interval: Duration::from_millis(1500),
            preview_settle_delay: Duration::from_millis(250),
            preview_lines: 3,
        };

        let json = serde_json::to_value(&polling).expect("serialize failed");
        assert_eq!(json["interval"], 1500);
        assert_eq!(json["preview_settle_delay"], 250);

        let restored: PollingConfig = serde_json::from_value(json).expect("deserialize failed");
        assert_eq!(restored.interval, Duration::from_millis(1500));
    }

    #[test]
    fn retry_durations_deserialize_from_seconds() {
        let json = r#"{"max_attempts":3,"initial_delay":2,"max_delay":20,"backoff_multiplier":2.0,"jitter":false}"#;
        let retry: RetryConfig = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay, Duration::from_secs(2));
        assert_eq!(retry.max_delay, Duration::from_secs(20));
        assert!(!retry.jitter);
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = Config::new(Url::parse("ftp://files.example.com").unwrap());
        assert!(matches!(config.validate(), Err(Error::Config { key: Some(k), .. }) if k == "base_url"));

        config = Config::new(base());
        config.polling.interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::Config { key: Some(k), .. }) if k == "interval"));

        config = Config::new(base());
        config.polling.preview_lines = 0;
        assert!(matches!(config.validate(), Err(Error::Config { key: Some(k), .. }) if k == "preview_lines"));

        config = Config::new(base());
        config.service.request_timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::Config { key: Some(k), .. }) if k == "request_timeout"));
    }

    #[test]
    fn validate_rejects_runaway_retry_backoff() {
        let rejected_key = |config: &Config| match config.validate() {
            Err(Error::Config { key, .. }) => key,
            other => panic!("expected config error, got {other:?}"),
        };

        for multiplier in [f64::NAN, f64::INFINITY, 1e308, 0.5] {
            let mut config = Config::new(base());
            config.retry.max_attempts = 3;
            config.retry.backoff_multiplier = multiplier;
            assert_eq!(
                rejected_key(&config).as_deref(),
                Some("backoff_multiplier"),
                "multiplier {multiplier} must be rejected"
            );
        }

        let mut config = Config::new(base());
        config.retry.max_delay = Duration::MAX;
        assert_eq!(rejected_key(&config).as_deref(), Some("max_delay"));

        let mut config = Config::new(base());
        config.retry.initial_delay = Duration::from_secs(60);
        config.retry.max_delay = Duration::from_secs(5);
        assert_eq!(rejected_key(&config).as_deref(), Some("initial_delay"));

        let mut config = Config::new(base());
        config.retry.backoff_multiplier = MAX_BACKOFF_MULTIPLIER;
        config.retry.max_delay = MAX_RETRY_DELAY;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn from_env_requires_base_url() {
        clear_env();

        match Config::from_env() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some(ENV_BASE_URL)),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear_env();
        // SAFETY: env mutation is confined to #[serial] tests
        unsafe {
            std::env::set_var(ENV_BASE_URL, "https://datagen.example.com/api/");
            std::env::set_var(ENV_POLL_INTERVAL_MS, "250");
            std::env::set_var(ENV_PREVIEW_LINES, "4");
            std::env::set_var(ENV_DOWNLOAD_DIR, "/tmp/datasets");
        }

        let config = Config::from_env().expect("config from env");
        clear_env();

        assert_eq!(
            config.service.base_url.as_str(),
            "https://datagen.example.com/api/"
        );
        assert_eq!(config.polling.interval, Duration::from_millis(250));
        assert_eq!(config.polling.preview_lines, 4);
        assert_eq!(config.download.download_dir, PathBuf::from("/tmp/datasets"));
    }

    #[test]
    #[serial]
    fn from_env_rejects_garbage_interval() {
        clear_env();
        // SAFETY: env mutation is confined to #[serial] tests
        unsafe {
            std::env::set_var(ENV_BASE_URL, "http://localhost:8000");
            std::env::set_var(ENV_POLL_INTERVAL_MS, "soon");
        }

        let result = Config::from_env();
        clear_env();

        match result {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some(ENV_POLL_INTERVAL_MS))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
