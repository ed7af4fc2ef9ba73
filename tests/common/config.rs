//! Test configuration helpers for mock and live backends

use datagen_client::Config;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Config pointed at a mock server with timings short enough for real-time tests
pub fn mock_config(server_uri: &str, download_dir: &Path) -> Config {
    let mut config = Config::new(Url::parse(server_uri).expect("mock server URI"));
    config.polling.interval = Duration::from_millis(20);
    config.polling.preview_settle_delay = Duration::from_millis(10);
    config.service.request_timeout = Duration::from_secs(5);
    config.download.download_dir = download_dir.to_path_buf();
    config
}

/// Load the live backend configuration from the environment (and `.env`)
///
/// Required environment variables:
/// - `DATAGEN_BASE_URL` - Root of a running generation service
///
/// Optional environment variables:
/// - `DATAGEN_TEST_EMAIL` - Account used for submissions (default: anonymous)
pub fn load_live_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    if std::env::var(datagen_client::config::ENV_BASE_URL).is_err() {
        return Err(ConfigError("DATAGEN_BASE_URL not set in environment".to_string()));
    }
    Config::from_env().map_err(|e| ConfigError(e.to_string()))
}

/// Account email for live tests
pub fn live_email() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("DATAGEN_TEST_EMAIL").ok()
}

/// Check whether a live backend is configured
pub fn has_live_backend() -> bool {
    load_live_config().is_ok()
}
