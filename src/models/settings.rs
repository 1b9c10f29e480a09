// Settings data models
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub backstop_timeout_secs: u64,
    pub result_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub completion_delay_ms: u64,
    pub error_return_delay_ms: u64,
    pub download_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: String::from(DEFAULT_SERVER_URL),
            poll_interval_ms: 2000,
            backstop_timeout_secs: 30,
            result_timeout_secs: 10,
            upload_timeout_secs: 120,
            completion_delay_ms: 1000,
            error_return_delay_ms: 3000,
            download_path: None,
        }
    }
}

/// Timing knobs for the job poller, derived from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub backstop_timeout: Duration,
    pub result_timeout: Duration,
    pub upload_timeout: Duration,
    pub completion_delay: Duration,
    pub error_return_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig::from(&Settings::default())
    }
}

impl From<&Settings> for PollerConfig {
    fn from(settings: &Settings) -> Self {
        // A zero interval would make tokio's interval panic
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            backstop_timeout: Duration::from_secs(settings.backstop_timeout_secs),
            result_timeout: Duration::from_secs(settings.result_timeout_secs),
            upload_timeout: Duration::from_secs(settings.upload_timeout_secs),
            completion_delay: Duration::from_millis(settings.completion_delay_ms),
            error_return_delay: Duration::from_millis(settings.error_return_delay_ms),
        }
    }
}
