/// Client configuration
///
/// Layered with the `config` crate, later layers winning:
///
/// 1. Built-in defaults
/// 2. `taskboard-client.toml` in the working directory (optional)
/// 3. `TASKBOARD_*` environment variables
///
/// | Key                  | Env var                        | Default                 |
/// |----------------------|--------------------------------|-------------------------|
/// | `api_url`            | `TASKBOARD_API_URL`            | `http://127.0.0.1:8080` |
/// | `email`              | `TASKBOARD_EMAIL`              | (none)                  |
/// | `password`           | `TASKBOARD_PASSWORD`           | (none)                  |
/// | `poll_interval_secs` | `TASKBOARD_POLL_INTERVAL_SECS` | `60`                    |
///
/// Poll intervals below [`MIN_POLL_INTERVAL`] are raised to it.

use crate::error::ClientError;
use crate::refresher::{clamp_interval, MIN_POLL_INTERVAL};
use config::{Config as ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "taskboard-client.toml";

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    api_url: String,
    email: Option<String>,
    password: Option<String>,
    poll_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing slash
    pub api_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Loads from [`DEFAULT_CONFIG_FILE`] and the environment
    pub fn load() -> Result<Self, ClientError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let raw: RawConfig = ConfigBuilder::builder()
            .set_default("api_url", "http://127.0.0.1:8080")?
            .set_default("poll_interval_secs", MIN_POLL_INTERVAL.as_secs())?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("TASKBOARD").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let requested = Duration::from_secs(raw.poll_interval_secs);
        let poll_interval = clamp_interval(requested);
        if poll_interval != requested {
            tracing::warn!(
                requested_secs = raw.poll_interval_secs,
                applied_secs = poll_interval.as_secs(),
                "Poll interval below minimum, raised"
            );
        }

        Self {
            api_url: raw.api_url.trim_end_matches('/').to_string(),
            email: raw.email,
            password: raw.password,
            poll_interval,
        }
    }

    /// Email and password, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(poll_interval_secs: u64) -> RawConfig {
        RawConfig {
            api_url: "http://localhost:8080/".to_string(),
            email: Some("ana@school.test".to_string()),
            password: None,
            poll_interval_secs,
        }
    }

    #[test]
    fn test_short_interval_is_raised() {
        let config = ClientConfig::from_raw(raw(5));
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_longer_interval_is_kept() {
        let config = ClientConfig::from_raw(raw(300));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::from_raw(raw(60));
        assert_eq!(config.api_url, "http://localhost:8080");
    }

    #[test]
    fn test_credentials_require_both() {
        let mut config = ClientConfig::from_raw(raw(60));
        assert!(config.credentials().is_none());

        config.password = Some("secret".to_string());
        assert_eq!(config.credentials(), Some(("ana@school.test", "secret")));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ClientConfig::load_from("does-not-exist.toml").unwrap();
        assert!(config.poll_interval >= MIN_POLL_INTERVAL);
        assert!(!config.api_url.ends_with('/'));
    }
}
