//! Client configuration shared by the browser app and the CLI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::present::DEFAULT_FRACTAL_DECIMALS;

/// Errors from [`ClientConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `base_url` is empty or whitespace.
    #[error("base_url must not be empty")]
    EmptyBaseUrl,

    /// `base_url` does not start with `http://` or `https://`.
    #[error("base_url must be an http(s) URL, got {0:?}")]
    UnsupportedScheme(String),

    /// `poll_interval_ms` is zero.
    #[error("poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
}

/// How the client reaches the analysis backend and paces its polling.
///
/// Every field falls back to its default when missing from a serialized
/// config, so `{}` is a valid `--config-json` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin of the backend, without a trailing path.
    pub base_url: String,

    /// Delay between the end of one progress request and the start of
    /// the next.
    pub poll_interval_ms: u64,

    /// Per-request timeout. Not enforced in the browser, where the
    /// fetch API has no timeout of its own.
    pub request_timeout_secs: u64,

    /// Stop polling after this many requests. `None` polls until the
    /// task reaches a terminal phase.
    pub max_polls: Option<u32>,

    /// Decimal places shown for the fractal dimension.
    pub fractal_decimals: usize,
}

impl ClientConfig {
    /// Default backend origin (the backend binds loopback port 8080).
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:8080";
    /// Default delay between progress polls.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// A default config pointing at `base_url`.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// [`poll_interval_ms`](Self::poll_interval_ms) as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// [`request_timeout_secs`](Self::request_timeout_secs) as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `base_url` without trailing slashes, ready for path joining.
    #[must_use]
    pub fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Check the config for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base();
        if base.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::UnsupportedScheme(base.to_owned()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_polls: None,
            fractal_decimals: DEFAULT_FRACTAL_DECIMALS,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.fractal_decimals, 4);
        assert!(config.max_polls.is_none());
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "http://lab:9000/", "max_polls": 5}"#).unwrap();
        assert_eq!(config.base(), "http://lab:9000");
        assert_eq!(config.max_polls, Some(5));
        assert_eq!(config.poll_interval_ms, ClientConfig::DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn rejects_empty_base_url() {
        let config = ClientConfig::with_base_url("  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyBaseUrl));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = ClientConfig::with_base_url("ftp://example.com");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }
}
