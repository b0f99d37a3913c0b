//! Client configuration.
//!
//! [`ApiConfig`] is a value type. Every `with_*` method returns a new config,
//! so a config handed to an executor is never edited behind its back.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.example.com";
pub const DEVELOPMENT_BASE_URL: &str = "https://dev-api.example.com";
pub const PRODUCTION_BASE_URL: &str = "https://api.example.com";

/// Default timeout applied to connect, send and receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How failed requests are re-attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_secs(max_attempts: u32, delay_secs: u64) -> Self {
        Self::new(max_attempts, Duration::from_secs(delay_secs))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_secs(3, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    pub connect_timeout: Duration,
    pub receive_timeout: Duration,
    pub send_timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub auth_token: Option<String>,
    pub retry: RetryPolicy,
    pub enable_logging: bool,
    pub enable_retry: bool,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = validate_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            connect_timeout: DEFAULT_TIMEOUT,
            receive_timeout: DEFAULT_TIMEOUT,
            send_timeout: DEFAULT_TIMEOUT,
            headers: default_headers(),
            auth_token: None,
            retry: RetryPolicy::default(),
            enable_logging: true,
            enable_retry: true,
        })
    }

    /// Verbose preset for local development: long timeouts, logging, no retry.
    pub fn development() -> Self {
        Self {
            base_url: DEVELOPMENT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(60),
            receive_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(60),
            enable_logging: true,
            enable_retry: false,
            ..Self::default()
        }
    }

    /// Quiet preset for release builds: logging off, retry with a 2s delay.
    pub fn production() -> Self {
        Self {
            base_url: PRODUCTION_BASE_URL.to_string(),
            retry: RetryPolicy::from_secs(3, 2),
            enable_logging: false,
            enable_retry: true,
            ..Self::default()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upper bound for one attempt: connect + send + receive, saturating at
    /// `Duration::MAX`.
    pub fn total_timeout(&self) -> Duration {
        self.connect_timeout
            .saturating_add(self.send_timeout)
            .saturating_add(self.receive_timeout)
    }

    pub fn with_base_url(&self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = validate_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            ..self.clone()
        })
    }

    pub fn with_timeouts(&self, connect: Duration, receive: Duration, send: Duration) -> Self {
        Self {
            connect_timeout: connect,
            receive_timeout: receive,
            send_timeout: send,
            ..self.clone()
        }
    }

    pub fn with_timeouts_secs(&self, connect: u64, receive: u64, send: u64) -> Self {
        self.with_timeouts(
            Duration::from_secs(connect),
            Duration::from_secs(receive),
            Duration::from_secs(send),
        )
    }

    pub fn with_connect_timeout(&self, timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            ..self.clone()
        }
    }

    pub fn with_receive_timeout(&self, timeout: Duration) -> Self {
        Self {
            receive_timeout: timeout,
            ..self.clone()
        }
    }

    pub fn with_send_timeout(&self, timeout: Duration) -> Self {
        Self {
            send_timeout: timeout,
            ..self.clone()
        }
    }

    pub fn with_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.headers.clone();
        headers.insert(name.into(), value.into());
        Self {
            headers,
            ..self.clone()
        }
    }

    /// Merges `extra` over the current headers.
    pub fn with_headers<I, K, V>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut headers = self.headers.clone();
        headers.extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self {
            headers,
            ..self.clone()
        }
    }

    pub fn without_headers(&self) -> Self {
        Self {
            headers: BTreeMap::new(),
            ..self.clone()
        }
    }

    pub fn with_auth_token(&self, token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn without_auth_token(&self) -> Self {
        Self {
            auth_token: None,
            ..self.clone()
        }
    }

    pub fn with_retry_policy(&self, retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..self.clone()
        }
    }

    pub fn with_logging(&self, enable_logging: bool) -> Self {
        Self {
            enable_logging,
            ..self.clone()
        }
    }

    pub fn with_retry(&self, enable_retry: bool) -> Self {
        Self {
            enable_retry,
            ..self.clone()
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            receive_timeout: DEFAULT_TIMEOUT,
            send_timeout: DEFAULT_TIMEOUT,
            headers: default_headers(),
            auth_token: None,
            retry: RetryPolicy::default(),
            enable_logging: true,
            enable_retry: true,
        }
    }
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ])
}

fn validate_base_url(base_url: String) -> Result<String, ConfigError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let config = ApiConfig::new("https://example.org").unwrap();
        assert_eq!(config.base_url(), "https://example.org");
        assert_eq!(config.connect_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.receive_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.send_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.headers["Content-Type"], "application/json");
        assert_eq!(config.headers["Accept"], "application/json");
        assert!(config.auth_token.is_none());
        assert!(config.enable_logging);
        assert!(config.enable_retry);
        assert_eq!(config.retry, RetryPolicy::from_secs(3, 1));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert_eq!(ApiConfig::new(""), Err(ConfigError::EmptyBaseUrl));
        assert_eq!(ApiConfig::new("   "), Err(ConfigError::EmptyBaseUrl));
        assert_eq!(
            ApiConfig::default().with_base_url(""),
            Err(ConfigError::EmptyBaseUrl)
        );
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = ApiConfig::new("https://example.org/v1/").unwrap();
        assert_eq!(config.base_url(), "https://example.org/v1");
    }

    #[test]
    fn test_with_methods_leave_original_untouched() {
        let original = ApiConfig::default();
        let updated = original
            .with_auth_token("abc")
            .with_header("X-App", "demo")
            .with_logging(false);

        assert!(original.auth_token.is_none());
        assert!(!original.headers.contains_key("X-App"));
        assert!(original.enable_logging);

        assert_eq!(updated.auth_token.as_deref(), Some("abc"));
        assert_eq!(updated.headers["X-App"], "demo");
        assert!(!updated.enable_logging);
    }

    #[test]
    fn test_with_headers_merges() {
        let config = ApiConfig::default().with_headers([("Accept", "text/plain"), ("X-A", "1")]);
        assert_eq!(config.headers["Accept"], "text/plain");
        assert_eq!(config.headers["X-A"], "1");
        assert_eq!(config.headers["Content-Type"], "application/json");
    }

    #[test]
    fn test_presets() {
        let dev = ApiConfig::development();
        assert_eq!(dev.base_url(), DEVELOPMENT_BASE_URL);
        assert!(dev.enable_logging);
        assert!(!dev.enable_retry);
        assert_eq!(dev.receive_timeout, Duration::from_secs(60));

        let prod = ApiConfig::production();
        assert_eq!(prod.base_url(), PRODUCTION_BASE_URL);
        assert!(!prod.enable_logging);
        assert!(prod.enable_retry);
        assert_eq!(prod.retry.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_total_timeout() {
        let config = ApiConfig::default().with_timeouts_secs(5, 10, 15);
        assert_eq!(config.total_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_total_timeout_saturates() {
        let config = ApiConfig::default().with_timeouts(
            Duration::MAX,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert_eq!(config.total_timeout(), Duration::MAX);
    }

    #[test]
    fn test_without_auth_token() {
        let config = ApiConfig::default().with_auth_token("t").without_auth_token();
        assert!(config.auth_token.is_none());
    }
}
