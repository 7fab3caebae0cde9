// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::errors::ConfigError;
use crate::queue::DEFAULT_MAX_ITEMS;
use crate::transport::TransportKind;

pub const DEFAULT_ENDPOINT: &str = "https://ingest.logengine.dev/api/v1/entries";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

const API_KEY_ENV: &str = "LOGENGINE_API_KEY";

/// Agent settings. Built once at startup and shared as `Arc<Config>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    api_key: String,
    endpoint: String,
    enabled: bool,
    max_items: usize,
    transport: TransportKind,
    timeout: Duration,
    proxy_https: Option<String>,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Config {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            enabled: true,
            max_items: DEFAULT_MAX_ITEMS,
            transport: TransportKind::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            proxy_https: None,
        }
    }

    /// Reads the `LOGENGINE_*` environment variables. Only the API key is
    /// mandatory; malformed optional values fall back to their defaults.
    pub fn from_env() -> Result<Config, ConfigError> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))?;

        let mut config = Config::new(api_key);

        if let Ok(endpoint) = env::var("LOGENGINE_URL") {
            if !endpoint.is_empty() {
                config.endpoint = endpoint;
            }
        }

        if let Ok(enabled) = env::var("LOGENGINE_ENABLED") {
            config.enabled = match enabled.to_lowercase().as_str() {
                "false" | "0" | "off" | "no" => false,
                "true" | "1" | "on" | "yes" | "" => true,
                other => {
                    warn!("Invalid LOGENGINE_ENABLED value {other:?}, keeping the agent enabled");
                    true
                }
            };
        }

        if let Ok(max_items) = env::var("LOGENGINE_MAX_ITEMS") {
            match max_items.parse::<usize>() {
                Ok(max_items) => config.max_items = max_items,
                Err(e) => warn!(
                    "Invalid LOGENGINE_MAX_ITEMS value {max_items:?} ({e}), using {DEFAULT_MAX_ITEMS}"
                ),
            }
        }

        if let Ok(transport) = env::var("LOGENGINE_TRANSPORT") {
            config.transport = TransportKind::parse(&transport);
        }

        if let Ok(timeout) = env::var("LOGENGINE_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(e) => warn!(
                    "Invalid LOGENGINE_TIMEOUT value {timeout:?} ({e}), using {DEFAULT_TIMEOUT_SECS}s"
                ),
            }
        }

        config.proxy_https = env::var("LOGENGINE_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok()
            .filter(|proxy| !proxy.is_empty());

        Ok(config)
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_proxy_https(mut self, proxy: impl Into<String>) -> Self {
        self.proxy_https = Some(proxy.into());
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Per-request timeout of the HTTP client.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn proxy_https(&self) -> Option<&str> {
        self.proxy_https.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serial_test::serial;
    use std::env;
    use std::time::Duration;

    use super::*;

    const ALL_VARS: [&str; 8] = [
        "LOGENGINE_API_KEY",
        "LOGENGINE_URL",
        "LOGENGINE_ENABLED",
        "LOGENGINE_MAX_ITEMS",
        "LOGENGINE_TRANSPORT",
        "LOGENGINE_TIMEOUT",
        "LOGENGINE_PROXY_HTTPS",
        "HTTPS_PROXY",
    ];

    fn reset_env() {
        for var in ALL_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_builder_defaults() {
        let config = Config::new("example-key");

        assert_eq!(config.api_key(), "example-key");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert!(config.is_enabled());
        assert_eq!(config.max_items(), 100);
        assert_eq!(config.transport(), TransportKind::Sync);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.proxy_https().is_none());
    }

    #[test]
    fn test_builder_setters() {
        let config = Config::new("example-key")
            .with_enabled(false)
            .with_max_items(150)
            .with_transport(TransportKind::Async)
            .with_endpoint("http://127.0.0.1:3333/ingest")
            .with_timeout(Duration::from_millis(250))
            .with_proxy_https("https://proxy:3128");

        assert!(!config.is_enabled());
        assert_eq!(config.max_items(), 150);
        assert_eq!(config.transport(), TransportKind::Async);
        assert_eq!(config.endpoint(), "http://127.0.0.1:3333/ingest");
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.proxy_https(), Some("https://proxy:3128"));
    }

    #[test]
    #[serial]
    fn test_error_if_no_api_key_env_var() {
        reset_env();
        let config = Config::from_env();
        assert_eq!(
            config.unwrap_err().to_string(),
            "LOGENGINE_API_KEY environment variable is not set"
        );
    }

    #[test]
    #[serial]
    fn test_error_if_api_key_is_empty() {
        reset_env();
        env::set_var("LOGENGINE_API_KEY", "");
        assert!(Config::from_env().is_err());
        reset_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        reset_env();
        env::set_var("LOGENGINE_API_KEY", "_not_a_real_key_");

        let config = Config::from_env().unwrap();
        assert_eq!(config, Config::new("_not_a_real_key_"));
        reset_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        reset_env();
        env::set_var("LOGENGINE_API_KEY", "_not_a_real_key_");
        env::set_var("LOGENGINE_URL", "http://127.0.0.1:3333/ingest");
        env::set_var("LOGENGINE_ENABLED", "false");
        env::set_var("LOGENGINE_MAX_ITEMS", "250");
        env::set_var("LOGENGINE_TRANSPORT", "async");
        env::set_var("LOGENGINE_TIMEOUT", "2");
        env::set_var("HTTPS_PROXY", "https://proxy:3128");

        let config = Config::from_env().unwrap();
        assert_eq!(config.endpoint(), "http://127.0.0.1:3333/ingest");
        assert!(!config.is_enabled());
        assert_eq!(config.max_items(), 250);
        assert_eq!(config.transport(), TransportKind::Async);
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.proxy_https(), Some("https://proxy:3128"));
        reset_env();
    }

    #[test]
    #[serial]
    fn test_invalid_optional_values_fall_back() {
        reset_env();
        env::set_var("LOGENGINE_API_KEY", "_not_a_real_key_");
        env::set_var("LOGENGINE_ENABLED", "maybe");
        env::set_var("LOGENGINE_MAX_ITEMS", "-3");
        env::set_var("LOGENGINE_TIMEOUT", "soon");
        env::set_var("LOGENGINE_TRANSPORT", "carrier-pigeon");

        let config = Config::from_env().unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.max_items(), DEFAULT_MAX_ITEMS);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.transport(), TransportKind::Sync);
        reset_env();
    }

    #[test]
    #[serial]
    fn test_dedicated_proxy_wins_over_https_proxy() {
        reset_env();
        env::set_var("LOGENGINE_API_KEY", "_not_a_real_key_");
        env::set_var("LOGENGINE_PROXY_HTTPS", "https://dedicated:3128");
        env::set_var("HTTPS_PROXY", "https://generic:3128");

        let config = Config::from_env().unwrap();
        assert_eq!(config.proxy_https(), Some("https://dedicated:3128"));
        reset_env();
    }
}
