//! TradeStation client configuration, loaded from environment variables.

use std::time::Duration;

use reqwest::Url;

/// Default OAuth host.
pub const DEFAULT_BASE_URL: &str = "https://signin.tradestation.com";

/// Default v3 API root.
pub const DEFAULT_API_URL: &str = "https://api.tradestation.com/v3";

/// OAuth client credentials and the long-lived refresh token.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    refresh_token: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// OAuth client id.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// OAuth client secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Streaming connection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Records buffered between the connection task and the consumer.
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            channel_capacity: 1_024,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct TradeStationConfig {
    /// OAuth credentials.
    pub credentials: Credentials,
    /// Brokerage account orders and account queries are scoped to.
    pub account_id: String,
    /// OAuth host (token endpoint lives at `{base_url}/oauth/token`).
    pub base_url: String,
    /// API root for market data, orders and accounts.
    pub api_url: String,
    /// Timeout for REST requests. Streams are not subject to it.
    pub timeout: Duration,
    /// How long an access token is reused before refreshing.
    pub token_freshness: Duration,
    /// Streaming settings.
    pub stream: StreamSettings,
}

impl TradeStationConfig {
    /// Configuration with default endpoints and timings.
    #[must_use]
    pub fn new(credentials: Credentials, account_id: impl Into<String>) -> Self {
        Self {
            credentials,
            account_id: account_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            token_freshness: Duration::from_secs(600),
            stream: StreamSettings::default(),
        }
    }

    /// Override the OAuth host.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_url(url.into());
        self
    }

    /// Override the API root.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = trim_url(url.into());
        self
    }

    /// Set the REST request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the token freshness window.
    #[must_use]
    pub const fn with_token_freshness(mut self, window: Duration) -> Self {
        self.token_freshness = window;
        self
    }

    /// Set streaming settings.
    #[must_use]
    pub fn with_stream(mut self, stream: StreamSettings) -> Self {
        self.stream = stream;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or values are invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let credentials = Credentials::new(
            required("TS_API_KEY")?,
            required("TS_API_SECRET")?,
            required("TS_REFRESH_TOKEN")?,
        );
        let defaults = Self::new(credentials, required("TS_ACCOUNT_ID")?);
        let stream_defaults = StreamSettings::default();

        let config = Self {
            base_url: lookup("TS_BASE_URL").map_or(defaults.base_url.clone(), trim_url),
            api_url: lookup("TS_API_URL").map_or(defaults.api_url.clone(), trim_url),
            timeout: parse_duration_secs(&lookup, "TS_HTTP_TIMEOUT_SECS", defaults.timeout),
            token_freshness: parse_duration_secs(
                &lookup,
                "TS_TOKEN_FRESHNESS_SECS",
                defaults.token_freshness,
            ),
            stream: StreamSettings {
                reconnect_delay_initial: parse_duration_millis(
                    &lookup,
                    "TS_STREAM_RECONNECT_DELAY_INITIAL_MS",
                    stream_defaults.reconnect_delay_initial,
                ),
                reconnect_delay_max: parse_duration_secs(
                    &lookup,
                    "TS_STREAM_RECONNECT_DELAY_MAX_SECS",
                    stream_defaults.reconnect_delay_max,
                ),
                reconnect_delay_multiplier: lookup("TS_STREAM_RECONNECT_DELAY_MULTIPLIER")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(stream_defaults.reconnect_delay_multiplier),
                channel_capacity: stream_defaults.channel_capacity,
            },
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Check credentials are present and endpoints are absolute http(s) URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_empty = [
            ("TS_API_KEY", self.credentials.api_key()),
            ("TS_API_SECRET", self.credentials.api_secret()),
            ("TS_REFRESH_TOKEN", self.credentials.refresh_token()),
            ("TS_ACCOUNT_ID", self.account_id.as_str()),
        ];
        for (name, value) in non_empty {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyValue(name.to_string()));
            }
        }

        for (name, value) in [("TS_BASE_URL", &self.base_url), ("TS_API_URL", &self.api_url)] {
            let absolute = Url::parse(value)
                .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host());
            if !absolute {
                return Err(ConfigError::InvalidUrl {
                    name: name.to_string(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    /// Absolute API URL for `path` (which must start with `/`).
    #[must_use]
    pub fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// URL is not an absolute http(s) URL.
    #[error("{name} must be an absolute http(s) URL, got {value:?}")]
    InvalidUrl {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },
}

fn trim_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
