//! Poller configuration, read from environment variables.
//!
//! Durations are whole seconds. Required keys have no fallback; everything
//! else falls back to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use designmail_observability::{LogConfig, LogFormat};

use crate::reconcile::BackoffPolicy;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LOOKBACK_SECS: u64 = 600;
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 60;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 1800;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SMTP_PORT: u16 = 587;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Connection settings for the order source API.
#[derive(Clone, PartialEq, Eq)]
pub struct OrderSourceConfig {
    pub url: String,
    pub api_key: String,
    pub user_agent: String,
}

impl core::fmt::Debug for OrderSourceConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderSourceConfig")
            .field("url", &self.url)
            .field("api_key", &REDACTED)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// SMTP relay and envelope settings.
#[derive(Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl core::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub order_source: OrderSourceConfig,
    pub mail: MailConfig,
    pub database_url: String,
    pub poll_interval: Duration,
    pub lookback: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Deadline applied to each outbound call.
    pub call_timeout: Duration,
    pub log: LogConfig,
}

impl core::fmt::Debug for PollerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PollerConfig")
            .field("order_source", &self.order_source)
            .field("mail", &self.mail)
            .field("database_url", &REDACTED)
            .field("poll_interval", &self.poll_interval)
            .field("lookback", &self.lookback)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_max", &self.backoff_max)
            .field("call_timeout", &self.call_timeout)
            .field("log", &self.log)
            .finish()
    }
}

impl PollerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let secs = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            let value = match get(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map_err(|e| ConfigError::invalid(key, format!("{raw:?}: {e}")))?,
                None => default,
            };
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be greater than zero"));
            }
            Ok(Duration::from_secs(value))
        };

        let order_source = OrderSourceConfig {
            url: required("ORDERS_API_URL")?,
            api_key: required("ORDERS_API_KEY")?,
            user_agent: get("ORDERS_USER_AGENT")
                .unwrap_or_else(|| format!("designmail-poller/{}", env!("CARGO_PKG_VERSION"))),
        };

        let port = match get("SMTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("SMTP_PORT", format!("{raw:?}: {e}")))?,
            None => DEFAULT_SMTP_PORT,
        };
        let mail = MailConfig {
            host: required("SMTP_HOST")?,
            port,
            username: required("SMTP_USER")?,
            password: required("SMTP_PASS")?,
            from: required("MAIL_FROM")?,
            to: required("MAIL_TO")?,
        };

        let backoff_base = secs("BACKOFF_BASE_SECS", DEFAULT_BACKOFF_BASE_SECS)?;
        let backoff_max = secs("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS)?;
        if backoff_max < backoff_base {
            return Err(ConfigError::invalid(
                "BACKOFF_MAX_SECS",
                "must not be less than BACKOFF_BASE_SECS",
            ));
        }

        let format = match get("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("LOG_FORMAT", e.to_string()))?,
            None => LogFormat::default(),
        };
        let log = LogConfig {
            format,
            log_dir: get("LOG_DIR").map(PathBuf::from),
            default_filter: None,
        };

        Ok(Self {
            order_source,
            mail,
            database_url: required("DATABASE_URL")?,
            poll_interval: secs("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            lookback: secs("LOOKBACK_SECS", DEFAULT_LOOKBACK_SECS)?,
            backoff_base,
            backoff_max,
            call_timeout: secs("CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS)?,
            log,
        })
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            poll_interval: self.poll_interval,
            base_delay: self.backoff_base,
            max_delay: self.backoff_max,
        }
    }
}
