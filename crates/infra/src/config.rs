//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - HS256 secret used to verify bearer tokens
//!
//! ## Optional
//! - `MERCATO_ENV` - Deployment environment label (default: development)
//! - `MERCATO_BIND_ADDR` - Listen address (default: 0.0.0.0:8080)
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory stores when unset
//! - `REQUEST_TIMEOUT_MS` - Per-request deadline in milliseconds (default: 10000)
//! - `LOG_FORMAT` - `json` or `pretty` (default: json)
//!
//! ## Optional (email, all-or-nothing)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//! - `SMTP_PORT` - SMTP port (default: 587)
//!
//! ## Optional (SMS gateway, all-or-nothing)
//! - `SMS_API_URL`, `SMS_API_KEY`, `SMS_USERNAME`
//!
//! ## Optional (staff order alerts)
//! - `ORDER_ALERT_PHONES` - Comma-separated phone numbers
//! - `ORDER_ALERT_SENDER_ID` - SMS sender id (required when phones are set)

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use mercato_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory stores.
    pub database_url: Option<SecretString>,
    pub jwt_secret: SecretString,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub email: Option<EmailConfig>,
    pub sms: Option<SmsConfig>,
    pub order_alert: Option<OrderAlertConfig>,
}

/// SMTP settings for the confirmation email channel.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// HTTP SMS gateway settings.
#[derive(Clone)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: SecretString,
    pub username: String,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

/// Staff SMS alert recipients for new orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAlertConfig {
    pub recipients: Vec<String>,
    pub sender_id: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let bind_addr = env
            .or_default("MERCATO_BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MERCATO_BIND_ADDR".to_string(), e.to_string()))?;

        let request_timeout_ms = match env.optional("REQUEST_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "REQUEST_TIMEOUT_MS".to_string(),
                        format!("expected a positive integer, got {raw:?}"),
                    )
                })?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        let log_format = match env.optional("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::InvalidEnvVar("LOG_FORMAT".to_string(), e.to_string()))?,
            None => LogFormat::default(),
        };

        let jwt_secret = SecretString::from(env.required("JWT_SECRET")?);
        if jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_SECRET".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            environment: env.or_default("MERCATO_ENV", "development"),
            bind_addr,
            database_url: env.optional("DATABASE_URL").map(SecretString::from),
            jwt_secret,
            request_timeout: Duration::from_millis(request_timeout_ms),
            log_format,
            email: EmailConfig::from_env(&env)?,
            sms: SmsConfig::from_env(&env)?,
            order_alert: OrderAlertConfig::from_env(&env)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl EmailConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Option<Self>, ConfigError> {
        let host = env.optional("SMTP_HOST");
        let username = env.optional("SMTP_USERNAME");
        let password = env.optional("SMTP_PASSWORD");
        let from = env.optional("SMTP_FROM");

        match (host, username, password, from) {
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from_address)) => {
                let smtp_port = match env.optional("SMTP_PORT") {
                    Some(raw) => raw
                        .parse::<u16>()
                        .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?,
                    None => DEFAULT_SMTP_PORT,
                };
                Ok(Some(Self {
                    smtp_host,
                    smtp_port,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together".to_string(),
            )),
        }
    }
}

impl SmsConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Option<Self>, ConfigError> {
        let url = env.optional("SMS_API_URL");
        let key = env.optional("SMS_API_KEY");
        let username = env.optional("SMS_USERNAME");

        match (url, key, username) {
            (Some(api_url), Some(key), Some(username)) => Ok(Some(Self {
                api_url,
                api_key: SecretString::from(key),
                username,
            })),
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMS_*".to_string(),
                "SMS_API_URL, SMS_API_KEY and SMS_USERNAME must be set together".to_string(),
            )),
        }
    }
}

impl OrderAlertConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Option<Self>, ConfigError> {
        let recipients: Vec<String> = env
            .optional("ORDER_ALERT_PHONES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if recipients.is_empty() {
            return Ok(None);
        }

        let sender_id = env.required("ORDER_ALERT_SENDER_ID")?;
        Ok(Some(Self {
            recipients,
            sender_id,
        }))
    }
}

/// Key lookup with the "blank means unset" convention.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}
