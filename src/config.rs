use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

pub const DEFAULT_QUIZ_LENGTH: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Where Telegram delivers updates when the bot runs behind a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    pub url: Url,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub database_url: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub quiz_length: usize,
    pub run_migrations: bool,
    pub webhook: Option<Webhook>,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => return Err(invalid("LOG_FORMAT", other)),
        };

        let quiz_length = match lookup("QUIZ_LENGTH") {
            None => DEFAULT_QUIZ_LENGTH,
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("QUIZ_LENGTH", &value)),
            },
        };

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            None => true,
            Some(value) => value
                .parse::<bool>()
                .map_err(|_| invalid("RUN_MIGRATIONS", &value))?,
        };

        let webhook_url = lookup("WEBHOOK_URL")
            .map(|value| value.parse::<Url>().map_err(|_| invalid("WEBHOOK_URL", &value)))
            .transpose()?;
        let webhook_addr = lookup("WEBHOOK_ADDR")
            .map(|value| {
                value
                    .parse::<SocketAddr>()
                    .map_err(|_| invalid("WEBHOOK_ADDR", &value))
            })
            .transpose()?;
        let webhook = match (webhook_url, webhook_addr) {
            (Some(url), Some(addr)) => Some(Webhook { url, addr }),
            _ => None,
        };

        Ok(Self {
            token: required("TELOXIDE_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_format,
            quiz_length,
            run_migrations,
            webhook,
        })
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_owned(),
    }
}
