use std::fmt::{Display, Formatter};
use std::str::FromStr;
use reqwest::Url;
use crate::config::env::*;
use crate::config::scheduler::SchedulerConfig;

const DEFAULT_WEB_ORIGIN: &str = "http://localhost:3000";

#[derive(Clone)]
#[cfg_attr(test, derive(Default))]
pub struct AppConfig {
    pub port: u16,
    pub cors_origins: CorsOrigins,
    pub session_ttl_days: u16,
    pub bot_token: Option<String>,
    pub scheduler: SchedulerConfig,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Url,
    pub max_connections: u32
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = get_env_value_or_default("PORT", 8080);
        let default_origins = get_optional_env_value("NEXT_PUBLIC_APP_URL")
            .unwrap_or_else(|| CorsOrigins::List(vec![DEFAULT_WEB_ORIGIN.to_owned()]));
        let cors_origins = get_env_value_or_default("CORS_ORIGINS", default_origins);
        let session_ttl_days = get_env_value_or_default("SESSION_TTL_DAYS", 30);
        let bot_token = get_optional_env_value("BOT_TOKEN");
        if bot_token.is_none() {
            log::warn!("BOT_TOKEN is not set: Telegram logins are not verified and notifications are disabled");
        }
        Self {
            port,
            cors_origins,
            session_ttl_days,
            bot_token,
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            url: get_env_mandatory_value("DATABASE_URL")?,
            max_connections: get_env_value_or_default("DATABASE_MAX_CONNECTIONS", 10)
        })
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("no valid origins were given")]
pub struct InvalidCorsOrigins;

impl FromStr for CorsOrigins {
    type Err = InvalidCorsOrigins;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "*" {
            return Ok(Self::Any)
        }
        let origins: Vec<String> = s.split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if origins.is_empty() {
            Err(InvalidCorsOrigins)
        } else {
            Ok(Self::List(origins))
        }
    }
}

impl Display for CorsOrigins {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CorsOrigins::Any => f.write_str("*"),
            CorsOrigins::List(origins) => f.write_str(&origins.join(",")),
        }
    }
}

impl Default for CorsOrigins {
    fn default() -> Self {
        Self::List(vec![DEFAULT_WEB_ORIGIN.to_owned()])
    }
}
