use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use chrono::NaiveTime;
use reqwest::Url;
use crate::config::env::*;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub run_at: RunAt,
    pub delay: Duration,
    pub parser_url: Option<Url>,
    pub request_timeout: Duration,
}

/// Daily start time of the polling batch, in UTC.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunAt(pub NaiveTime);

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("expected a time in the HH:MM format")]
pub struct InvalidRunAt;

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let parser_url = get_optional_env_value("PYTHON_API_URL");
        let enabled = get_env_value_or_default("SCHEDULER_ENABLED", true);
        if enabled && parser_url.is_none() {
            log::warn!("PYTHON_API_URL is not set, the scheduler won't be started");
        }
        Self {
            enabled: enabled && parser_url.is_some(),
            run_at: get_env_value_or_default("SCHEDULER_RUN_AT", RunAt::default()),
            delay: Duration::from_millis(get_env_value_or_default("SCHEDULER_DELAY_MS", 2000)),
            parser_url,
            request_timeout: Duration::from_secs(get_env_value_or_default("PYTHON_API_TIMEOUT_SECS", 30)),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_at: RunAt::default(),
            delay: Duration::ZERO,
            parser_url: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for RunAt {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default())
    }
}

impl FromStr for RunAt {
    type Err = InvalidRunAt;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| InvalidRunAt)
    }
}

impl Display for RunAt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}
