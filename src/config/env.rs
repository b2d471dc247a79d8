use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;
use anyhow::anyhow;

pub(super) fn get_env_mandatory_value<T, E>(key: &str) -> anyhow::Result<T>
where
    T: FromStr<Err = E>,
    E: Error + Send + Sync + 'static
{
    std::env::var(key)
        .map_err(|e| anyhow!("{key}: {e}"))?
        .parse()
        .map_err(|e: E| anyhow!(e))
}

pub fn get_env_value_or_default<T, E>(key: &str, default: T) -> T
where
    T: FromStr<Err = E> + Display,
    E: Error + Send + Sync + 'static
{
    std::env::var(key)
        .map_err(|e| {
            log::warn!("no value was found for an optional environment variable {key}, using the default value {default}");
            anyhow!(e)
        })
        .and_then(|v| v.parse()
            .map_err(|e: E| {
                log::warn!("invalid value of the {key} environment variable, using the default value {default}");
                anyhow!(e)
            }))
        .unwrap_or(default)
}

pub(super) fn get_optional_env_value<T, E>(key: &str) -> Option<T>
where
    T: FromStr<Err = E>,
    E: Error + Send + Sync + 'static
{
    let value = std::env::var(key).ok()
        .filter(|v| !v.trim().is_empty())?;
    value.parse()
        .inspect_err(|e: &E| log::warn!("{key} is ignored due to the invalid value '{value}': {e}"))
        .ok()
}
