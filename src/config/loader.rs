//! Configuration loading from environment variables.

use std::env;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use super::types::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("environment variable `{var}` has an invalid value: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Load configuration from the environment on top of compiled-in defaults.
///
/// `DATABASE_URI`, `DICTIONARY_API_KEY` and `ROOT_ID` are required; everything
/// else falls back to a default. Parse failures are hard errors rather than
/// silent fallbacks so a typoed deployment does not run with surprising
/// timeouts.
pub fn load() -> Result<Config, ConfigError> {
    let mut config = Config::default();

    config.database_uri = require_var("DATABASE_URI")?;
    config.dictionary.api_key = require_var("DICTIONARY_API_KEY")?;
    config.root.root_id = require_parsed::<Uuid>("ROOT_ID")?;

    if let Some(port) = optional_parsed("PORT")? {
        config.port = port;
    }
    if let Some(origins) = optional_var("CORS_ORIGINS") {
        config.cors_origins = origins;
    }

    if let Some(name) = optional_var("AUTH_COOKIE_NAME") {
        config.auth.cookie_name = name;
    }
    if let Some(expiration) = optional_parsed("AUTH_COOKIE_EXPIRATION")? {
        config.auth.cookie_expiration_secs = expiration;
    }

    if let Some(url) = optional_var("DICTIONARY_API_URL") {
        config.dictionary.api_url = url;
    }
    if let Some(timeout) = optional_parsed("DICTIONARY_TIMEOUT")? {
        config.dictionary.request_timeout_secs = timeout;
    }

    if let Some(delay) = optional_parsed("GAME_START_DELAY")? {
        config.game.start_delay_secs = delay;
    }
    if let Some(delay) = optional_parsed("TURN_START_DELAY")? {
        config.game.turn_start_delay_secs = delay;
    }
    if let Some(deviation) = optional_parsed("MAX_TURN_TIME_DEVIATION")? {
        config.game.max_turn_time_deviation_secs = deviation;
    }

    if let Some(interval) = optional_parsed("ROOM_DELETION_INTERVAL")? {
        config.reaper.interval_secs = interval;
    }
    if let Some(delay) = optional_parsed("ROOM_DELETION_DELAY")? {
        config.reaper.delay_secs = delay;
    }

    if let Some(name) = optional_var("ROOT_NAME") {
        config.root.root_name = name;
    }
    if let Some(id) = optional_parsed("LOBBY_ID")? {
        config.root.lobby_id = id;
    }
    if let Some(name) = optional_var("LOBBY_NAME") {
        config.root.lobby_name = name;
    }

    if let Some(level) = optional_parsed("LOG_LEVEL")? {
        config.logging.level = Some(level);
    }
    if let Some(format) = optional_parsed("LOG_FORMAT")? {
        config.logging.format = format;
    }
    if let Some(dir) = optional_var("LOG_DIR") {
        config.logging.dir = dir;
    }
    if let Some(enabled) = optional_var("LOG_TO_FILE") {
        config.logging.enable_file_logging = env_var_truthy(&enabled);
    }

    Ok(config)
}

fn require_var(var: &'static str) -> Result<String, ConfigError> {
    optional_var(var).ok_or(ConfigError::MissingVar(var))
}

fn require_parsed<T>(var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = require_var(var)?;
    raw.parse().map_err(|err: T::Err| ConfigError::InvalidVar {
        var,
        reason: err.to_string(),
    })
}

fn optional_var(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn optional_parsed<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = optional_var(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err: T::Err| ConfigError::InvalidVar {
            var,
            reason: err.to_string(),
        })
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_truthy() {
        assert!(env_var_truthy("1"));
        assert!(env_var_truthy("true"));
        assert!(env_var_truthy(" YES "));
        assert!(!env_var_truthy("0"));
        assert!(!env_var_truthy("off"));
    }

    #[test]
    fn test_missing_required_var_is_reported_by_name() {
        // The test environment does not define DATABASE_URI.
        std::env::remove_var("DATABASE_URI");
        let err = load().expect_err("load must fail without DATABASE_URI");
        assert!(err.to_string().contains("DATABASE_URI"));
    }
}
