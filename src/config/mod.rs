//! Configuration module.
//!
//! All settings come from environment variables with compiled-in defaults:
//!
//! - [`loader::load`] reads the environment and produces a [`Config`]
//! - [`validation::validate`] rejects configurations the server cannot run with
//! - [`defaults`] holds the default-value functions
//! - [`logging`] holds the logging knobs consumed by [`crate::logging`]

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod types;
pub mod validation;

pub use loader::{load, ConfigError};

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use types::{
    AuthConfig, Config, DictionaryConfig, GameTimingConfig, ReaperConfig, RootConfig,
    WebSocketConfig,
};

pub use validation::validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.auth.cookie_name, "player_id");
        assert_eq!(config.auth.cookie_expiration_secs, 1200);
        assert_eq!(config.game.start_delay_secs, 1);
        assert_eq!(config.game.turn_start_delay_secs, 1);
        assert!((config.game.max_turn_time_deviation_secs - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.reaper.interval_secs, 60);
        assert_eq!(config.reaper.delay_secs, 180);
        assert_eq!(config.root.lobby_id, 1);
        assert_eq!(config.root.root_name, "root");
        assert_eq!(config.root.lobby_name, "lobby");
        assert_eq!(config.websocket.send_queue_capacity, 64);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        // Default config carries no database URI or dictionary key.
        let config = Config::default();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let mut config = Config::default();
        config.database_uri = "postgres://localhost/wordchain".into();
        config.dictionary.api_key = "key".into();
        config.root.root_id = uuid::Uuid::new_v4();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_url_without_word_placeholder() {
        let mut config = Config::default();
        config.database_uri = "postgres://localhost/wordchain".into();
        config.dictionary.api_key = "key".into();
        config.root.root_id = uuid::Uuid::new_v4();
        config.dictionary.api_url = "https://dictionary.example/lookup".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }
}
