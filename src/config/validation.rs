//! Configuration validation.

use super::types::Config;

/// Reject configurations the server cannot operate with.
///
/// Returns a single error message listing every problem found, so a broken
/// deployment surfaces all of its mistakes in one pass.
pub fn validate(config: &Config) -> Result<(), String> {
    let mut problems: Vec<String> = Vec::new();

    if config.database_uri.trim().is_empty() {
        problems.push("DATABASE_URI must be set".to_string());
    }
    if config.dictionary.api_key.trim().is_empty() {
        problems.push("DICTIONARY_API_KEY must be set".to_string());
    }
    if config.root.root_id.is_nil() {
        problems.push("ROOT_ID must be a non-nil UUID".to_string());
    }
    if !config.dictionary.api_url.contains("{word}") {
        problems.push("DICTIONARY_API_URL must contain a {word} placeholder".to_string());
    }
    if config.auth.cookie_name.trim().is_empty() {
        problems.push("AUTH_COOKIE_NAME must not be empty".to_string());
    }
    if config.auth.cookie_expiration_secs == 0 {
        problems.push("AUTH_COOKIE_EXPIRATION must be positive".to_string());
    }
    if config.reaper.interval_secs == 0 {
        problems.push("ROOM_DELETION_INTERVAL must be positive".to_string());
    }
    if config.game.max_turn_time_deviation_secs < 0.0 {
        problems.push("MAX_TURN_TIME_DEVIATION must not be negative".to_string());
    }
    if config.websocket.send_queue_capacity == 0 {
        problems.push("send queue capacity must be positive".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
