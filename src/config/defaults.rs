//! Default value functions for configuration fields.

use super::logging::LogFormat;

// =============================================================================
// Server
// =============================================================================

pub const fn default_port() -> u16 {
    3000
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// =============================================================================
// Authentication
// =============================================================================

pub fn default_auth_cookie_name() -> String {
    "player_id".to_string()
}

pub const fn default_auth_cookie_expiration() -> u64 {
    1200 // 20 minutes
}

// =============================================================================
// Dictionary
// =============================================================================

pub fn default_dictionary_api_url() -> String {
    "https://www.dictionaryapi.com/api/v3/references/collegiate/json/{word}?key={api_key}"
        .to_string()
}

pub const fn default_dictionary_timeout_secs() -> u64 {
    10
}

pub const fn default_dictionary_cache_size() -> usize {
    4096
}

// =============================================================================
// Game pacing
// =============================================================================

pub const fn default_game_start_delay() -> u64 {
    1
}

pub const fn default_turn_start_delay() -> u64 {
    1
}

pub const fn default_max_turn_time_deviation() -> f64 {
    0.1
}

// =============================================================================
// Reaper
// =============================================================================

pub const fn default_room_deletion_interval() -> u64 {
    60
}

pub const fn default_room_deletion_delay() -> u64 {
    180 // 3 minutes of emptiness before a room expires
}

// =============================================================================
// Singletons
// =============================================================================

pub fn default_root_name() -> String {
    "root".to_string()
}

pub const fn default_lobby_id() -> i64 {
    1
}

pub fn default_lobby_name() -> String {
    "lobby".to_string()
}

// =============================================================================
// WebSocket
// =============================================================================

pub const fn default_send_queue_capacity() -> usize {
    64
}

// =============================================================================
// Logging
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_log_rotation() -> String {
    "daily".to_string()
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}

pub const fn default_enable_file_logging() -> bool {
    false
}
