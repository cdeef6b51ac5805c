//! Root configuration types.

use serde::Serialize;
use uuid::Uuid;

use super::defaults::{
    default_auth_cookie_expiration, default_auth_cookie_name, default_cors_origins,
    default_dictionary_api_url, default_dictionary_cache_size, default_dictionary_timeout_secs,
    default_game_start_delay, default_lobby_id, default_lobby_name, default_max_turn_time_deviation,
    default_port, default_room_deletion_delay, default_room_deletion_interval, default_root_name,
    default_send_queue_capacity, default_turn_start_delay,
};
use super::logging::LoggingConfig;

/// Root configuration assembled from the environment.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// TCP port the HTTP/WebSocket listener binds to
    pub port: u16,
    /// Postgres connection string (`DATABASE_URI`, required)
    pub database_uri: String,
    /// Comma-separated CORS origins, or `*` for permissive
    pub cors_origins: String,
    pub auth: AuthConfig,
    pub dictionary: DictionaryConfig,
    pub game: GameTimingConfig,
    pub reaper: ReaperConfig,
    pub root: RootConfig,
    pub websocket: WebSocketConfig,
    pub logging: LoggingConfig,
}

/// Cookie-based authentication settings.
#[derive(Debug, Clone, Serialize)]
pub struct AuthConfig {
    /// Name of the httpOnly cookie carrying the player UUID
    pub cookie_name: String,
    /// Cookie max-age in seconds, refreshed on every authenticated request
    pub cookie_expiration_secs: u64,
}

/// External dictionary lookup settings.
#[derive(Debug, Clone, Serialize)]
pub struct DictionaryConfig {
    /// API key (`DICTIONARY_API_KEY`, required). Never serialized.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// URL template with `{word}` and `{api_key}` substitutions
    pub api_url: String,
    /// Per-request timeout so a hung dictionary cannot stall a turn
    pub request_timeout_secs: u64,
    /// Bounded LRU cache over definitive lookup results
    pub cache_size: usize,
}

/// Game-loop pacing.
#[derive(Debug, Clone, Serialize)]
pub struct GameTimingConfig {
    /// Delay before the first turn, priming the players (seconds)
    pub start_delay_secs: u64,
    /// Delay between consecutive turns (seconds)
    pub turn_start_delay_secs: u64,
    /// Tolerated overshoot of a turn past `round_time` (seconds)
    pub max_turn_time_deviation_secs: f64,
}

/// Inactive-room reaper scheduling.
#[derive(Debug, Clone, Serialize)]
pub struct ReaperConfig {
    /// Wall-clock interval between passes (seconds)
    pub interval_secs: u64,
    /// How long an empty room may idle before deletion (seconds)
    pub delay_secs: u64,
}

/// Process-wide singleton identities: the root pseudo-player and the lobby.
#[derive(Debug, Clone, Serialize)]
pub struct RootConfig {
    /// Fixed UUID of the system pseudo-player (`ROOT_ID`, required)
    pub root_id: Uuid,
    pub root_name: String,
    /// Distinguished room where unaffiliated players reside (default 1)
    pub lobby_id: i64,
    pub lobby_name: String,
}

/// WebSocket connection settings.
#[derive(Debug, Clone, Serialize)]
pub struct WebSocketConfig {
    /// Bounded capacity of each per-connection outbound queue
    pub send_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_uri: String::new(),
            cors_origins: default_cors_origins(),
            auth: AuthConfig::default(),
            dictionary: DictionaryConfig::default(),
            game: GameTimingConfig::default(),
            reaper: ReaperConfig::default(),
            root: RootConfig::default(),
            websocket: WebSocketConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_auth_cookie_name(),
            cookie_expiration_secs: default_auth_cookie_expiration(),
        }
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_dictionary_api_url(),
            request_timeout_secs: default_dictionary_timeout_secs(),
            cache_size: default_dictionary_cache_size(),
        }
    }
}

impl Default for GameTimingConfig {
    fn default() -> Self {
        Self {
            start_delay_secs: default_game_start_delay(),
            turn_start_delay_secs: default_turn_start_delay(),
            max_turn_time_deviation_secs: default_max_turn_time_deviation(),
        }
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_room_deletion_interval(),
            delay_secs: default_room_deletion_delay(),
        }
    }
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            root_id: Uuid::nil(),
            root_name: default_root_name(),
            lobby_id: default_lobby_id(),
            lobby_name: default_lobby_name(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            send_queue_capacity: default_send_queue_capacity(),
        }
    }
}
