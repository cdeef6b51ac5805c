//! Persistence layer.
//!
//! The server talks to storage exclusively through the [`GameStore`] trait;
//! [`postgres::PgStore`] is the production implementation and
//! [`memory::MemStore`] backs tests and offline runs. Each logical operation
//! is a short-lived session that either commits or rolls back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{GameId, PlayerId, RoomId, Turn};
use crate::domain::DeathmatchRules;
use crate::protocol::AllTimeStats;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("player name `{0}` is already taken")]
    DuplicatePlayerName(String),
    #[error("room name `{0}` is already taken")]
    DuplicateRoomName(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to encode rules: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A player account row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub created_on: DateTime<Utc>,
}

/// A room row. Persistence tracks lifecycle timestamps; live room state
/// (status, capacity, rules, membership) is owned by the pool.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RoomRecord {
    pub id: RoomId,
    pub name: String,
    pub created_on: DateTime<Utc>,
    pub last_active_on: DateTime<Utc>,
    pub ended_on: Option<DateTime<Utc>>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: i64,
    pub content: String,
    pub created_on: DateTime<Utc>,
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

/// Persisted game status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Started,
    Ended,
}

impl GameStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Ended => "ENDED",
        }
    }
}

/// Storage operations used by the server core.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Bootstrap the schema and seed the root pseudo-player and the lobby
    /// room. Idempotent.
    async fn initialize(&self) -> Result<(), StoreError>;

    async fn create_player(&self, name: &str) -> Result<PlayerRecord, StoreError>;

    async fn get_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError>;

    async fn get_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError>;

    /// Insert a room row, minting its id.
    async fn create_room(&self, name: &str) -> Result<RoomRecord, StoreError>;

    async fn touch_room(&self, room_id: RoomId, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn mark_room_ended(&self, room_id: RoomId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Rooms with no end timestamp, lobby included; the reaper filters.
    async fn unended_rooms(&self) -> Result<Vec<RoomRecord>, StoreError>;

    /// Create a game placeholder (status STARTED) to mint its id, wiring the
    /// player many-to-many rows.
    async fn create_game(
        &self,
        room_id: RoomId,
        rules: &DeathmatchRules,
        player_ids: &[PlayerId],
    ) -> Result<GameId, StoreError>;

    /// Bulk-insert the sealed turns and close the game row.
    async fn finalize_game(
        &self,
        game_id: GameId,
        turns: &[Turn],
        ended_on: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn insert_message(
        &self,
        content: &str,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<MessageRecord, StoreError>;

    async fn all_time_stats(&self) -> Result<AllTimeStats, StoreError>;
}
