//! Postgres implementation of [`GameStore`] on sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::RootConfig;
use crate::domain::{DeathmatchRules, GameId, PlayerId, RoomId, Turn};
use crate::protocol::AllTimeStats;

use super::{GameStatus, GameStore, MessageRecord, PlayerRecord, RoomRecord, StoreError};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS players (
    id UUID PRIMARY KEY,
    name VARCHAR(10) NOT NULL UNIQUE,
    created_on TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS rooms (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(10) NOT NULL UNIQUE,
    created_on TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_active_on TIMESTAMPTZ NOT NULL DEFAULT now(),
    ended_on TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS games (
    id BIGSERIAL PRIMARY KEY,
    status TEXT NOT NULL,
    created_on TIMESTAMPTZ NOT NULL DEFAULT now(),
    ended_on TIMESTAMPTZ,
    rules JSONB NOT NULL,
    room_id BIGINT NOT NULL REFERENCES rooms (id)
);

CREATE TABLE IF NOT EXISTS turns (
    id BIGSERIAL PRIMARY KEY,
    word VARCHAR(255),
    is_correct BOOLEAN,
    started_on TIMESTAMPTZ NOT NULL,
    ended_on TIMESTAMPTZ,
    game_id BIGINT NOT NULL REFERENCES games (id),
    player_id UUID NOT NULL REFERENCES players (id),
    CONSTRAINT ck_turns_word_iff_correct CHECK ((word IS NULL) = (is_correct IS NULL))
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_turns_accepted_word_per_game
    ON turns (word, game_id)
    WHERE is_correct;

CREATE TABLE IF NOT EXISTS messages (
    id BIGSERIAL PRIMARY KEY,
    content VARCHAR(255) NOT NULL,
    created_on TIMESTAMPTZ NOT NULL DEFAULT now(),
    room_id BIGINT NOT NULL REFERENCES rooms (id),
    player_id UUID NOT NULL REFERENCES players (id)
);

CREATE TABLE IF NOT EXISTS players_games (
    player_id UUID NOT NULL REFERENCES players (id),
    game_id BIGINT NOT NULL REFERENCES games (id),
    PRIMARY KEY (player_id, game_id)
);
";

pub struct PgStore {
    pool: PgPool,
    root: RootConfig,
}

impl PgStore {
    /// Connect a pool against `database_uri`.
    pub async fn connect(database_uri: &str, root: RootConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_uri)
            .await?;
        Ok(Self { pool, root })
    }

    #[must_use]
    pub fn with_pool(pool: PgPool, root: RootConfig) -> Self {
        Self { pool, root }
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
    }

}

#[async_trait]
impl GameStore for PgStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for statement in SCHEMA.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            "INSERT INTO players (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.root.root_id)
        .bind(&self.root.root_name)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO rooms (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.root.lobby_id)
        .bind(&self.root.lobby_name)
        .execute(&mut *tx)
        .await?;

        // Seeding the lobby with an explicit id bypasses the sequence; align
        // it so the first created room does not collide.
        sqlx::query(
            "SELECT setval('rooms_id_seq', GREATEST((SELECT MAX(id) FROM rooms), 1))",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_player(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        let id = uuid::Uuid::new_v4();
        let result = sqlx::query_as::<_, PlayerRecord>(
            "INSERT INTO players (id, name) VALUES ($1, $2)
             RETURNING id, name, created_on",
        )
        .bind(id)
        .bind(name)
        .fetch_one(&self.pool)
        .await;

        result.map_err(|err| {
            if Self::is_unique_violation(&err) {
                StoreError::DuplicatePlayerName(name.to_string())
            } else {
                err.into()
            }
        })
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(sqlx::query_as::<_, PlayerRecord>(
            "SELECT id, name, created_on FROM players WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(sqlx::query_as::<_, PlayerRecord>(
            "SELECT id, name, created_on FROM players WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_room(&self, name: &str) -> Result<RoomRecord, StoreError> {
        let result = sqlx::query_as::<_, RoomRecord>(
            "INSERT INTO rooms (name) VALUES ($1)
             RETURNING id, name, created_on, last_active_on, ended_on",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await;

        result.map_err(|err| {
            if Self::is_unique_violation(&err) {
                StoreError::DuplicateRoomName(name.to_string())
            } else {
                err.into()
            }
        })
    }

    async fn touch_room(&self, room_id: RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE rooms SET last_active_on = $2 WHERE id = $1")
            .bind(room_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_room_ended(&self, room_id: RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE rooms SET ended_on = $2 WHERE id = $1 AND ended_on IS NULL")
            .bind(room_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn unended_rooms(&self) -> Result<Vec<RoomRecord>, StoreError> {
        Ok(sqlx::query_as::<_, RoomRecord>(
            "SELECT id, name, created_on, last_active_on, ended_on
             FROM rooms WHERE ended_on IS NULL",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_game(
        &self,
        room_id: RoomId,
        rules: &DeathmatchRules,
        player_ids: &[PlayerId],
    ) -> Result<GameId, StoreError> {
        let rules = serde_json::to_value(rules)?;
        let mut tx = self.pool.begin().await?;

        let game_id: GameId = sqlx::query(
            "INSERT INTO games (status, rules, room_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(GameStatus::Started.as_str())
        .bind(&rules)
        .bind(room_id)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        for player_id in player_ids {
            sqlx::query("INSERT INTO players_games (player_id, game_id) VALUES ($1, $2)")
                .bind(player_id)
                .bind(game_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(game_id)
    }

    async fn finalize_game(
        &self,
        game_id: GameId,
        turns: &[Turn],
        ended_on: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE games SET status = $2, ended_on = $3 WHERE id = $1",
        )
        .bind(game_id)
        .bind(GameStatus::Ended.as_str())
        .bind(ended_on)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "game",
                id: game_id.to_string(),
            });
        }

        for turn in turns {
            let (word, is_correct) = match &turn.word {
                Some(word) => (Some(word.content.as_str()), Some(word.is_correct)),
                None => (None, None),
            };
            sqlx::query(
                "INSERT INTO turns (word, is_correct, started_on, ended_on, game_id, player_id)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(word)
            .bind(is_correct)
            .bind(turn.started_on)
            .bind(turn.ended_on)
            .bind(game_id)
            .bind(turn.player_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_message(
        &self,
        content: &str,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<MessageRecord, StoreError> {
        Ok(sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (content, room_id, player_id) VALUES ($1, $2, $3)
             RETURNING id, content, created_on, room_id, player_id",
        )
        .bind(content)
        .bind(room_id)
        .bind(player_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn all_time_stats(&self) -> Result<AllTimeStats, StoreError> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM games WHERE status = 'ENDED') AS total_games,
                COALESCE((SELECT MAX(EXTRACT(EPOCH FROM (ended_on - created_on))::BIGINT)
                          FROM games WHERE ended_on IS NOT NULL), 0) AS longest_game_time,
                COALESCE((SELECT MAX(chain) FROM (
                    SELECT COUNT(*) AS chain FROM turns WHERE is_correct GROUP BY game_id
                ) AS chains), 0) AS longest_chain",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AllTimeStats {
            longest_chain: row.get("longest_chain"),
            longest_game_time: row.get("longest_game_time"),
            total_games: row.get("total_games"),
        })
    }
}
