//! In-memory implementation of [`GameStore`] for tests and offline runs.
//!
//! Mirrors the Postgres semantics (uniqueness, id minting, stats queries)
//! closely enough that the server core cannot tell the difference.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::RootConfig;
use crate::domain::{DeathmatchRules, GameId, PlayerId, RoomId, Turn};
use crate::protocol::AllTimeStats;

use super::{GameStatus, GameStore, MessageRecord, PlayerRecord, RoomRecord, StoreError};

#[derive(Debug, Clone)]
struct StoredGame {
    status: GameStatus,
    created_on: DateTime<Utc>,
    ended_on: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    rules: DeathmatchRules,
    #[allow(dead_code)]
    room_id: RoomId,
    player_ids: Vec<PlayerId>,
    turns: Vec<Turn>,
}

#[derive(Default)]
struct Inner {
    players: HashMap<PlayerId, PlayerRecord>,
    rooms: HashMap<RoomId, RoomRecord>,
    games: HashMap<GameId, StoredGame>,
    messages: Vec<MessageRecord>,
    next_room_id: RoomId,
    next_game_id: GameId,
    next_message_id: i64,
}

pub struct MemStore {
    inner: Mutex<Inner>,
    root: RootConfig,
}

impl MemStore {
    #[must_use]
    pub fn new(root: RootConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_room_id: root.lobby_id + 1,
                next_game_id: 1,
                next_message_id: 1,
                ..Inner::default()
            }),
            root,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Test hook: every message persisted for a room, oldest first.
    #[must_use]
    pub fn messages_for_room(&self, room_id: RoomId) -> Vec<MessageRecord> {
        self.lock()
            .messages
            .iter()
            .filter(|message| message.room_id == room_id)
            .cloned()
            .collect()
    }

    /// Test hook: the sealed turns of a finalized game.
    #[must_use]
    pub fn turns_for_game(&self, game_id: GameId) -> Vec<Turn> {
        self.lock()
            .games
            .get(&game_id)
            .map(|game| game.turns.clone())
            .unwrap_or_default()
    }

    /// Test hook: the players attached to a game.
    #[must_use]
    pub fn players_for_game(&self, game_id: GameId) -> Vec<PlayerId> {
        self.lock()
            .games
            .get(&game_id)
            .map(|game| game.player_ids.clone())
            .unwrap_or_default()
    }

    /// Test hook: a room row by id.
    #[must_use]
    pub fn room(&self, room_id: RoomId) -> Option<RoomRecord> {
        self.lock().rooms.get(&room_id).cloned()
    }
}

#[async_trait]
impl GameStore for MemStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();
        inner
            .players
            .entry(self.root.root_id)
            .or_insert_with(|| PlayerRecord {
                id: self.root.root_id,
                name: self.root.root_name.clone(),
                created_on: now,
            });
        inner
            .rooms
            .entry(self.root.lobby_id)
            .or_insert_with(|| RoomRecord {
                id: self.root.lobby_id,
                name: self.root.lobby_name.clone(),
                created_on: now,
                last_active_on: now,
                ended_on: None,
            });
        Ok(())
    }

    async fn create_player(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        let mut inner = self.lock();
        if inner.players.values().any(|player| player.name == name) {
            return Err(StoreError::DuplicatePlayerName(name.to_string()));
        }
        let record = PlayerRecord {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            created_on: Utc::now(),
        };
        inner.players.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(self.lock().players.get(&id).cloned())
    }

    async fn get_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(self
            .lock()
            .players
            .values()
            .find(|player| player.name == name)
            .cloned())
    }

    async fn create_room(&self, name: &str) -> Result<RoomRecord, StoreError> {
        let mut inner = self.lock();
        if inner.rooms.values().any(|room| room.name == name) {
            return Err(StoreError::DuplicateRoomName(name.to_string()));
        }
        let id = inner.next_room_id;
        inner.next_room_id += 1;
        let now = Utc::now();
        let record = RoomRecord {
            id,
            name: name.to_string(),
            created_on: now,
            last_active_on: now,
            ended_on: None,
        };
        inner.rooms.insert(id, record.clone());
        Ok(record)
    }

    async fn touch_room(&self, room_id: RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(room) = self.lock().rooms.get_mut(&room_id) {
            room.last_active_on = at;
        }
        Ok(())
    }

    async fn mark_room_ended(&self, room_id: RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(room) = self.lock().rooms.get_mut(&room_id) {
            if room.ended_on.is_none() {
                room.ended_on = Some(at);
            }
        }
        Ok(())
    }

    async fn unended_rooms(&self) -> Result<Vec<RoomRecord>, StoreError> {
        Ok(self
            .lock()
            .rooms
            .values()
            .filter(|room| room.ended_on.is_none())
            .cloned()
            .collect())
    }

    async fn create_game(
        &self,
        room_id: RoomId,
        rules: &DeathmatchRules,
        player_ids: &[PlayerId],
    ) -> Result<GameId, StoreError> {
        let mut inner = self.lock();
        let id = inner.next_game_id;
        inner.next_game_id += 1;
        inner.games.insert(
            id,
            StoredGame {
                status: GameStatus::Started,
                created_on: Utc::now(),
                ended_on: None,
                rules: *rules,
                room_id,
                player_ids: player_ids.to_vec(),
                turns: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn finalize_game(
        &self,
        game_id: GameId,
        turns: &[Turn],
        ended_on: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let game = inner.games.get_mut(&game_id).ok_or(StoreError::NotFound {
            entity: "game",
            id: game_id.to_string(),
        })?;
        game.status = GameStatus::Ended;
        game.ended_on = Some(ended_on);
        game.turns = turns.to_vec();
        Ok(())
    }

    async fn insert_message(
        &self,
        content: &str,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<MessageRecord, StoreError> {
        let mut inner = self.lock();
        let id = inner.next_message_id;
        inner.next_message_id += 1;
        let record = MessageRecord {
            id,
            content: content.to_string(),
            created_on: Utc::now(),
            room_id,
            player_id,
        };
        inner.messages.push(record.clone());
        Ok(record)
    }

    async fn all_time_stats(&self) -> Result<AllTimeStats, StoreError> {
        let inner = self.lock();
        let total_games = inner
            .games
            .values()
            .filter(|game| game.status == GameStatus::Ended)
            .count() as i64;
        let longest_game_time = inner
            .games
            .values()
            .filter_map(|game| {
                game.ended_on
                    .map(|ended| (ended - game.created_on).num_seconds())
            })
            .max()
            .unwrap_or(0);
        let longest_chain = inner
            .games
            .values()
            .map(|game| {
                game.turns
                    .iter()
                    .filter(|turn| turn.word.as_ref().is_some_and(|word| word.is_correct))
                    .count() as i64
            })
            .max()
            .unwrap_or(0);

        Ok(AllTimeStats {
            longest_chain,
            longest_game_time,
            total_games,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::Word;

    use super::*;

    fn make_store() -> MemStore {
        let root = RootConfig {
            root_id: uuid::Uuid::new_v4(),
            root_name: "root".into(),
            lobby_id: 1,
            lobby_name: "lobby".into(),
        };
        MemStore::new(root)
    }

    #[tokio::test]
    async fn test_initialize_seeds_root_and_lobby_idempotently() {
        let store = make_store();
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();

        let root = store.get_player_by_name("root").await.unwrap().unwrap();
        assert_eq!(root.id, store.root.root_id);
        let rooms = store.unended_rooms().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, 1);
    }

    #[tokio::test]
    async fn test_player_name_uniqueness() {
        let store = make_store();
        store.create_player("alice").await.unwrap();
        assert!(matches!(
            store.create_player("alice").await,
            Err(StoreError::DuplicatePlayerName(_))
        ));
    }

    #[tokio::test]
    async fn test_room_ids_start_after_lobby() {
        let store = make_store();
        store.initialize().await.unwrap();
        let room = store.create_room("quick").await.unwrap();
        assert_eq!(room.id, 2);
        assert!(matches!(
            store.create_room("quick").await,
            Err(StoreError::DuplicateRoomName(_))
        ));
    }

    #[tokio::test]
    async fn test_game_lifecycle_feeds_stats() {
        let store = make_store();
        store.initialize().await.unwrap();
        let alice = store.create_player("alice").await.unwrap();
        let room = store.create_room("quick").await.unwrap();
        let game_id = store
            .create_game(room.id, &DeathmatchRules::default(), &[alice.id])
            .await
            .unwrap();

        let mut turn = Turn::started(alice.id);
        turn.ended_on = Some(Utc::now());
        turn.word = Some(Word {
            content: "apple".into(),
            is_correct: true,
            definitions: None,
        });
        let mut missed = Turn::started(alice.id);
        missed.ended_on = Some(Utc::now());

        store
            .finalize_game(game_id, &[turn, missed], Utc::now())
            .await
            .unwrap();

        let stats = store.all_time_stats().await.unwrap();
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.longest_chain, 1);
        assert!(stats.longest_game_time >= 0);
    }

    #[tokio::test]
    async fn test_mark_room_ended_is_sticky() {
        let store = make_store();
        store.initialize().await.unwrap();
        let room = store.create_room("quick").await.unwrap();

        let first = Utc::now();
        store.mark_room_ended(room.id, first).await.unwrap();
        store
            .mark_room_ended(room.id, first + chrono::Duration::seconds(60))
            .await
            .unwrap();

        assert!(store
            .unended_rooms()
            .await
            .unwrap()
            .iter()
            .all(|record| record.id != room.id));
        assert_eq!(store.room(room.id).unwrap().ended_on, Some(first));
    }
}
