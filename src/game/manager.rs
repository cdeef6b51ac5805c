//! Registry of active games, indexed by game id.
//!
//! A game lives here from room start until the loop finishes (or is
//! cancelled); its handle carries everything the message router needs to
//! route inputs without touching the loop.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::domain::{GameId, RoomId};

use super::deathmatch::Deathmatch;

/// Shared handle to one running game.
#[derive(Clone)]
pub struct GameHandle {
    pub game: Arc<Mutex<Deathmatch>>,
    pub room_id: RoomId,
    /// Cancelling tears the game loop down; the game is left unpersisted.
    pub cancel: CancellationToken,
}

#[derive(Default)]
pub struct GameManager {
    games: DashMap<GameId, GameHandle>,
}

impl GameManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly constructed game and hand back its handle.
    pub fn create(&self, game: Deathmatch) -> GameHandle {
        let id = game.id();
        let handle = GameHandle {
            room_id: game.room_id(),
            game: Arc::new(Mutex::new(game)),
            cancel: CancellationToken::new(),
        };
        self.games.insert(id, handle.clone());
        handle
    }

    #[must_use]
    pub fn get(&self, game_id: GameId) -> Option<GameHandle> {
        self.games.get(&game_id).map(|entry| entry.value().clone())
    }

    /// Drop a finished game from the index.
    pub fn remove(&self, game_id: GameId) -> Option<GameHandle> {
        self.games.remove(&game_id).map(|(_, handle)| handle)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.games.len()
    }

    /// Signal every running loop to stop. Used on shutdown.
    pub fn cancel_all(&self) {
        for entry in &self.games {
            entry.value().cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::dictionary::WordListDictionary;
    use crate::domain::DeathmatchRules;

    use super::*;

    fn make_game(id: GameId) -> Deathmatch {
        Deathmatch::new(
            id,
            7,
            vec![(Uuid::new_v4(), "alice".into())],
            DeathmatchRules::default(),
            Arc::new(WordListDictionary::new(["apple"])),
        )
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let manager = GameManager::new();
        let handle = manager.create(make_game(5));
        assert_eq!(handle.room_id, 7);
        assert_eq!(manager.active_count(), 1);

        let fetched = manager.get(5).expect("game should be registered");
        assert_eq!(fetched.game.lock().await.id(), 5);
        assert!(manager.get(6).is_none());

        manager.remove(5);
        assert!(manager.get(5).is_none());
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_signals_every_handle() {
        let manager = GameManager::new();
        let first = manager.create(make_game(1));
        let second = manager.create(make_game(2));
        manager.cancel_all();
        assert!(first.cancel.is_cancelled());
        assert!(second.cancel.is_cancelled());
    }
}
