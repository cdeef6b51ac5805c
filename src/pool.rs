//! The authoritative in-memory player/room registry.
//!
//! The pool is the single mutable global: it owns every connected player
//! record and every live room record, and it is the only place that mutates
//! both sides of a membership link. Everything else holds ids and performs
//! lookups at use-site. All index updates happen atomically under one mutex.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::{DeathmatchRules, PlayerId, RoomId, RoomStatus};
use crate::game::WordInputBuffer;

/// Pre-serialized outbound frame, shared across recipients of a broadcast.
pub type OutboundFrame = Arc<str>;

/// Per-connection outbound queue handle. Writes to a single connection are
/// serialized by its writer task; the queue preserves per-recipient order.
pub type OutboundSender = mpsc::Sender<OutboundFrame>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("player {0} is already connected")]
    PlayerAlreadyPresent(PlayerId),
    #[error("player {0} is not connected")]
    PlayerNotFound(PlayerId),
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("room {0} already exists")]
    RoomAlreadyExists(RoomId),
    #[error("room {0} still has members")]
    RoomNotEmpty(RoomId),
    #[error("player {player_id} is not in room {room_id}")]
    NotInRoom {
        player_id: PlayerId,
        room_id: RoomId,
    },
    #[error("the lobby cannot be removed")]
    LobbyImmortal,
}

/// A connected player session.
#[derive(Debug, Clone)]
pub struct PooledPlayer {
    pub id: PlayerId,
    pub name: String,
    pub created_on: DateTime<Utc>,
    pub room_id: RoomId,
    pub ready: bool,
    pub in_game: bool,
    pub sender: OutboundSender,
}

impl PooledPlayer {
    #[must_use]
    pub fn new(
        id: PlayerId,
        name: String,
        created_on: DateTime<Utc>,
        room_id: RoomId,
        sender: OutboundSender,
    ) -> Self {
        Self {
            id,
            name,
            created_on,
            room_id,
            ready: false,
            in_game: false,
            sender,
        }
    }
}

/// A live room.
#[derive(Debug, Clone)]
pub struct PooledRoom {
    pub id: RoomId,
    pub name: String,
    pub status: RoomStatus,
    pub capacity: usize,
    pub rules: DeathmatchRules,
    pub owner_id: PlayerId,
    pub owner_name: String,
    pub created_on: DateTime<Utc>,
    pub last_active_on: DateTime<Utc>,
    pub members: HashSet<PlayerId>,
    /// Rendezvous between the message router and the room's game loop
    pub input_buffer: Arc<WordInputBuffer>,
}

impl PooledRoom {
    #[must_use]
    pub fn new(
        id: RoomId,
        name: String,
        capacity: usize,
        rules: DeathmatchRules,
        owner_id: PlayerId,
        owner_name: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            status: RoomStatus::Open,
            capacity,
            rules,
            owner_id,
            owner_name,
            created_on: now,
            last_active_on: now,
            members: HashSet::new(),
            input_buffer: Arc::new(WordInputBuffer::new()),
        }
    }
}

struct PoolInner {
    players: HashMap<PlayerId, PooledPlayer>,
    rooms: HashMap<RoomId, PooledRoom>,
}

/// See module docs. Constructed once per process with the lobby pre-seeded.
pub struct PlayerRoomPool {
    inner: Mutex<PoolInner>,
    lobby_id: RoomId,
}

impl PlayerRoomPool {
    /// Create a pool holding only the lobby. The lobby ignores its capacity
    /// and is never reaped.
    #[must_use]
    pub fn new(lobby_id: RoomId, lobby_name: &str, root_id: PlayerId, root_name: &str) -> Self {
        let lobby = PooledRoom::new(
            lobby_id,
            lobby_name.to_string(),
            0,
            DeathmatchRules::default(),
            root_id,
            root_name.to_string(),
        );
        let mut rooms = HashMap::new();
        rooms.insert(lobby_id, lobby);
        Self {
            inner: Mutex::new(PoolInner {
                players: HashMap::new(),
                rooms,
            }),
            lobby_id,
        }
    }

    #[must_use]
    pub fn lobby_id(&self) -> RoomId {
        self.lobby_id
    }

    /// Number of connected players.
    #[must_use]
    pub fn active_players(&self) -> usize {
        self.lock().players.len()
    }

    /// Number of live rooms, lobby excluded.
    #[must_use]
    pub fn active_rooms(&self) -> usize {
        self.lock().rooms.len() - 1
    }

    /// Insert a player into both indices. The target room must exist.
    pub fn add_player(&self, player: PooledPlayer) -> Result<(), PoolError> {
        let mut inner = self.lock();
        if inner.players.contains_key(&player.id) {
            return Err(PoolError::PlayerAlreadyPresent(player.id));
        }
        let room = inner
            .rooms
            .get_mut(&player.room_id)
            .ok_or(PoolError::RoomNotFound(player.room_id))?;
        room.members.insert(player.id);
        room.last_active_on = Utc::now();
        inner.players.insert(player.id, player);
        Ok(())
    }

    /// Remove a player from both indices.
    pub fn remove_player(&self, player_id: PlayerId) -> Result<PooledPlayer, PoolError> {
        let mut inner = self.lock();
        let player = inner
            .players
            .remove(&player_id)
            .ok_or(PoolError::PlayerNotFound(player_id))?;
        if let Some(room) = inner.rooms.get_mut(&player.room_id) {
            room.members.remove(&player_id);
            room.last_active_on = Utc::now();
        }
        Ok(player)
    }

    pub fn get_player(&self, player_id: PlayerId) -> Result<PooledPlayer, PoolError> {
        self.lock()
            .players
            .get(&player_id)
            .cloned()
            .ok_or(PoolError::PlayerNotFound(player_id))
    }

    pub fn contains_player(&self, player_id: PlayerId) -> bool {
        self.lock().players.contains_key(&player_id)
    }

    pub fn get_room(&self, room_id: RoomId) -> Result<PooledRoom, PoolError> {
        self.lock()
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or(PoolError::RoomNotFound(room_id))
    }

    /// Find the room a player is currently in.
    pub fn get_room_of_player(&self, player_id: PlayerId) -> Result<PooledRoom, PoolError> {
        let inner = self.lock();
        let player = inner
            .players
            .get(&player_id)
            .ok_or(PoolError::PlayerNotFound(player_id))?;
        inner
            .rooms
            .get(&player.room_id)
            .cloned()
            .ok_or(PoolError::RoomNotFound(player.room_id))
    }

    /// Snapshot of a room's members; order is unspecified.
    pub fn get_room_players(&self, room_id: RoomId) -> Result<Vec<PooledPlayer>, PoolError> {
        let inner = self.lock();
        let room = inner
            .rooms
            .get(&room_id)
            .ok_or(PoolError::RoomNotFound(room_id))?;
        Ok(room
            .members
            .iter()
            .filter_map(|id| inner.players.get(id).cloned())
            .collect())
    }

    pub fn create_room(&self, room: PooledRoom) -> Result<(), PoolError> {
        let mut inner = self.lock();
        if inner.rooms.contains_key(&room.id) {
            return Err(PoolError::RoomAlreadyExists(room.id));
        }
        inner.rooms.insert(room.id, room);
        Ok(())
    }

    /// Remove a room. Fails while the room still has members; the lobby is
    /// never removable.
    pub fn remove_room(&self, room_id: RoomId) -> Result<PooledRoom, PoolError> {
        if room_id == self.lobby_id {
            return Err(PoolError::LobbyImmortal);
        }
        let mut inner = self.lock();
        let room = inner
            .rooms
            .get(&room_id)
            .ok_or(PoolError::RoomNotFound(room_id))?;
        if !room.members.is_empty() {
            return Err(PoolError::RoomNotEmpty(room_id));
        }
        Ok(inner.rooms.remove(&room_id).unwrap_or_else(|| unreachable!()))
    }

    /// Every room except the lobby.
    #[must_use]
    pub fn get_rooms(&self) -> Vec<PooledRoom> {
        self.lock()
            .rooms
            .values()
            .filter(|room| room.id != self.lobby_id)
            .cloned()
            .collect()
    }

    /// Move a player between rooms, atomically updating both membership sets
    /// and clearing the ready/in-game flags.
    pub fn move_player(
        &self,
        player_id: PlayerId,
        from_room_id: RoomId,
        to_room_id: RoomId,
    ) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let player = inner
            .players
            .get(&player_id)
            .ok_or(PoolError::PlayerNotFound(player_id))?;
        if player.room_id != from_room_id {
            return Err(PoolError::NotInRoom {
                player_id,
                room_id: from_room_id,
            });
        }
        if !inner.rooms.contains_key(&to_room_id) {
            return Err(PoolError::RoomNotFound(to_room_id));
        }

        let now = Utc::now();
        if let Some(from) = inner.rooms.get_mut(&from_room_id) {
            from.members.remove(&player_id);
            from.last_active_on = now;
        }
        let to = inner.rooms.get_mut(&to_room_id).unwrap_or_else(|| unreachable!());
        to.members.insert(player_id);
        to.last_active_on = now;

        let player = inner.players.get_mut(&player_id).unwrap_or_else(|| unreachable!());
        player.room_id = to_room_id;
        player.ready = false;
        player.in_game = false;
        Ok(())
    }

    /// Toggle a player's ready flag, returning the new value.
    pub fn toggle_ready(&self, player_id: PlayerId) -> Result<bool, PoolError> {
        let mut inner = self.lock();
        let player = inner
            .players
            .get_mut(&player_id)
            .ok_or(PoolError::PlayerNotFound(player_id))?;
        player.ready = !player.ready;
        Ok(player.ready)
    }

    pub fn set_ready(&self, player_id: PlayerId, ready: bool) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let player = inner
            .players
            .get_mut(&player_id)
            .ok_or(PoolError::PlayerNotFound(player_id))?;
        player.ready = ready;
        Ok(())
    }

    pub fn set_in_game(&self, player_id: PlayerId, in_game: bool) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let player = inner
            .players
            .get_mut(&player_id)
            .ok_or(PoolError::PlayerNotFound(player_id))?;
        player.in_game = in_game;
        Ok(())
    }

    /// Flip every member of a room into the started-game state: ready
    /// cleared, in-game set.
    pub fn mark_room_in_game(&self, room_id: RoomId) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let members: Vec<PlayerId> = inner
            .rooms
            .get(&room_id)
            .ok_or(PoolError::RoomNotFound(room_id))?
            .members
            .iter()
            .copied()
            .collect();
        for member in members {
            if let Some(player) = inner.players.get_mut(&member) {
                player.ready = false;
                player.in_game = true;
            }
        }
        Ok(())
    }

    pub fn set_room_status(&self, room_id: RoomId, status: RoomStatus) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let room = inner
            .rooms
            .get_mut(&room_id)
            .ok_or(PoolError::RoomNotFound(room_id))?;
        room.status = status;
        room.last_active_on = Utc::now();
        Ok(())
    }

    /// Apply new capacity and rules. Readiness of all members is reset so
    /// everyone re-confirms under the new settings.
    pub fn update_room_settings(
        &self,
        room_id: RoomId,
        capacity: usize,
        rules: DeathmatchRules,
    ) -> Result<(), PoolError> {
        let mut inner = self.lock();
        let room = inner
            .rooms
            .get_mut(&room_id)
            .ok_or(PoolError::RoomNotFound(room_id))?;
        room.capacity = capacity;
        room.rules = rules;
        room.last_active_on = Utc::now();
        let members: Vec<PlayerId> = room.members.iter().copied().collect();
        for member in members {
            if let Some(player) = inner.players.get_mut(&member) {
                player.ready = false;
            }
        }
        Ok(())
    }

    /// Outbound queues of every member of a room, for broadcast fan-out.
    pub fn senders_for_room(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<(PlayerId, OutboundSender)>, PoolError> {
        let inner = self.lock();
        let room = inner
            .rooms
            .get(&room_id)
            .ok_or(PoolError::RoomNotFound(room_id))?;
        Ok(room
            .members
            .iter()
            .filter_map(|id| {
                inner
                    .players
                    .get(id)
                    .map(|player| (*id, player.sender.clone()))
            })
            .collect())
    }

    pub fn sender_for(&self, player_id: PlayerId) -> Result<OutboundSender, PoolError> {
        self.lock()
            .players
            .get(&player_id)
            .map(|player| player.sender.clone())
            .ok_or(PoolError::PlayerNotFound(player_id))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        // A poisoned registry mutex is unrecoverable; the panic propagates.
        #[allow(clippy::unwrap_used)]
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    const LOBBY: RoomId = 1;

    fn make_pool() -> PlayerRoomPool {
        PlayerRoomPool::new(LOBBY, "lobby", Uuid::new_v4(), "root")
    }

    fn make_player(pool_room: RoomId) -> PooledPlayer {
        let (tx, _rx) = mpsc::channel(4);
        PooledPlayer::new(Uuid::new_v4(), "alice".into(), Utc::now(), pool_room, tx)
    }

    fn make_room(id: RoomId, owner: PlayerId) -> PooledRoom {
        PooledRoom::new(
            id,
            format!("room-{id}"),
            4,
            DeathmatchRules::default(),
            owner,
            "alice".into(),
        )
    }

    #[test]
    fn test_add_and_remove_player_updates_both_indices() {
        let pool = make_pool();
        let player = make_player(LOBBY);
        let id = player.id;

        pool.add_player(player).unwrap();
        assert_eq!(pool.active_players(), 1);
        assert_eq!(pool.get_room(LOBBY).unwrap().members.len(), 1);
        assert_eq!(pool.get_room_of_player(id).unwrap().id, LOBBY);

        pool.remove_player(id).unwrap();
        assert_eq!(pool.active_players(), 0);
        assert!(pool.get_room(LOBBY).unwrap().members.is_empty());
        assert_eq!(
            pool.remove_player(id).unwrap_err(),
            PoolError::PlayerNotFound(id)
        );
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let pool = make_pool();
        let player = make_player(LOBBY);
        let duplicate = player.clone();

        pool.add_player(player).unwrap();
        assert!(matches!(
            pool.add_player(duplicate),
            Err(PoolError::PlayerAlreadyPresent(_))
        ));
    }

    #[test]
    fn test_add_player_requires_existing_room() {
        let pool = make_pool();
        let player = make_player(99);
        assert_eq!(
            pool.add_player(player).unwrap_err(),
            PoolError::RoomNotFound(99)
        );
    }

    #[test]
    fn test_room_removal_requires_emptiness() {
        let pool = make_pool();
        let player = make_player(LOBBY);
        let player_id = player.id;
        pool.add_player(player).unwrap();

        let room = make_room(2, player_id);
        pool.create_room(room).unwrap();
        pool.move_player(player_id, LOBBY, 2).unwrap();

        assert_eq!(pool.remove_room(2).unwrap_err(), PoolError::RoomNotEmpty(2));
        pool.move_player(player_id, 2, LOBBY).unwrap();
        assert!(pool.remove_room(2).is_ok());
    }

    #[test]
    fn test_lobby_cannot_be_removed() {
        let pool = make_pool();
        assert_eq!(pool.remove_room(LOBBY).unwrap_err(), PoolError::LobbyImmortal);
    }

    #[test]
    fn test_move_player_roundtrip_restores_indices() {
        let pool = make_pool();
        let mut player = make_player(LOBBY);
        player.ready = true;
        player.in_game = true;
        let player_id = player.id;
        pool.add_player(player).unwrap();
        pool.create_room(make_room(2, player_id)).unwrap();

        pool.move_player(player_id, LOBBY, 2).unwrap();
        let moved = pool.get_player(player_id).unwrap();
        assert_eq!(moved.room_id, 2);
        // Flags are cleared by the move.
        assert!(!moved.ready);
        assert!(!moved.in_game);
        assert!(pool.get_room(LOBBY).unwrap().members.is_empty());
        assert!(pool.get_room(2).unwrap().members.contains(&player_id));

        pool.move_player(player_id, 2, LOBBY).unwrap();
        let back = pool.get_player(player_id).unwrap();
        assert_eq!(back.room_id, LOBBY);
        assert!(pool.get_room(2).unwrap().members.is_empty());
        assert!(pool.get_room(LOBBY).unwrap().members.contains(&player_id));
    }

    #[test]
    fn test_move_player_validates_source_membership() {
        let pool = make_pool();
        let player = make_player(LOBBY);
        let player_id = player.id;
        pool.add_player(player).unwrap();
        pool.create_room(make_room(2, player_id)).unwrap();

        assert_eq!(
            pool.move_player(player_id, 2, LOBBY).unwrap_err(),
            PoolError::NotInRoom {
                player_id,
                room_id: 2
            }
        );
        assert_eq!(
            pool.move_player(player_id, LOBBY, 42).unwrap_err(),
            PoolError::RoomNotFound(42)
        );
    }

    #[test]
    fn test_active_rooms_excludes_lobby() {
        let pool = make_pool();
        assert_eq!(pool.active_rooms(), 0);
        pool.create_room(make_room(2, Uuid::new_v4())).unwrap();
        pool.create_room(make_room(3, Uuid::new_v4())).unwrap();
        assert_eq!(pool.active_rooms(), 2);
        assert_eq!(pool.get_rooms().len(), 2);
        assert!(pool.get_rooms().iter().all(|room| room.id != LOBBY));
    }

    #[test]
    fn test_mark_room_in_game_flips_all_members() {
        let pool = make_pool();
        let owner = make_player(LOBBY);
        let owner_id = owner.id;
        let guest = make_player(LOBBY);
        let guest_id = guest.id;
        pool.add_player(owner).unwrap();
        pool.add_player(guest).unwrap();
        pool.create_room(make_room(2, owner_id)).unwrap();
        pool.move_player(owner_id, LOBBY, 2).unwrap();
        pool.move_player(guest_id, LOBBY, 2).unwrap();
        pool.set_ready(owner_id, true).unwrap();
        pool.set_ready(guest_id, true).unwrap();

        pool.mark_room_in_game(2).unwrap();
        for player in pool.get_room_players(2).unwrap() {
            assert!(!player.ready);
            assert!(player.in_game);
        }
    }
}
