//! Main server orchestration.
//!
//! [`GameServer`] wires the registry, the connection manager, the game
//! engine, persistence and the dictionary together. Connection registration
//! and teardown live here; the per-concern operations live in the submodules.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;
use crate::dictionary::Dictionary;
use crate::domain::{PlayerId, RoomId};
use crate::pool::{OutboundSender, PlayerRoomPool, PoolError, PooledPlayer};
use crate::protocol::{CurrentStats, LobbyPlayerOut, LobbyState};
use crate::store::{GameStore, PlayerRecord, StoreError};

mod connection_manager;
mod game_loop;
mod maintenance;
mod message_router;
mod messaging;
mod room_service;
mod stats_cache;

pub use connection_manager::ConnectionManager;
pub use maintenance::ReaperSchedule;

use crate::game::GameManager;
use stats_cache::StatsCache;

/// How long `/stats` responses are memoized.
const STATS_CACHE_TTL: Duration = Duration::from_secs(30);

/// Runtime settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub root_id: PlayerId,
    pub root_name: String,
    pub lobby_id: RoomId,
    pub lobby_name: String,
    pub game_start_delay: Duration,
    pub turn_start_delay: Duration,
    pub max_turn_time_deviation_secs: f64,
    pub reaper_interval: Duration,
    pub room_deletion_delay: Duration,
    pub send_queue_capacity: usize,
}

impl From<&Config> for ServerSettings {
    fn from(config: &Config) -> Self {
        Self {
            root_id: config.root.root_id,
            root_name: config.root.root_name.clone(),
            lobby_id: config.root.lobby_id,
            lobby_name: config.root.lobby_name.clone(),
            game_start_delay: Duration::from_secs(config.game.start_delay_secs),
            turn_start_delay: Duration::from_secs(config.game.turn_start_delay_secs),
            max_turn_time_deviation_secs: config.game.max_turn_time_deviation_secs,
            reaper_interval: Duration::from_secs(config.reaper.interval_secs),
            room_deletion_delay: Duration::from_secs(config.reaper.delay_secs),
            send_queue_capacity: config.websocket.send_queue_capacity,
        }
    }
}

/// Errors surfaced by server operations; the HTTP layer maps them onto
/// status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Room not open, room full, not ready and friends. HTTP 400.
    #[error("{0}")]
    BadState(String),
    /// Ownership and membership violations. HTTP 403.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

/// A second channel tried to open for an already-connected player.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("player is already connected with another client")]
    AlreadyConnected,
    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub struct GameServer {
    pool: Arc<PlayerRoomPool>,
    connections: ConnectionManager,
    store: Arc<dyn GameStore>,
    dictionary: Arc<dyn Dictionary>,
    games: GameManager,
    stats_cache: StatsCache,
    settings: ServerSettings,
}

impl GameServer {
    #[must_use]
    pub fn new(
        settings: ServerSettings,
        store: Arc<dyn GameStore>,
        dictionary: Arc<dyn Dictionary>,
    ) -> Arc<Self> {
        let pool = Arc::new(PlayerRoomPool::new(
            settings.lobby_id,
            &settings.lobby_name,
            settings.root_id,
            &settings.root_name,
        ));
        let connections = ConnectionManager::new(Arc::clone(&pool));
        Arc::new(Self {
            pool,
            connections,
            store,
            dictionary,
            games: GameManager::new(),
            stats_cache: StatsCache::new(STATS_CACHE_TTL),
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    #[must_use]
    pub fn pool(&self) -> &PlayerRoomPool {
        &self.pool
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    #[must_use]
    pub fn store(&self) -> &dyn GameStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn lobby_id(&self) -> RoomId {
        self.settings.lobby_id
    }

    /// Register a freshly accepted connection, placing the player in the
    /// lobby.
    ///
    /// On a duplicate the original session receives a persisted warning chat
    /// and the caller closes the new channel with code 4001.
    pub async fn register_client(
        &self,
        record: &PlayerRecord,
        sender: OutboundSender,
    ) -> Result<(), ConnectError> {
        let player = PooledPlayer::new(
            record.id,
            record.name.clone(),
            record.created_on,
            self.settings.lobby_id,
            sender,
        );
        match self.pool.add_player(player) {
            Ok(()) => {}
            Err(PoolError::PlayerAlreadyPresent(_)) => {
                if let Ok(room) = self.pool.get_room_of_player(record.id) {
                    if let Err(err) = self
                        .system_chat_to(
                            record.id,
                            room.id,
                            "Someone tried to log into your account from another device",
                        )
                        .await
                    {
                        tracing::warn!(player_id = %record.id, error = %err, "failed to warn original session");
                    }
                }
                return Err(ConnectError::AlreadyConnected);
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(player_id = %record.id, name = %record.name, "client connected");

        if let Err(err) = self
            .system_chat(
                self.settings.lobby_id,
                &format!("{} joined the room", record.name),
            )
            .await
        {
            tracing::warn!(player_id = %record.id, error = %err, "failed to announce join");
        }

        // The newcomer needs the full picture; everyone else only the delta.
        self.connections
            .send_lobby_state(record.id, self.full_lobby_state());
        let mut players = std::collections::HashMap::new();
        players.insert(
            record.name.clone(),
            Some(LobbyPlayerOut {
                name: record.name.clone(),
            }),
        );
        self.connections.broadcast_lobby_state(LobbyState {
            rooms: None,
            players: Some(players),
            stats: Some(self.current_stats()),
        });
        Ok(())
    }

    /// Tear down a connection. Safe to call twice; the second call finds the
    /// player already gone.
    pub async fn unregister_client(&self, player_id: PlayerId) {
        let Ok(player) = self.pool.remove_player(player_id) else {
            return;
        };
        tracing::info!(player_id = %player_id, name = %player.name, "client disconnected");

        let farewell = format!("{} disconnected from the room", player.name);
        if player.room_id == self.settings.lobby_id {
            let mut players = std::collections::HashMap::new();
            players.insert(player.name.clone(), None);
            self.connections.broadcast_lobby_state(LobbyState {
                rooms: None,
                players: Some(players),
                stats: Some(self.current_stats()),
            });
            if let Err(err) = self.system_chat(self.settings.lobby_id, &farewell).await {
                tracing::warn!(player_id = %player_id, error = %err, "failed to announce disconnect");
            }
            return;
        }

        if player.in_game {
            // Disconnect mid-game: the game keeps running and broadcasts
            // simply skip the missing recipient. Forfeit/grace handling is
            // an open product decision.
            tracing::info!(player_id = %player_id, room_id = player.room_id, "player disconnected mid-game");
            return;
        }

        if let Ok(room) = self.pool.get_room(player.room_id) {
            let mut players = std::collections::HashMap::new();
            players.insert(player.name.clone(), None);
            self.connections
                .broadcast_room_state(self.room_state_delta(&room, Some(players)));
            if let Err(err) = self.system_chat(player.room_id, &farewell).await {
                tracing::warn!(player_id = %player_id, error = %err, "failed to announce disconnect");
            }
        }
    }

    /// Live lobby counters.
    #[must_use]
    pub fn current_stats(&self) -> CurrentStats {
        CurrentStats {
            active_players: self.pool.active_players(),
            active_rooms: self.pool.active_rooms(),
        }
    }

    /// A complete lobby snapshot: every room, every lobby player, counters.
    #[must_use]
    pub fn full_lobby_state(&self) -> LobbyState {
        let rooms = self
            .pool
            .get_rooms()
            .into_iter()
            .map(|room| (room.id, Some(self.room_out(&room))))
            .collect();

        let players = self
            .pool
            .get_room_players(self.settings.lobby_id)
            .unwrap_or_default()
            .into_iter()
            .map(|player| {
                (
                    player.name.clone(),
                    Some(LobbyPlayerOut { name: player.name }),
                )
            })
            .collect();

        LobbyState {
            rooms: Some(rooms),
            players: Some(players),
            stats: Some(self.current_stats()),
        }
    }
}
