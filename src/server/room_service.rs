//! Room lifecycle operations: create, modify, join, leave, status toggle,
//! ready toggle, return-from-game, kick and game start. Each operation
//! mutates the registry and broadcasts the resulting deltas.

use std::collections::HashMap;

use crate::domain::{DeathmatchRules, GameId, PlayerId, RoomId, RoomStatus};
use crate::game::Deathmatch;
use crate::pool::PooledRoom;
use crate::protocol::{ActionKind, LobbyPlayerOut, LobbyState, RoomOut, RoomPlayerOut, RoomState};

use super::{GameServer, ServiceError};

impl GameServer {
    /// Create a room owned by the calling player. The owner stays in the
    /// lobby until they join.
    pub async fn create_room(
        &self,
        owner_id: PlayerId,
        name: &str,
        capacity: usize,
        rules: DeathmatchRules,
    ) -> Result<RoomId, ServiceError> {
        let owner = self.pool.get_player(owner_id)?;

        let record = self.store.create_room(name).await.map_err(|err| match err {
            crate::store::StoreError::DuplicateRoomName(name) => {
                ServiceError::Conflict(format!("Game room with name {name} already exists"))
            }
            other => other.into(),
        })?;

        let room = PooledRoom::new(
            record.id,
            record.name,
            capacity,
            rules,
            owner.id,
            owner.name,
        );
        let room_id = room.id;
        self.pool.create_room(room)?;

        let room = self.pool.get_room(room_id)?;
        self.connections
            .broadcast_lobby_state(self.lobby_room_delta(&room));
        Ok(room_id)
    }

    /// Change capacity and rules. Member readiness resets so everyone
    /// re-confirms under the new settings.
    pub async fn modify_room(
        &self,
        room_id: RoomId,
        capacity: usize,
        rules: DeathmatchRules,
    ) -> Result<RoomState, ServiceError> {
        let room = self.pool.get_room(room_id)?;
        if capacity < room.members.len() {
            return Err(ServiceError::BadState(
                "New capacity cannot be lower than the current player count".into(),
            ));
        }

        self.pool.update_room_settings(room_id, capacity, rules)?;
        if let Err(err) = self
            .store
            .touch_room(room_id, chrono::Utc::now())
            .await
        {
            tracing::warn!(room_id, error = %err, "failed to touch room activity");
        }

        if let Err(err) = self.system_chat(room_id, "game settings have been changed").await {
            tracing::warn!(room_id, error = %err, "failed to announce settings change");
        }

        let room = self.pool.get_room(room_id)?;
        let state = self.room_state_snapshot(&room)?;
        self.connections.broadcast_room_state(state.clone());
        self.connections
            .broadcast_lobby_state(self.lobby_room_delta(&room));
        Ok(state)
    }

    /// Join an open, non-full room, moving the player out of their current
    /// one.
    pub async fn join_room(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<RoomState, ServiceError> {
        let player = self.pool.get_player(player_id)?;
        let old_room = self.pool.get_room_of_player(player_id)?;
        let room = self.pool.get_room(room_id)?;

        if old_room.id == room_id {
            return self.room_state_snapshot(&room);
        }
        if room.status != RoomStatus::Open {
            return Err(ServiceError::BadState("Room is not open".into()));
        }
        if room.members.len() >= room.capacity {
            return Err(ServiceError::BadState("Room is full".into()));
        }

        self.move_player_with_messages(player_id, &player.name, old_room.id, room_id, None)
            .await?;

        // The joining player needs the full member list; the lobby only the
        // departure and the new headcount.
        let room = self.pool.get_room(room_id)?;
        let state = self.room_state_snapshot(&room)?;
        self.connections.broadcast_room_state(state.clone());

        let mut lobby_players = HashMap::new();
        lobby_players.insert(player.name.clone(), None);
        let mut delta = self.lobby_room_delta(&room);
        delta.players = Some(lobby_players);
        self.connections.broadcast_lobby_state(delta);

        Ok(state)
    }

    /// Leave a room back into the lobby. An owner abandoning a Closed room
    /// flips it Open first so it stays reachable.
    pub async fn leave_room(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<LobbyState, ServiceError> {
        let player = self.pool.get_player(player_id)?;
        let room = self.pool.get_room_of_player(player_id)?;
        if room.id != room_id {
            return Err(ServiceError::BadState("Player is not in the room".into()));
        }

        self.move_player_with_messages(
            player_id,
            &player.name,
            room_id,
            self.settings.lobby_id,
            None,
        )
        .await?;

        if room.owner_id == player_id && room.status == RoomStatus::Closed {
            self.pool.set_room_status(room_id, RoomStatus::Open)?;
        }

        let room = self.pool.get_room(room_id)?;
        let mut removed = HashMap::new();
        removed.insert(player.name.clone(), None);
        self.connections
            .broadcast_room_state(self.room_state_delta(&room, Some(removed)));

        let mut lobby_players = HashMap::new();
        lobby_players.insert(
            player.name.clone(),
            Some(LobbyPlayerOut {
                name: player.name.clone(),
            }),
        );
        let mut delta = self.lobby_room_delta(&room);
        delta.players = Some(lobby_players);
        self.connections.broadcast_lobby_state(delta.clone());

        Ok(delta)
    }

    /// Toggle a room between Open and Closed. Owner only.
    pub async fn toggle_room_status(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<RoomState, ServiceError> {
        let room = self.pool.get_room(room_id)?;
        if room.owner_id != player_id {
            return Err(ServiceError::Forbidden("Player is not the owner".into()));
        }
        let new_status = match room.status {
            RoomStatus::Open => RoomStatus::Closed,
            RoomStatus::Closed => RoomStatus::Open,
            _ => {
                return Err(ServiceError::BadState(
                    "Room status must be either Open or Closed".into(),
                ))
            }
        };
        self.pool.set_room_status(room_id, new_status)?;

        let room = self.pool.get_room(room_id)?;
        let state = self.room_state_delta(&room, None);
        self.connections.broadcast_room_state(state.clone());
        self.connections
            .broadcast_lobby_state(self.lobby_room_delta(&room));
        Ok(state)
    }

    /// Any member toggles their own ready flag.
    pub async fn toggle_ready(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<(), ServiceError> {
        let room = self.pool.get_room_of_player(player_id)?;
        if room.id != room_id {
            return Err(ServiceError::BadState("Player is not in the room".into()));
        }
        self.pool.toggle_ready(player_id)?;
        self.broadcast_single_player_delta(room_id, player_id)?;
        Ok(())
    }

    /// A player signals they have left the post-game screen.
    pub async fn return_from_game(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<(), ServiceError> {
        let room = self.pool.get_room_of_player(player_id)?;
        if room.id != room_id {
            return Err(ServiceError::BadState("Player is not in the room".into()));
        }
        self.pool.set_in_game(player_id, false)?;
        self.broadcast_single_player_delta(room_id, player_id)?;
        Ok(())
    }

    /// Owner kicks a member: a one-shot KICK_PLAYER action, then a move to
    /// the lobby with a customized leave message.
    pub async fn kick_player(
        &self,
        owner_id: PlayerId,
        room_id: RoomId,
        target_name: &str,
    ) -> Result<(), ServiceError> {
        let room = self.pool.get_room(room_id)?;
        if room.owner_id != owner_id {
            return Err(ServiceError::Forbidden("Player is not the owner".into()));
        }

        let account = self
            .store
            .get_player_by_name(target_name)
            .await?
            .ok_or_else(|| ServiceError::BadState("Player to kick does not exist".into()))?;
        let target = self
            .pool
            .get_room_players(room_id)?
            .into_iter()
            .find(|member| member.id == account.id)
            .ok_or_else(|| {
                ServiceError::BadState("Player to kick is not in the room".into())
            })?;

        self.connections.send_action(ActionKind::KickPlayer, target.id);
        self.move_player_with_messages(
            target.id,
            &target.name,
            room_id,
            self.settings.lobby_id,
            Some(format!("{} got kicked from the room", target.name)),
        )
        .await?;

        let room = self.pool.get_room(room_id)?;
        let mut removed = HashMap::new();
        removed.insert(target.name.clone(), None);
        self.connections
            .broadcast_room_state(self.room_state_delta(&room, Some(removed)));

        let mut lobby_players = HashMap::new();
        lobby_players.insert(
            target.name.clone(),
            Some(LobbyPlayerOut {
                name: target.name.clone(),
            }),
        );
        let mut delta = self.lobby_room_delta(&room);
        delta.players = Some(lobby_players);
        self.connections.broadcast_lobby_state(delta);
        Ok(())
    }

    /// Owner starts the game once every member is ready. Mints the game id
    /// in persistence, constructs the deathmatch and spawns the detached
    /// game loop.
    pub async fn start_game(
        self: &std::sync::Arc<Self>,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<GameId, ServiceError> {
        // Starting implies readiness for the starter themselves.
        self.pool.set_ready(player_id, true)?;

        let room = self.pool.get_room(room_id)?;
        if room.owner_id != player_id {
            return Err(ServiceError::BadState("Player is not the owner".into()));
        }
        let player_room = self.pool.get_room_of_player(player_id)?;
        if player_room.id != room_id {
            return Err(ServiceError::BadState("Player is not in the room".into()));
        }
        let members = self.pool.get_room_players(room_id)?;
        if members.iter().any(|member| !member.ready) {
            return Err(ServiceError::BadState("Not all players are ready".into()));
        }

        let member_ids: Vec<PlayerId> = members.iter().map(|member| member.id).collect();
        let game_id = self
            .store
            .create_game(room_id, &room.rules, &member_ids)
            .await?;

        self.pool.set_room_status(room_id, RoomStatus::InProgress)?;
        self.pool.mark_room_in_game(room_id)?;

        let game = Deathmatch::new(
            game_id,
            room_id,
            members
                .into_iter()
                .map(|member| (member.id, member.name))
                .collect(),
            room.rules,
            std::sync::Arc::clone(&self.dictionary),
        );
        let handle = self.games.create(game);

        let room = self.pool.get_room(room_id)?;
        let state = self.room_state_snapshot(&room)?;
        self.connections.broadcast_room_state(state);
        self.connections
            .broadcast_lobby_state(self.lobby_room_delta(&room));

        self.spawn_game_loop(handle);
        Ok(game_id)
    }

    /// Move a player between rooms and announce the change in both chats.
    pub(super) async fn move_player_with_messages(
        &self,
        player_id: PlayerId,
        player_name: &str,
        from_room_id: RoomId,
        to_room_id: RoomId,
        leave_message: Option<String>,
    ) -> Result<(), ServiceError> {
        self.connections
            .move_player(player_id, from_room_id, to_room_id)?;

        let leave =
            leave_message.unwrap_or_else(|| format!("{player_name} left the room"));
        if let Err(err) = self.system_chat(from_room_id, &leave).await {
            tracing::warn!(room_id = from_room_id, error = %err, "failed to announce departure");
        }
        if let Err(err) = self
            .system_chat(to_room_id, &format!("{player_name} joined the room"))
            .await
        {
            tracing::warn!(room_id = to_room_id, error = %err, "failed to announce arrival");
        }
        Ok(())
    }

    fn broadcast_single_player_delta(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), ServiceError> {
        let room = self.pool.get_room(room_id)?;
        let player = self.pool.get_player(player_id)?;
        let mut players = HashMap::new();
        players.insert(
            player.name.clone(),
            Some(RoomPlayerOut {
                name: player.name.clone(),
                ready: player.ready,
                in_game: player.in_game,
            }),
        );
        self.connections
            .broadcast_room_state(self.room_state_delta(&room, Some(players)));
        Ok(())
    }

    pub(super) fn room_out(&self, room: &PooledRoom) -> RoomOut {
        RoomOut {
            id: room.id,
            name: room.name.clone(),
            players_no: room.members.len(),
            capacity: room.capacity,
            status: room.status,
            rules: room.rules,
            owner_name: room.owner_name.clone(),
        }
    }

    pub(super) fn lobby_room_delta(&self, room: &PooledRoom) -> LobbyState {
        let mut rooms = HashMap::new();
        rooms.insert(room.id, Some(self.room_out(room)));
        LobbyState {
            rooms: Some(rooms),
            players: None,
            stats: Some(self.current_stats()),
        }
    }

    /// Room header plus an explicit (possibly partial) player delta.
    pub(super) fn room_state_delta(
        &self,
        room: &PooledRoom,
        players: Option<HashMap<String, Option<RoomPlayerOut>>>,
    ) -> RoomState {
        RoomState {
            id: room.id,
            name: room.name.clone(),
            capacity: room.capacity,
            status: room.status,
            rules: room.rules,
            owner_name: room.owner_name.clone(),
            players,
        }
    }

    /// Room header plus the full member map.
    pub(super) fn room_state_snapshot(
        &self,
        room: &PooledRoom,
    ) -> Result<RoomState, ServiceError> {
        let players = self
            .pool
            .get_room_players(room.id)?
            .into_iter()
            .map(|member| {
                (
                    member.name.clone(),
                    Some(RoomPlayerOut {
                        name: member.name,
                        ready: member.ready,
                        in_game: member.in_game,
                    }),
                )
            })
            .collect();
        Ok(self.room_state_delta(room, Some(players)))
    }
}
