//! The per-room game loop: a cooperative task driving a deathmatch through
//! its phases, consuming word inputs, applying deadlines and broadcasting
//! every state transition in order.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{GameEvent, RoomStatus};
use crate::game::{GameError, GameHandle};

use super::GameServer;

impl GameServer {
    /// Spawn the detached loop for a freshly created game.
    pub(super) fn spawn_game_loop(self: &Arc<Self>, handle: GameHandle) {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            let game_id = handle.game.lock().await.id();
            match server.run_game(&handle).await {
                Ok(()) => {}
                Err(err) => {
                    // The room is left as-is; the reaper collects it once
                    // everyone is gone.
                    tracing::error!(game_id, error = %err, "game loop terminated abnormally");
                }
            }
            server.games.remove(game_id);
        });
    }

    async fn run_game(&self, handle: &GameHandle) -> Result<(), GameError> {
        let room_id = handle.room_id;
        let buffer = match self.pool.get_room(room_id) {
            Ok(room) => Arc::clone(&room.input_buffer),
            Err(err) => {
                tracing::error!(room_id, error = %err, "game loop has no room to run in");
                return Ok(());
            }
        };
        let cancel = &handle.cancel;

        let payload = { handle.game.lock().await.start()? };
        self.connections.broadcast_game_state(room_id, payload);

        let payload = { handle.game.lock().await.wait()? };
        self.connections.broadcast_game_state(room_id, payload);
        if !self.pause(cancel, self.settings.game_start_delay).await {
            return Ok(());
        }

        loop {
            let payload = { handle.game.lock().await.start_turn()? };
            // Anything still in the buffer belongs to an earlier turn.
            buffer.clear();
            self.connections.broadcast_game_state(room_id, payload);

            // The deadline is read at the moment of awaiting.
            let time_left = { handle.game.lock().await.time_left_in_turn() };
            let received = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                received = tokio::time::timeout(
                    Duration::from_secs_f64(time_left.max(0.0)),
                    buffer.get(),
                ) => received,
            };

            let payload = match received {
                Ok(word) => {
                    let mut game = handle.game.lock().await;
                    game.end_turn_in_time(&word).await?
                }
                Err(_) => {
                    let mut game = handle.game.lock().await;
                    game.end_turn_timed_out(self.settings.max_turn_time_deviation_secs)?
                }
            };
            self.connections.broadcast_game_state(room_id, payload);

            let events = { handle.game.lock().await.take_events() };
            self.relay_events(room_id, events).await;

            if handle.game.lock().await.is_finished() {
                break;
            }

            let payload = { handle.game.lock().await.wait()? };
            self.connections.broadcast_game_state(room_id, payload);
            if !self.pause(cancel, self.settings.turn_start_delay).await {
                return Ok(());
            }
        }

        let payload = { handle.game.lock().await.end()? };
        self.connections.broadcast_game_state(room_id, payload);

        let events = { handle.game.lock().await.take_events() };
        self.relay_events(room_id, events).await;

        self.finalize_game(handle).await;
        Ok(())
    }

    /// Sleep between phases, returning `false` when the game was cancelled.
    async fn pause(&self, cancel: &tokio_util::sync::CancellationToken, delay: Duration) -> bool {
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Broadcast game events as system chat messages, after the state
    /// broadcast they belong to.
    async fn relay_events(&self, room_id: i64, events: Vec<GameEvent>) {
        for event in events {
            let content = match event {
                GameEvent::PlayerLost { player_name } => {
                    format!("{player_name} is out of the game")
                }
                GameEvent::PlayerWon { player_name } => format!("{player_name} won the game"),
                GameEvent::GameFinished { chain_length } => {
                    format!("The game has finished with a word chain of {chain_length} words")
                }
            };
            if let Err(err) = self.system_chat(room_id, &content).await {
                tracing::warn!(room_id, error = %err, "failed to relay game event");
            }
        }
    }

    /// Persist the finished game and re-open the room.
    async fn finalize_game(&self, handle: &GameHandle) {
        let room_id = handle.room_id;
        let (game_id, turns) = {
            let game = handle.game.lock().await;
            (game.id(), game.turns().to_vec())
        };

        if let Err(err) = self
            .store
            .finalize_game(game_id, &turns, chrono::Utc::now())
            .await
        {
            tracing::error!(game_id, error = %err, "failed to persist finished game");
        }

        if let Err(err) = self.pool.set_room_status(room_id, RoomStatus::Open) {
            tracing::warn!(room_id, error = %err, "failed to re-open room after game");
            return;
        }
        if let Err(err) = self.store.touch_room(room_id, chrono::Utc::now()).await {
            tracing::warn!(room_id, error = %err, "failed to touch room activity");
        }

        if let Ok(room) = self.pool.get_room(room_id) {
            match self.room_state_snapshot(&room) {
                Ok(state) => self.connections.broadcast_room_state(state),
                Err(err) => {
                    tracing::warn!(room_id, error = %err, "failed to broadcast post-game room state");
                }
            }
            self.connections
                .broadcast_lobby_state(self.lobby_room_delta(&room));
        }

        tracing::info!(game_id, room_id, "game finished and persisted");
    }
}
