//! Inbound message dispatch.
//!
//! Chat messages are persisted then broadcast. Word inputs are routed into
//! the owning room's input buffer after ownership checks; anything that does
//! not line up (missing game, wrong room, not the current player) is dropped
//! silently rather than trusted.

use crate::domain::PlayerId;
use crate::protocol::{GameInput, MessagePayload};

use super::GameServer;

impl GameServer {
    /// Handle one decoded frame from a player's channel. Errors are logged;
    /// the caller's listening loop continues regardless.
    pub async fn handle_client_message(&self, player_id: PlayerId, payload: MessagePayload) {
        match payload {
            MessagePayload::Chat(chat) => {
                let Ok(player) = self.pool.get_player(player_id) else {
                    return;
                };
                if let Err(err) = self
                    .persist_and_broadcast_chat(&chat.content, chat.room_id, player_id, &player.name)
                    .await
                {
                    tracing::warn!(player_id = %player_id, error = %err, "failed to persist chat message");
                }
            }
            MessagePayload::GameInput(GameInput::WordInput { game_id, word }) => {
                self.route_word_input(player_id, game_id, word).await;
            }
            other => {
                tracing::debug!(player_id = %player_id, ?other, "ignoring unexpected inbound payload");
            }
        }
    }

    async fn route_word_input(&self, player_id: PlayerId, game_id: i64, word: String) {
        let Some(handle) = self.games.get(game_id) else {
            tracing::debug!(player_id = %player_id, game_id, "word input for unknown game dropped");
            return;
        };
        let Ok(room) = self.pool.get_room_of_player(player_id) else {
            return;
        };
        if handle.room_id != room.id {
            tracing::debug!(player_id = %player_id, game_id, "word input from outside the game's room dropped");
            return;
        }
        {
            let game = handle.game.lock().await;
            if game.current_player().id != player_id {
                tracing::debug!(player_id = %player_id, game_id, "word input from a non-current player dropped");
                return;
            }
        }
        room.input_buffer.put(word);
    }
}
