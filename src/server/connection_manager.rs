//! Channel ownership and fan-out.
//!
//! The connection manager does not own membership (the pool does); it owns
//! the outbound side of every connection. Broadcasts serialize the payload
//! once and fan the shared frame out to each member's bounded queue; one
//! slow or dead recipient never stalls the others, and per-recipient order
//! is preserved by the queue plus the single writer task per connection.

use std::sync::Arc;

use crate::domain::{PlayerId, RoomId};
use crate::pool::{OutboundFrame, PlayerRoomPool, PoolError};
use crate::protocol::{
    ActionKind, ActionMessage, ChatMessage, GameStatePayload, LobbyState, MessagePayload,
    RoomState, WebSocketMessage,
};

pub struct ConnectionManager {
    pool: Arc<PlayerRoomPool>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(pool: Arc<PlayerRoomPool>) -> Self {
        Self { pool }
    }

    /// Serialize a payload into the frame shared by every recipient.
    #[must_use]
    pub fn encode(payload: &MessagePayload) -> Option<OutboundFrame> {
        match serde_json::to_string(&WebSocketMessage {
            payload: payload.clone(),
        }) {
            Ok(json) => Some(Arc::from(json.as_str())),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode outbound frame");
                None
            }
        }
    }

    /// Move a player between rooms, clearing the ready/in-game flags.
    pub fn move_player(
        &self,
        player_id: PlayerId,
        from_room_id: RoomId,
        to_room_id: RoomId,
    ) -> Result<(), PoolError> {
        self.pool.move_player(player_id, from_room_id, to_room_id)
    }

    /// Fan a payload out to every member of a room. Send errors on a single
    /// recipient are logged and do not abort the rest.
    pub fn broadcast_to_room(&self, room_id: RoomId, payload: &MessagePayload) {
        let Some(frame) = Self::encode(payload) else {
            return;
        };
        let senders = match self.pool.senders_for_room(room_id) {
            Ok(senders) => senders,
            Err(err) => {
                tracing::warn!(room_id, error = %err, "broadcast target room is gone");
                return;
            }
        };
        for (player_id, sender) in senders {
            Self::deliver(player_id, &sender, frame.clone());
        }
    }

    /// Send a payload to a single player.
    pub fn send_to_player(&self, player_id: PlayerId, payload: &MessagePayload) {
        let Some(frame) = Self::encode(payload) else {
            return;
        };
        match self.pool.sender_for(player_id) {
            Ok(sender) => Self::deliver(player_id, &sender, frame),
            Err(err) => {
                tracing::debug!(player_id = %player_id, error = %err, "send target is not connected");
            }
        }
    }

    pub fn broadcast_chat(&self, message: ChatMessage) {
        let room_id = message.room_id;
        self.broadcast_to_room(room_id, &MessagePayload::Chat(message));
    }

    pub fn send_chat(&self, message: ChatMessage, player_id: PlayerId) {
        self.send_to_player(player_id, &MessagePayload::Chat(message));
    }

    pub fn broadcast_lobby_state(&self, delta: LobbyState) {
        self.broadcast_to_room(self.pool.lobby_id(), &MessagePayload::LobbyState(delta));
    }

    pub fn send_lobby_state(&self, player_id: PlayerId, state: LobbyState) {
        self.send_to_player(player_id, &MessagePayload::LobbyState(state));
    }

    pub fn broadcast_room_state(&self, state: RoomState) {
        let room_id = state.id;
        self.broadcast_to_room(room_id, &MessagePayload::RoomState(state));
    }

    pub fn broadcast_game_state(&self, room_id: RoomId, state: GameStatePayload) {
        self.broadcast_to_room(room_id, &MessagePayload::GameState(state));
    }

    pub fn send_action(&self, action: ActionKind, player_id: PlayerId) {
        self.send_to_player(player_id, &MessagePayload::Action(ActionMessage { action }));
    }

    /// Enqueue a frame on one connection. A full queue drops the frame for
    /// that recipient; a closed queue means the connection is tearing down
    /// and will surface a disconnect shortly.
    fn deliver(player_id: PlayerId, sender: &crate::pool::OutboundSender, frame: OutboundFrame) {
        use tokio::sync::mpsc::error::TrySendError;
        match sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(player_id = %player_id, "outbound queue full, dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(player_id = %player_id, "outbound queue closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use crate::pool::PooledPlayer;
    use crate::protocol::ConnectionState;

    use super::*;

    const LOBBY: RoomId = 1;

    fn setup() -> (Arc<PlayerRoomPool>, ConnectionManager) {
        let pool = Arc::new(PlayerRoomPool::new(LOBBY, "lobby", Uuid::new_v4(), "root"));
        let manager = ConnectionManager::new(Arc::clone(&pool));
        (pool, manager)
    }

    fn connect(
        pool: &PlayerRoomPool,
        name: &str,
        capacity: usize,
    ) -> (PlayerId, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = Uuid::new_v4();
        pool.add_player(PooledPlayer::new(id, name.into(), Utc::now(), LOBBY, tx))
            .unwrap();
        (id, rx)
    }

    fn decode(frame: &OutboundFrame) -> WebSocketMessage {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let (pool, manager) = setup();
        let (_, mut rx_a) = connect(&pool, "alice", 4);
        let (_, mut rx_b) = connect(&pool, "bob", 4);

        manager.broadcast_to_room(
            LOBBY,
            &MessagePayload::ConnectionState(ConnectionState {
                code: 1000,
                reason: "bye".into(),
            }),
        );

        for rx in [&mut rx_a, &mut rx_b] {
            let frame = rx.recv().await.unwrap();
            let message = decode(&frame);
            assert!(matches!(
                message.payload,
                MessagePayload::ConnectionState(_)
            ));
        }
    }

    #[tokio::test]
    async fn test_full_queue_does_not_abort_other_recipients() {
        let (pool, manager) = setup();
        // Capacity 1: the second frame to alice is dropped.
        let (_, mut rx_a) = connect(&pool, "alice", 1);
        let (_, mut rx_b) = connect(&pool, "bob", 4);

        let payload = MessagePayload::ConnectionState(ConnectionState {
            code: 1000,
            reason: "one".into(),
        });
        manager.broadcast_to_room(LOBBY, &payload);
        manager.broadcast_to_room(LOBBY, &payload);

        // Bob got both frames despite alice's stalled queue.
        assert!(rx_b.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
        assert!(rx_a.recv().await.is_some());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_player_targets_only_that_player() {
        let (pool, manager) = setup();
        let (id_a, mut rx_a) = connect(&pool, "alice", 4);
        let (_, mut rx_b) = connect(&pool, "bob", 4);

        manager.send_action(ActionKind::KickPlayer, id_a);

        let frame = rx_a.recv().await.unwrap();
        assert!(matches!(decode(&frame).payload, MessagePayload::Action(_)));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_payload_serialized_once_and_shared() {
        let (pool, manager) = setup();
        let (_, mut rx_a) = connect(&pool, "alice", 4);
        let (_, mut rx_b) = connect(&pool, "bob", 4);

        manager.broadcast_lobby_state(LobbyState::default());

        let frame_a = rx_a.recv().await.unwrap();
        let frame_b = rx_b.recv().await.unwrap();
        assert!(Arc::ptr_eq(&frame_a, &frame_b));
    }
}
