use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GameId, RoomId};

use super::game_state::GameStatePayload;
use super::room_state::{LobbyState, RoomState};

/// Envelope wrapping every frame on the client channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketMessage {
    pub payload: MessagePayload,
}

impl WebSocketMessage {
    #[must_use]
    pub fn new(payload: MessagePayload) -> Self {
        Self { payload }
    }
}

/// Payload variants, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Chat messages, player-authored or system ("root") messages
    Chat(ChatMessage),
    /// Partial lobby delta
    LobbyState(LobbyState),
    /// Room snapshot or partial room delta
    RoomState(RoomState),
    /// Game state broadcast, tagged by the inner `state` field
    GameState(GameStatePayload),
    /// Connection-level notification (e.g. duplicate client)
    ConnectionState(ConnectionState),
    /// Client-to-server game input
    GameInput(GameInput),
    /// One-shot server-to-client instruction
    Action(ActionMessage),
}

/// A chat message. `id` and `created_on` are set once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    pub content: String,
    pub player_name: String,
    pub room_id: RoomId,
}

/// Connection-state notification with a WebSocket-style code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub code: u16,
    pub reason: String,
}

/// Client game input, discriminated by `inputType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "inputType", rename_all = "snake_case")]
pub enum GameInput {
    #[serde(rename_all = "camelCase")]
    WordInput { game_id: GameId, word: String },
}

/// One-shot instruction to a single client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub action: ActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    KickPlayer,
}
