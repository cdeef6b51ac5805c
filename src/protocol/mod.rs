//! WebSocket message protocol.
//!
//! Every frame on the client channel is a JSON envelope
//! `{"payload": {"type": ..., ...}}` where the `type` discriminator selects
//! the payload variant. Lobby and room state payloads are partial deltas: a
//! key mapped to `null` means removal, an absent key means "no change", a
//! present value overwrites.

pub mod game_state;
pub mod messages;
pub mod room_state;
pub mod types;

pub use game_state::{GameStatePayload, TurnOut};

pub use messages::{
    ActionKind, ActionMessage, ChatMessage, ConnectionState, GameInput, MessagePayload,
    WebSocketMessage,
};

pub use room_state::{
    AllTimeStats, CurrentStats, LobbyPlayerOut, LobbyState, RoomOut, RoomPlayerOut, RoomState,
};

pub use types::MULTIPLE_CLIENTS_CLOSE_CODE;
