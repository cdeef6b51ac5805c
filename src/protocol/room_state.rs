//! Lobby and room state payloads.
//!
//! Both are partial deltas keyed by room id / player name. Clients absorb
//! them idempotently: `null` removes an entry, absence leaves it untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DeathmatchRules, RoomId, RoomStatus};

/// Partial lobby delta.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<HashMap<RoomId, Option<RoomOut>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<HashMap<String, Option<LobbyPlayerOut>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<CurrentStats>,
}

/// Room snapshot (players present) or delta (players partial/absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub id: RoomId,
    pub name: String,
    pub capacity: usize,
    pub status: RoomStatus,
    pub rules: DeathmatchRules,
    pub owner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<HashMap<String, Option<RoomPlayerOut>>>,
}

/// Room listing entry inside the lobby state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOut {
    pub id: RoomId,
    pub name: String,
    pub players_no: usize,
    pub capacity: usize,
    pub status: RoomStatus,
    pub rules: DeathmatchRules,
    pub owner_name: String,
}

/// Player data sent as part of the lobby state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayerOut {
    pub name: String,
}

/// Player data sent as part of the room state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayerOut {
    pub name: String,
    pub ready: bool,
    pub in_game: bool,
}

/// Live counters shown in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    pub active_players: usize,
    pub active_rooms: usize,
}

/// All-time statistics served by `GET /stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllTimeStats {
    pub longest_chain: i64,
    /// Seconds
    pub longest_game_time: i64,
    pub total_games: i64,
}
