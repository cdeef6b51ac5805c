//! Game state broadcasts, tagged by the inner `state` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DeathmatchRules, GameId, GamePlayer, Turn, Word};

/// One broadcast of the per-room game state machine. The orchestrator emits
/// these in a strict order: STARTED, WAITING, (STARTED_TURN, ENDED_TURN,
/// WAITING)*, ENDED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatePayload {
    #[serde(rename_all = "camelCase")]
    Started {
        id: GameId,
        players: Vec<GamePlayer>,
        rules: DeathmatchRules,
    },
    Waiting,
    #[serde(rename_all = "camelCase")]
    StartedTurn { current_turn: TurnOut },
    #[serde(rename_all = "camelCase")]
    EndedTurn {
        players: Vec<GamePlayer>,
        current_turn: TurnOut,
    },
    Ended,
}

/// A turn as broadcast to clients. Identifies the player by its index in the
/// ordered player list rather than by UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOut {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<Word>,
    pub started_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub player_idx: usize,
}

impl TurnOut {
    #[must_use]
    pub fn from_turn(turn: &Turn, player_idx: usize) -> Self {
        Self {
            word: turn.word.clone(),
            started_on: turn.started_on,
            ended_on: turn.ended_on,
            info: turn.info.clone(),
            player_idx,
        }
    }
}
