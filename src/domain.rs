//! Domain value types shared across the registry, the game engine, the wire
//! protocol and persistence. Small, owned and serializable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable account identifier. One live connection per player at most.
pub type PlayerId = Uuid;

/// Room identifier minted by persistence. The lobby has a fixed id.
pub type RoomId = i64;

/// Game identifier minted by persistence when a room starts a match.
pub type GameId = i64;

/// Player names are capped both at the HTTP boundary and in the schema.
pub const MAX_PLAYER_NAME_LENGTH: usize = 10;

/// Room names share the player-name cap.
pub const MAX_ROOM_NAME_LENGTH: usize = 10;

/// A player account as persisted: stable UUID, unique name, creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub created_on: DateTime<Utc>,
}

/// Room lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Open,
    Closed,
    InProgress,
    Expired,
}

/// Deathmatch rule set. Immutable once a game has started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathmatchRules {
    #[serde(rename = "type", default = "GameType::deathmatch")]
    pub type_: GameType,
    /// Seconds a player has to submit a word
    pub round_time: u32,
    pub start_score: i32,
    /// Non-positive; if 0, a player loses after a single mistake
    pub penalty: i32,
    pub reward: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Deathmatch,
}

impl GameType {
    pub(crate) const fn deathmatch() -> Self {
        Self::Deathmatch
    }
}

impl Default for DeathmatchRules {
    fn default() -> Self {
        Self {
            type_: GameType::Deathmatch,
            round_time: 10,
            start_score: 0,
            penalty: -5,
            reward: 2,
        }
    }
}

impl DeathmatchRules {
    /// Bounds: `round_time` 3..=30, `start_score` 0..=10, `penalty` -10..=0,
    /// `reward` 0..=10. Violations are reported per field for the 422 body.
    pub fn validate(&self) -> Result<(), Vec<(&'static str, String)>> {
        let mut errors = Vec::new();
        if !(3..=30).contains(&self.round_time) {
            errors.push(("roundTime", "must be between 3 and 30".to_string()));
        }
        if !(0..=10).contains(&self.start_score) {
            errors.push(("startScore", "must be between 0 and 10".to_string()));
        }
        if !(-10..=0).contains(&self.penalty) {
            errors.push(("penalty", "must be between -10 and 0".to_string()));
        }
        if !(0..=10).contains(&self.reward) {
            errors.push(("reward", "must be between 0 and 10".to_string()));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A player's standing within a single game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub id: PlayerId,
    pub name: String,
    pub in_game: bool,
    /// Final ranking, assigned on elimination
    pub place: Option<u32>,
    pub score: i32,
    pub mistakes: u32,
}

impl GamePlayer {
    #[must_use]
    pub fn new(id: PlayerId, name: String, start_score: i32) -> Self {
        Self {
            id,
            name,
            in_game: true,
            place: None,
            score: start_score,
            mistakes: 0,
        }
    }
}

/// A part-of-speech label paired with its short definitions.
pub type Definition = (String, Vec<String>);

/// A submitted word after validation. Content is lowercased before any
/// comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub content: String,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Vec<Definition>>,
}

impl Word {
    #[must_use]
    pub fn incorrect(content: String) -> Self {
        Self {
            content,
            is_correct: false,
            definitions: None,
        }
    }
}

/// One scheduled opportunity for the current player to submit a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<Word>,
    pub started_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_on: Option<DateTime<Utc>>,
    /// Human-readable outcome ("Word is correct", "Turn time exceeded", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub player_id: PlayerId,
}

impl Turn {
    #[must_use]
    pub fn started(player_id: PlayerId) -> Self {
        Self {
            word: None,
            started_on: Utc::now(),
            ended_on: None,
            info: None,
            player_id,
        }
    }
}

/// Events emitted by the game engine, consumed by the orchestrator and
/// relayed as system chat messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    PlayerLost { player_name: String },
    PlayerWon { player_name: String },
    GameFinished { chain_length: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_defaults_are_in_bounds() {
        assert!(DeathmatchRules::default().validate().is_ok());
    }

    #[test]
    fn test_rules_bounds_report_each_field() {
        let rules = DeathmatchRules {
            type_: GameType::Deathmatch,
            round_time: 2,
            start_score: 11,
            penalty: 1,
            reward: 42,
        };
        let errors = rules.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|(field, _)| *field).collect();
        assert_eq!(fields, ["roundTime", "startScore", "penalty", "reward"]);
    }

    #[test]
    fn test_rules_wire_shape() {
        let rules = DeathmatchRules::default();
        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(json["type"], "deathmatch");
        assert_eq!(json["roundTime"], 10);
        assert_eq!(json["startScore"], 0);
        assert_eq!(json["penalty"], -5);
        assert_eq!(json["reward"], 2);
    }

    #[test]
    fn test_room_status_wire_names() {
        assert_eq!(
            serde_json::to_value(RoomStatus::InProgress).unwrap(),
            "InProgress"
        );
        assert_eq!(serde_json::to_value(RoomStatus::Open).unwrap(), "Open");
    }
}
