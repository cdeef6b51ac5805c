//! Room lifecycle routes. Thin adapters around the room service; input
//! validation happens here so the 422 body names the offending fields.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::domain::{DeathmatchRules, GameId, RoomId, MAX_ROOM_NAME_LENGTH};
use crate::protocol::{LobbyState, RoomState};

use super::auth::AuthedPlayer;
use super::errors::{ApiError, ValidationErrors};
use super::AppState;

const CAPACITY_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomIn {
    name: String,
    #[serde(default = "default_capacity")]
    capacity: usize,
    rules: DeathmatchRules,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInModify {
    #[serde(default = "default_capacity")]
    capacity: usize,
    rules: DeathmatchRules,
}

const fn default_capacity() -> usize {
    5
}

fn validate_capacity_and_rules(
    errors: &mut ValidationErrors,
    capacity: usize,
    rules: &DeathmatchRules,
) {
    if !CAPACITY_RANGE.contains(&capacity) {
        errors.add("capacity", "must be between 1 and 10");
    }
    if let Err(rule_errors) = rules.validate() {
        for (field, message) in rule_errors {
            errors.add(format!("rules.{field}"), message);
        }
    }
}

pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Json(body): Json<RoomIn>,
) -> Result<(StatusCode, CookieJar), ApiError> {
    let name = body.name.trim().to_string();
    let mut errors = ValidationErrors::in_body();
    if name.is_empty() {
        errors.add("name", "must not be empty");
    }
    if name.chars().count() > MAX_ROOM_NAME_LENGTH {
        errors.add(
            "name",
            format!("ensure this value has at most {MAX_ROOM_NAME_LENGTH} characters"),
        );
    }
    validate_capacity_and_rules(&mut errors, body.capacity, &body.rules);
    errors.into_result()?;

    state
        .server
        .create_room(auth.record.id, &name, body.capacity, body.rules)
        .await?;
    Ok((StatusCode::CREATED, auth.jar))
}

pub async fn modify_room(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
    Json(body): Json<RoomInModify>,
) -> Result<(CookieJar, Json<RoomState>), ApiError> {
    let mut errors = ValidationErrors::in_body();
    validate_capacity_and_rules(&mut errors, body.capacity, &body.rules);
    errors.into_result()?;

    let room_state = state
        .server
        .modify_room(room_id, body.capacity, body.rules)
        .await?;
    Ok((auth.jar, Json(room_state)))
}

pub async fn join_room(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
) -> Result<(CookieJar, Json<RoomState>), ApiError> {
    let room_state = state.server.join_room(auth.record.id, room_id).await?;
    Ok((auth.jar, Json(room_state)))
}

pub async fn leave_room(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
) -> Result<(CookieJar, Json<LobbyState>), ApiError> {
    let lobby_state = state.server.leave_room(auth.record.id, room_id).await?;
    Ok((auth.jar, Json(lobby_state)))
}

pub async fn toggle_room_status(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
) -> Result<(CookieJar, Json<RoomState>), ApiError> {
    let room_state = state
        .server
        .toggle_room_status(auth.record.id, room_id)
        .await?;
    Ok((auth.jar, Json(room_state)))
}

pub async fn toggle_ready(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
) -> Result<CookieJar, ApiError> {
    state.server.toggle_ready(auth.record.id, room_id).await?;
    Ok(auth.jar)
}

pub async fn return_from_game(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
) -> Result<CookieJar, ApiError> {
    state
        .server
        .return_from_game(auth.record.id, room_id)
        .await?;
    Ok(auth.jar)
}

pub async fn kick_player(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path((room_id, player_name)): Path<(RoomId, String)>,
) -> Result<CookieJar, ApiError> {
    state
        .server
        .kick_player(auth.record.id, room_id, &player_name)
        .await?;
    Ok(auth.jar)
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCreated {
    pub game_id: GameId,
}

pub async fn start_game(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    Path(room_id): Path<RoomId>,
) -> Result<(StatusCode, CookieJar, Json<GameCreated>), ApiError> {
    let game_id = state.server.start_game(auth.record.id, room_id).await?;
    Ok((StatusCode::CREATED, auth.jar, Json(GameCreated { game_id })))
}
