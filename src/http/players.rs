//! Player account routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Player, MAX_PLAYER_NAME_LENGTH};
use crate::store::StoreError;

use super::auth::{auth_cookie, AuthedPlayer};
use super::errors::{ApiError, ValidationErrors};
use super::AppState;

fn player_out(record: crate::store::PlayerRecord) -> Player {
    Player {
        id: record.id,
        name: record.name,
        created_on: record.created_on,
    }
}

pub async fn get_client_player(auth: AuthedPlayer) -> (CookieJar, Json<Player>) {
    (auth.jar, Json(player_out(auth.record)))
}

#[derive(Debug, Deserialize)]
pub struct CreatePlayerBody {
    name: String,
}

pub async fn create_player(
    State(state): State<AppState>,
    Json(body): Json<CreatePlayerBody>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let name = body.name.trim().to_string();
    let mut errors = ValidationErrors::in_body();
    if name.is_empty() {
        errors.add("name", "must not be empty");
    }
    if name.chars().count() > MAX_PLAYER_NAME_LENGTH {
        errors.add(
            "name",
            format!("ensure this value has at most {MAX_PLAYER_NAME_LENGTH} characters"),
        );
    }
    errors.into_result()?;

    let record = state
        .server
        .store()
        .create_player(&name)
        .await
        .map_err(|err| match err {
            StoreError::DuplicatePlayerName(name) => ApiError::Service(
                crate::server::ServiceError::Conflict(format!(
                    "Player with name {name} already exists"
                )),
            ),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(player_out(record))))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    id: Uuid,
}

pub async fn login_player(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<Player>), ApiError> {
    let record = state
        .server
        .store()
        .get_player(body.id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::AuthMissing)?;

    let jar = jar.add(auth_cookie(&state.auth, record.id.to_string()));
    Ok((jar, Json(player_out(record))))
}

pub async fn logout_player(State(state): State<AppState>, auth: AuthedPlayer) -> CookieJar {
    auth.jar.add(auth_cookie(&state.auth, String::new()))
}
