//! All-time statistics route.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;

use crate::protocol::AllTimeStats;

use super::auth::AuthedPlayer;
use super::errors::ApiError;
use super::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthedPlayer,
) -> Result<(CookieJar, Json<AllTimeStats>), ApiError> {
    let stats = state.server.all_time_stats().await?;
    Ok((auth.jar, Json(stats)))
}
