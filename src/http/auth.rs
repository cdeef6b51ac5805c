//! Cookie-based authentication.
//!
//! The httpOnly auth cookie carries the player UUID and is refreshed on
//! every authenticated request. A missing or unknown identity yields 403
//! and clears the cookie.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::store::PlayerRecord;

use super::AppState;

/// Build the auth cookie. An empty value with the same attributes clears
/// the session, matching the login/logout contract.
#[must_use]
pub fn auth_cookie(config: &AuthConfig, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.cookie_name.clone(), value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_secure(true);
    cookie.set_path("/");
    cookie.set_max_age(cookie::time::Duration::seconds(
        i64::try_from(config.cookie_expiration_secs).unwrap_or(i64::MAX),
    ));
    cookie
}

/// The authenticated caller plus the jar carrying the refreshed cookie.
/// Handlers return the jar so the refresh reaches the response.
pub struct AuthedPlayer {
    pub record: PlayerRecord,
    pub jar: CookieJar,
}

/// 403 response that also clears the cookie.
pub struct AuthRejection {
    jar: CookieJar,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            self.jar,
            Json(json!({ "detail": "Player is not authenticated" })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for AuthedPlayer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let reject = |jar: CookieJar| AuthRejection {
            jar: jar.add(auth_cookie(&state.auth, String::new())),
        };

        let Some(raw) = jar
            .get(&state.auth.cookie_name)
            .map(|cookie| cookie.value().to_string())
        else {
            return Err(reject(jar));
        };
        let Ok(player_id) = raw.parse::<Uuid>() else {
            return Err(reject(jar));
        };

        let record = match state.server.store().get_player(player_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(reject(jar)),
            Err(err) => {
                tracing::error!(error = %err, "failed to load player for auth");
                return Err(reject(jar));
            }
        };

        // Refresh the cookie's max-age on every authenticated request.
        let jar = jar.add(auth_cookie(&state.auth, player_id.to_string()));
        Ok(Self { record, jar })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_cookie_attributes() {
        let config = AuthConfig {
            cookie_name: "player_id".into(),
            cookie_expiration_secs: 1200,
        };
        let cookie = auth_cookie(&config, "abc".into());
        assert_eq!(cookie.name(), "player_id");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(cookie::time::Duration::seconds(1200))
        );
    }
}
