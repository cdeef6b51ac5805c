//! HTTP surface: player CRUD, room routes, stats and the WebSocket upgrade.

pub mod auth;
pub mod errors;
pub mod players;
pub mod rooms;
pub mod stats;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AuthConfig;
use crate::server::GameServer;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<GameServer>,
    pub auth: AuthConfig,
}

/// Assemble the router with CORS and request tracing.
pub fn create_router(state: AppState, cors_origins: &str) -> Router {
    use axum::http::{header, Method};
    use tower_http::cors::CorsLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|origin| origin.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            // The auth cookie travels cross-site, so credentials must be
            // allowed and the wildcard forms cannot be used.
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true)
        }
    };

    Router::new()
        .route("/players", post(players::create_player))
        .route("/players/me", get(players::get_client_player))
        .route("/players/login", post(players::login_player))
        .route("/players/logout", post(players::logout_player))
        .route("/stats", get(stats::get_stats))
        .route("/connect", get(ws::connect))
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/{room_id}", put(rooms::modify_room))
        .route("/rooms/{room_id}/join", post(rooms::join_room))
        .route("/rooms/{room_id}/leave", post(rooms::leave_room))
        .route("/rooms/{room_id}/status", post(rooms::toggle_room_status))
        .route("/rooms/{room_id}/ready", post(rooms::toggle_ready))
        .route("/rooms/{room_id}/return", post(rooms::return_from_game))
        .route(
            "/rooms/{room_id}/players/{player_name}/kick",
            post(rooms::kick_player),
        )
        .route("/rooms/{room_id}/start", post(rooms::start_game))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
