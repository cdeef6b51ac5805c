#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Wordchain Server
//!
//! The server-side core of a multiplayer real-time word-chain game.
//!
//! Players connect over a persistent WebSocket channel, gather in a shared
//! lobby, form bounded rooms and play turn-based deathmatch rounds in which
//! every submitted word must chain off the previous one, exist in an external
//! dictionary and be fresh for the current game.

/// Server configuration and environment variables
pub mod config;

/// Domain value types: players, rooms, rules, turns, words, game events
pub mod domain;

/// External dictionary lookups (Merriam-Webster client + cache)
pub mod dictionary;

/// Deathmatch engine, game registry and the word-input rendezvous
pub mod game;

/// HTTP surface: player CRUD, room routes, stats, WebSocket upgrade
pub mod http;

/// Structured logging configuration
pub mod logging;

/// The authoritative in-memory player/room registry
pub mod pool;

/// WebSocket message protocol definitions
pub mod protocol;

/// Main server orchestration
pub mod server;

/// Persistence layer (Postgres + in-memory implementations)
pub mod store;
