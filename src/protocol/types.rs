//! Protocol-level constants.

/// Custom WebSocket close code sent to a second client trying to open a
/// channel for a player with an active one.
pub const MULTIPLE_CLIENTS_CLOSE_CODE: u16 = 4001;

/// Reason phrase paired with [`MULTIPLE_CLIENTS_CLOSE_CODE`].
pub const MULTIPLE_CLIENTS_REASON: &str =
    "Player can use only one client at a time. Disconnect the previous one first.";
