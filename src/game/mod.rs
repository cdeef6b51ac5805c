//! The deathmatch engine, the registry of active games and the single-slot
//! rendezvous that hands word submissions to each room's game loop.

pub mod deathmatch;
pub mod manager;
pub mod word_buffer;

pub use deathmatch::{Deathmatch, GameError, GameState, OrderedPlayers};
pub use manager::{GameHandle, GameManager};
pub use word_buffer::WordInputBuffer;
