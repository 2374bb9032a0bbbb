//! Game rules interface.
//!
//! Games implement `Game` to define:
//! - Legal moves for each position
//! - How moves produce successor positions
//! - Win/draw conditions
//!
//! Search and training call into `Game` but never interpret
//! game-specific concepts directly.

pub mod engine;

pub use engine::{Game, GameResult};
