//! Core types: players, RNG, errors.
//!
//! Everything here is game-agnostic and shared by search, models and training.

pub mod error;
pub mod player;
pub mod rng;

pub use error::{Error, Phase, Result};
pub use player::Player;
pub use rng::GameRng;
