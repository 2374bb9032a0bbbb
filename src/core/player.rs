//! Player identification.
//!
//! Two-valued side marker. `First` always moves first from the initial
//! position.

use serde::{Deserialize, Serialize};

/// One of the two sides of a two-player game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    /// The side that moves first from the initial position.
    First,
    /// The side that moves second.
    Second,
}

impl Player {
    /// Get the opposing player.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    /// Get the 0-based seat index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Player::First => 0,
            Player::Second => 1,
        }
    }

    /// Seat for a 0-based index. Only the parity is used.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Player::First
        } else {
            Player::Second
        }
    }

    /// Sign used by board encodings: `+1` for `First`, `-1` for `Second`.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Player::First => 1.0,
            Player::Second => -1.0,
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Player::First => write!(f, "First"),
            Player::Second => write!(f, "Second"),
        }
    }
}
