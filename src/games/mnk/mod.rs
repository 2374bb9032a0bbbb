//! m,n,k games (tic-tac-toe and its generalisations).
//!
//! Two players alternately place stones on an m x n board; the first to
//! get k in a row wins. Used as the reference game for training:
//! - 3,3,3 is tic-tac-toe (perfect play draws)
//! - 6,6,4 is the default training target
//!
//! Passing can be enabled to exercise pass-aware search; two consecutive
//! passes end the game in a draw.

mod game;

pub use game::{MnkGame, MnkGameBuilder, MnkMove, MnkState};
