//! Game capability trait.
//!
//! Games implement `Game` to define their rules:
//! - What moves are legal
//! - How a move produces the successor position
//! - Win/draw conditions
//! - How moves map onto the fixed policy vector

use std::fmt::Debug;
use std::hash::Hash;

use crate::core::{Player, Result};

/// Result of a completed game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    /// Single winner.
    Winner(Player),
    /// Draw (no winner).
    Draw,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: Player) -> bool {
        matches!(self, GameResult::Winner(p) if *p == player)
    }

    /// Outcome from `player`'s point of view: +1 win, -1 loss, 0 draw.
    #[must_use]
    pub fn value_for(&self, player: Player) -> f32 {
        match self {
            GameResult::Winner(p) if *p == player => 1.0,
            GameResult::Winner(_) => -1.0,
            GameResult::Draw => 0.0,
        }
    }
}

/// Rules of a two-player, perfect-information, alternating game.
///
/// ## Implementation Notes
///
/// - `apply` never mutates its input; it returns a fresh successor.
/// - `apply` with an illegal move returns `Error::Precondition`.
/// - `winner` is only meaningful when `is_terminal` is true; `None` on a
///   terminal state means a draw.
/// - `move_index` must be a bijection from moves onto `0..action_space()`.
pub trait Game: Clone + Send + Sync {
    /// Position type. Immutable once produced.
    type State: Clone + Debug + Send + Sync;

    /// Move type.
    type Move: Copy + Debug + Eq + Hash + Send + Sync;

    /// The starting position.
    fn initial_state(&self) -> Self::State;

    /// Legal moves in a stable order. Empty on terminal states.
    fn legal_moves(&self, state: &Self::State) -> Vec<Self::Move>;

    /// Successor position after `mv`.
    fn apply(&self, state: &Self::State, mv: Self::Move) -> Result<Self::State>;

    /// Check if the game is over.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Winner of a terminal state, `None` for a draw or an unfinished game.
    fn winner(&self, state: &Self::State) -> Option<Player>;

    /// Player to move.
    fn to_move(&self, state: &Self::State) -> Player;

    /// Size of the policy vector.
    fn action_space(&self) -> usize;

    /// Policy index of a move.
    fn move_index(&self, mv: Self::Move) -> usize;

    /// Whether a move is a pass. Games without passes keep the default.
    fn is_pass(&self, _mv: Self::Move) -> bool {
        false
    }

    // === Convenience Methods ===

    /// Final result, or `None` if the game continues.
    fn result(&self, state: &Self::State) -> Option<GameResult> {
        if !self.is_terminal(state) {
            return None;
        }
        Some(match self.winner(state) {
            Some(player) => GameResult::Winner(player),
            None => GameResult::Draw,
        })
    }

    /// Policy indices of all legal moves, in legal-move order.
    fn legal_indices(&self, state: &Self::State) -> Vec<usize> {
        self.legal_moves(state)
            .into_iter()
            .map(|mv| self.move_index(mv))
            .collect()
    }
}
