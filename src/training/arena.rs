//! Champion versus challenger evaluation.

use serde::{Deserialize, Serialize};

use crate::core::{Player, Result};
use crate::nn::{DualModel, StateEncoder};
use crate::rules::{Game, GameResult};

use super::self_play::SelfPlayWorker;
use super::trajectory::Episode;

/// Side the challenger takes in arena game `index`: First in even games,
/// Second in odd ones.
#[must_use]
pub fn challenger_side(index: usize) -> Player {
    Player::from_index(index)
}

/// Tally of arena games from the challenger's point of view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaResult {
    /// Challenger wins.
    pub wins: usize,
    /// Challenger losses.
    pub losses: usize,
    /// Drawn games.
    pub draws: usize,
    /// Games dropped because they failed.
    pub failures: usize,
    /// Games requested.
    pub games: usize,
}

impl ArenaResult {
    /// Empty tally for `games` requested games.
    pub fn new(games: usize) -> Self {
        Self {
            games,
            ..Self::default()
        }
    }

    /// Count one finished game.
    pub fn record(&mut self, result: GameResult, challenger: Player) {
        match result {
            GameResult::Winner(p) if p == challenger => self.wins += 1,
            GameResult::Winner(_) => self.losses += 1,
            GameResult::Draw => self.draws += 1,
        }
    }

    /// Count one failed game.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Games that produced a result.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.wins + self.losses + self.draws
    }

    /// Challenger wins over games requested. Failed games count against
    /// the challenger. 0 when no game was requested.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }

    /// Promote iff the win rate strictly exceeds `threshold`.
    #[must_use]
    pub fn should_promote(&self, threshold: f64) -> bool {
        self.games > 0 && self.win_rate() > threshold
    }
}

impl std::fmt::Display for ArenaResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}W {}L {}D of {} ({:.1}%)",
            self.wins,
            self.losses,
            self.draws,
            self.games,
            self.win_rate() * 100.0
        )
    }
}

/// Play arena game `index` between `challenger` and `champion`.
pub fn play_arena_game<G, E, C, H>(
    worker: &SelfPlayWorker<'_, G, E>,
    challenger: &C,
    champion: &H,
    index: usize,
    seed: u64,
) -> Result<Episode<G::State, G::Move>>
where
    G: Game,
    E: StateEncoder<G::State>,
    C: DualModel + ?Sized,
    H: DualModel + ?Sized,
{
    match challenger_side(index) {
        Player::First => worker.play_match(challenger, champion, seed),
        Player::Second => worker.play_match(champion, challenger, seed),
    }
}
