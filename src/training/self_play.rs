//! Self-play loop for generating training data.
//!
//! Plays games with MCTS guided by a model and turns every ply into a
//! training example whose value target is back-filled once the game ends.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{Error, GameRng, Player, Result};
use crate::mcts::MCTSSearch;
use crate::nn::{DualModel, StateEncoder};
use crate::rules::Game;

use super::trajectory::{Episode, TrainingExample};

/// Configuration for self-play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelfPlayConfig {
    /// Maximum plies per game before it is abandoned as a runaway.
    pub max_moves: usize,

    /// Opening plies whose move is sampled from the visit distribution.
    pub random_count: usize,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            max_moves: 500,
            random_count: 0,
        }
    }
}

impl SelfPlayConfig {
    /// Create a new self-play config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum plies per game.
    pub fn with_max_moves(mut self, max: usize) -> Self {
        self.max_moves = max;
        self
    }

    /// Set the exploration floor.
    pub fn with_random_count(mut self, count: usize) -> Self {
        self.random_count = count;
        self
    }
}

/// Worker for running self-play and match games.
///
/// Borrows a shared search context; every game builds its own trees and
/// RNG, so one worker can be used from many threads.
pub struct SelfPlayWorker<'a, G: Game, E> {
    /// Search context (game, encoder, MCTS settings).
    search: &'a MCTSSearch<G, E>,

    /// Self-play configuration.
    config: SelfPlayConfig,
}

impl<'a, G, E> SelfPlayWorker<'a, G, E>
where
    G: Game,
    E: StateEncoder<G::State>,
{
    /// Create a new self-play worker.
    pub fn new(search: &'a MCTSSearch<G, E>, config: SelfPlayConfig) -> Self {
        Self { search, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SelfPlayConfig {
        &self.config
    }

    /// Play one game with `model` moving for both sides.
    pub fn play_episode<M>(&self, model: &M, seed: u64) -> Result<Episode<G::State, G::Move>>
    where
        M: DualModel + ?Sized,
    {
        self.play_match(model, model, seed)
    }

    /// Play one game between two models.
    ///
    /// Every ply still yields an example, so match games can be inspected
    /// or rendered exactly like self-play games.
    pub fn play_match<A, B>(
        &self,
        first: &A,
        second: &B,
        seed: u64,
    ) -> Result<Episode<G::State, G::Move>>
    where
        A: DualModel + ?Sized,
        B: DualModel + ?Sized,
    {
        let game = self.search.game();
        let mut rng = GameRng::new(seed);
        let mut state = game.initial_state();
        let mut episode = Episode::new(seed);

        let mut ply = 0;
        while !game.is_terminal(&state) {
            if ply >= self.config.max_moves {
                return Err(Error::Precondition(format!(
                    "game exceeded {} moves",
                    self.config.max_moves
                )));
            }

            let player = game.to_move(&state);
            let result = match player {
                Player::First => self.search.search(&state, first)?,
                Player::Second => self.search.search(&state, second)?,
            };
            let mv = result.select_move(ply, self.config.random_count, &mut rng);

            let example = TrainingExample::new(
                self.search.encoder().encode(&state),
                result.policy,
                player,
                ply,
            );
            let next = game.apply(&state, mv)?;
            episode.push(example, state, mv);
            state = next;
            ply += 1;
        }

        let outcome = game
            .result(&state)
            .ok_or_else(|| Error::Precondition("game ended without a result".into()))?;
        episode.finish(outcome);

        debug!("game {seed:#x}: {ply} plies, {outcome:?}");
        Ok(episode)
    }
}
