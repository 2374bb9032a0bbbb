//! Episodes and experience buffer for training data collection.
//!
//! An episode records a complete self-play game, capturing:
//! - Encoded positions at each decision point
//! - Search visit distributions (the policy targets)
//! - Moves actually played
//! - Final game outcome for value targets

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::{GameRng, Player};
use crate::nn::EncodedState;
use crate::rules::GameResult;

/// One supervised example for the dual model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Encoded position before the move.
    pub state: EncodedState,

    /// Search visit distribution over the full action space.
    pub policy: Vec<f32>,

    /// Game outcome from `player`'s point of view: +1, 0 or -1.
    /// Zero until the episode finishes.
    pub value: f32,

    /// Player to move in this position.
    pub player: Player,

    /// Ply at which the position occurred (0-indexed).
    pub ply: usize,
}

impl TrainingExample {
    /// Create an example whose value target is not yet known.
    pub fn new(state: EncodedState, policy: Vec<f32>, player: Player, ply: usize) -> Self {
        Self {
            state,
            policy,
            value: 0.0,
            player,
            ply,
        }
    }
}

/// A complete self-play game.
#[derive(Clone, Debug)]
pub struct Episode<S, M> {
    /// One example per ply, in play order.
    pub examples: Vec<TrainingExample>,

    /// Position and move played at each ply, for rendering.
    pub record: Vec<(S, M)>,

    /// Final result, `None` until the game is finished.
    pub result: Option<GameResult>,

    /// Random seed used for this game.
    pub seed: u64,
}

impl<S, M> Episode<S, M> {
    /// Create an empty episode.
    pub fn new(seed: u64) -> Self {
        Self {
            examples: Vec::new(),
            record: Vec::new(),
            result: None,
            seed,
        }
    }

    /// Add a ply.
    pub fn push(&mut self, example: TrainingExample, state: S, mv: M) {
        self.examples.push(example);
        self.record.push((state, mv));
    }

    /// Set the outcome and back-fill every value target.
    pub fn finish(&mut self, result: GameResult) {
        for example in &mut self.examples {
            example.value = result.value_for(example.player);
        }
        self.result = Some(result);
    }

    /// Number of plies played.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Check if no ply was played.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Get examples for a specific player.
    pub fn player_examples(&self, player: Player) -> impl Iterator<Item = &TrainingExample> {
        self.examples.iter().filter(move |e| e.player == player)
    }
}

/// Pool of training examples.
///
/// Uses a FIFO strategy: when full, the oldest examples are removed.
#[derive(Clone, Debug)]
pub struct ExperienceBuffer {
    examples: VecDeque<TrainingExample>,
    max_examples: usize,
}

impl ExperienceBuffer {
    /// Create a new experience buffer.
    pub fn new(max_examples: usize) -> Self {
        Self {
            examples: VecDeque::with_capacity(max_examples.min(1 << 16)),
            max_examples,
        }
    }

    /// Add one example, evicting the oldest if the buffer is full.
    pub fn push(&mut self, example: TrainingExample) {
        if self.max_examples == 0 {
            return;
        }
        if self.examples.len() >= self.max_examples {
            self.examples.pop_front();
        }
        self.examples.push_back(example);
    }

    /// Add every example of a finished episode.
    pub fn push_episode<S, M>(&mut self, episode: Episode<S, M>) {
        for example in episode.examples {
            self.push(example);
        }
    }

    /// Get the number of examples in the buffer.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Get the maximum capacity.
    pub fn capacity(&self) -> usize {
        self.max_examples
    }

    /// Clear all examples.
    pub fn clear(&mut self) {
        self.examples.clear();
    }

    /// Get an iterator over examples.
    pub fn iter(&self) -> impl Iterator<Item = &TrainingExample> {
        self.examples.iter()
    }

    /// Draw up to `batch_size` distinct examples.
    ///
    /// Uses the provided RNG seed for reproducibility.
    pub fn sample_batch(&self, batch_size: usize, seed: u64) -> Vec<TrainingExample> {
        if self.examples.is_empty() || batch_size == 0 {
            return vec![];
        }

        let mut rng = GameRng::new(seed);

        // Fisher-Yates shuffle first `batch_size` elements
        let mut indices: Vec<usize> = (0..self.examples.len()).collect();
        let n = indices.len();
        let limit = batch_size.min(n);

        for i in 0..limit {
            let j = i + rng.gen_range_usize(0..n - i);
            indices.swap(i, j);
        }

        indices
            .into_iter()
            .take(limit)
            .map(|i| self.examples[i].clone())
            .collect()
    }
}

impl Default for ExperienceBuffer {
    fn default() -> Self {
        Self::new(100_000)
    }
}
