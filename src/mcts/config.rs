//! MCTS configuration parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// How pass moves are treated when picking the final move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassPreference {
    /// Never pick a pass unless it is the only legal move.
    #[default]
    DontPreferPass,
    /// Pick a pass when it ties the most visited move.
    PreferPass,
    /// Treat passes like any other move.
    DontCare,
}

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MCTSConfig {
    /// PUCT exploration constant (default: 1.0).
    /// Higher values trust the prior more than the running mean.
    pub c_puct: f32,

    /// Simulations per search (default: 1000).
    pub budget: u32,

    /// Soft wall-clock limit, checked between simulations.
    /// `None` runs the full budget.
    pub timeout: Option<Duration>,

    /// Do not search below pass moves.
    pub dumb_pass: bool,

    /// Pass handling for the final move choice.
    pub pass_preference: PassPreference,

    /// Plies at the start of a game whose move is sampled from the
    /// visit distribution instead of taken greedily.
    pub random_count: usize,

    /// Maximum nodes to allocate in one search tree.
    /// Prevents memory exhaustion on large searches.
    pub max_nodes: usize,
}

impl Default for MCTSConfig {
    fn default() -> Self {
        Self {
            c_puct: 1.0,
            budget: 1000,
            timeout: Some(Duration::from_millis(100)),
            dumb_pass: true,
            pass_preference: PassPreference::DontPreferPass,
            random_count: 0,
            max_nodes: 1_000_000,
        }
    }
}

impl MCTSConfig {
    /// Create a new config with custom exploration constant.
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    /// Create a new config with custom simulation budget.
    pub fn with_budget(mut self, budget: u32) -> Self {
        self.budget = budget;
        self
    }

    /// Create a new config with custom timeout (`None` disables it).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new config with dumb pass on or off.
    pub fn with_dumb_pass(mut self, dumb_pass: bool) -> Self {
        self.dumb_pass = dumb_pass;
        self
    }

    /// Create a new config with custom pass preference.
    pub fn with_pass_preference(mut self, preference: PassPreference) -> Self {
        self.pass_preference = preference;
        self
    }

    /// Create a new config with custom exploration floor.
    pub fn with_random_count(mut self, count: usize) -> Self {
        self.random_count = count;
        self
    }

    /// Create a new config with custom node cap.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.c_puct.is_finite() || self.c_puct < 0.0 {
            return Err(Error::Config(format!("c_puct must be finite and >= 0, got {}", self.c_puct)));
        }
        if self.budget == 0 {
            return Err(Error::Config("search budget must be at least 1".into()));
        }
        if self.max_nodes < 2 {
            return Err(Error::Config("max_nodes must allow the root and one child".into()));
        }
        Ok(())
    }
}
