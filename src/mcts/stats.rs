//! MCTS search statistics for diagnostics and tuning.

use serde::{Deserialize, Serialize};

/// Statistics collected during one search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Simulations completed.
    pub simulations: u32,

    /// Nodes expanded (added to tree).
    pub nodes_expanded: u32,

    /// Model evaluations, including the root.
    pub model_calls: u32,

    /// Simulations that ended on a pass edge without descending.
    pub pass_cutoffs: u32,

    /// Maximum depth reached during search.
    pub max_depth: u16,

    /// Stopped by the timeout before the budget ran out.
    pub timed_out: bool,

    /// Total time spent searching (microseconds).
    pub time_us: u64,
}

impl SearchStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate simulations per second.
    #[must_use]
    pub fn simulations_per_second(&self) -> f64 {
        if self.time_us == 0 {
            0.0
        } else {
            self.simulations as f64 / (self.time_us as f64 / 1_000_000.0)
        }
    }

    /// Average nodes added per simulation.
    #[must_use]
    pub fn avg_nodes_per_simulation(&self) -> f64 {
        if self.simulations == 0 {
            0.0
        } else {
            self.nodes_expanded as f64 / self.simulations as f64
        }
    }
}
