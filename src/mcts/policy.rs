//! Tree policy: which edge to follow during selection.

use super::config::MCTSConfig;
use super::node::MCTSNode;

/// Policy for selecting which child to explore.
pub trait SelectionPolicy<M>: Send + Sync {
    /// Select an edge index from a non-terminal node with at least one edge.
    fn select(&self, node: &MCTSNode<M>, config: &MCTSConfig) -> usize;
}

/// PUCT selection policy.
///
/// Uses prior probabilities from the model.
/// Formula: Q(a) + c * P(a) * sqrt(sum_b N(b)) / (1 + N(a))
///
/// Q is taken from the perspective of the player moving at the node, so
/// the same rule serves both players. Ties keep the earliest edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct PUCT;

impl PUCT {
    /// Score of one edge given the square root of its siblings' total visits.
    #[inline]
    #[must_use]
    pub fn score(q: f64, prior: f32, visits: u32, sqrt_total: f64, c_puct: f32) -> f64 {
        q + c_puct as f64 * prior as f64 * sqrt_total / (1.0 + visits as f64)
    }
}

impl<M: Send + Sync> SelectionPolicy<M> for PUCT {
    fn select(&self, node: &MCTSNode<M>, config: &MCTSConfig) -> usize {
        let sqrt_total = (node.edge_visits() as f64).sqrt();

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, edge) in node.edges.iter().enumerate() {
            let score = Self::score(
                edge.mean_value(),
                edge.prior,
                edge.visits,
                sqrt_total,
                config.c_puct,
            );
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }
}
