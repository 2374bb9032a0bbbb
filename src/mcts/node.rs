//! MCTS node and edge structures.
//!
//! Uses arena-based allocation with index references (NodeId) so a tree
//! is one flat allocation, dropped as a whole after each search.

use smallvec::SmallVec;

use crate::core::Player;

use super::config::PassPreference;

/// Index into the MCTSTree node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Create a new node ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Get the raw index value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NodeId(NONE)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// Edge representing a move from a parent node to a child.
#[derive(Clone, Debug)]
pub struct Edge<M> {
    /// The move this edge represents.
    pub mv: M,

    /// Policy index of the move.
    pub index: usize,

    /// Child node (NONE if not yet expanded).
    pub child: NodeId,

    /// Visit count N.
    pub visits: u32,

    /// Accumulated value W, from the perspective of the player moving at
    /// the parent.
    pub total_value: f64,

    /// Prior probability P from the model.
    pub prior: f32,

    /// Whether the move is a pass.
    pub is_pass: bool,
}

impl<M> Edge<M> {
    /// Create an unvisited edge.
    pub fn new(mv: M, index: usize, prior: f32) -> Self {
        Self {
            mv,
            index,
            child: NodeId::NONE,
            visits: 0,
            total_value: 0.0,
            prior,
            is_pass: false,
        }
    }

    /// Mark the edge as a pass move.
    pub fn with_pass(mut self, is_pass: bool) -> Self {
        self.is_pass = is_pass;
        self
    }

    /// Mean value Q = W / N, 0 when unvisited.
    #[must_use]
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_value / self.visits as f64
        }
    }

    /// Check if this edge has been expanded (child exists).
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        !self.child.is_none()
    }

    /// Record one backed-up value.
    #[inline]
    pub fn record(&mut self, value: f64) {
        self.visits += 1;
        self.total_value += value;
    }
}

/// A node in the MCTS tree.
#[derive(Clone, Debug)]
pub struct MCTSNode<M> {
    /// Parent node (NONE for root).
    pub parent: NodeId,

    /// Player to move at this node.
    pub to_move: Player,

    /// Depth in tree (root = 0).
    pub depth: u16,

    /// Total visits to this node.
    pub visits: u32,

    /// Model value estimate for `to_move` (0 until expanded).
    pub value_estimate: f32,

    /// Exact game value for `to_move`, set on terminal positions.
    pub terminal_value: Option<f32>,

    /// Outgoing edges in legal-move order.
    /// SmallVec optimizes for small branching factors.
    pub edges: SmallVec<[Edge<M>; 8]>,
}

impl<M> MCTSNode<M> {
    /// Create a new node.
    pub fn new(parent: NodeId, to_move: Player, depth: u16) -> Self {
        Self {
            parent,
            to_move,
            depth,
            visits: 0,
            value_estimate: 0.0,
            terminal_value: None,
            edges: SmallVec::new(),
        }
    }

    /// Create a root node.
    pub fn root(to_move: Player) -> Self {
        Self::new(NodeId::NONE, to_move, 0)
    }

    /// Check if this is a terminal game state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal_value.is_some()
    }

    /// Sum of edge visit counts.
    #[must_use]
    pub fn edge_visits(&self) -> u32 {
        self.edges.iter().map(|e| e.visits).sum()
    }

    /// Get the edge with the most visits, adjusted for `preference`.
    ///
    /// Ties keep the earliest edge unless `PreferPass` lets a pass win them.
    /// `DontPreferPass` skips pass edges while any other move exists.
    #[must_use]
    pub fn best_edge(&self, preference: PassPreference) -> Option<usize> {
        let skip_pass = preference == PassPreference::DontPreferPass && self.edges.len() > 1;
        let mut best: Option<usize> = None;
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.is_pass && skip_pass {
                continue;
            }
            let better = best.map_or(true, |b| {
                let best_visits = self.edges[b].visits;
                edge.visits > best_visits
                    || (edge.is_pass
                        && preference == PassPreference::PreferPass
                        && edge.visits == best_visits)
            });
            if better {
                best = Some(i);
            }
        }
        best
    }
}
