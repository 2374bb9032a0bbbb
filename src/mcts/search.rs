//! Core MCTS search algorithm.
//!
//! PUCT search guided by a dual model: each simulation descends to an
//! unexpanded edge, expands it with one model query (or the exact result
//! of a finished game) and backs the value up the path, flipping its sign
//! whenever the player to move changes.

use std::time::Instant;

use log::{log_enabled, trace, Level};

use crate::core::{Error, GameRng, Player, Result};
use crate::nn::{DualModel, StateEncoder};
use crate::rules::Game;

use super::config::MCTSConfig;
use super::node::{Edge, MCTSNode, NodeId};
use super::policy::{SelectionPolicy, PUCT};
use super::stats::SearchStats;
use super::tree::MCTSTree;

/// Upper bound on the nodes reserved up front; the arena grows past it.
const INITIAL_TREE_CAPACITY: usize = 4096;

/// Outcome of one search from a root position.
#[derive(Clone, Debug)]
pub struct SearchResult<M> {
    /// Move chosen by visit count and pass preference.
    pub best_move: M,

    /// Legal moves at the root, in legal-move order.
    pub moves: Vec<M>,

    /// Root edge visit counts, parallel to `moves`.
    pub visits: Vec<u32>,

    /// Visit distribution over the full action space. Illegal moves are 0
    /// and the entries sum to 1.
    pub policy: Vec<f32>,

    /// Mean backed-up value for the player to move at the root.
    pub root_value: f32,

    /// Search statistics.
    pub stats: SearchStats,
}

impl<M: Copy> SearchResult<M> {
    /// Total root visits (equals the simulations run).
    #[must_use]
    pub fn total_visits(&self) -> u32 {
        self.visits.iter().sum()
    }

    /// Move to play at `ply`.
    ///
    /// Before `random_count` plies the move is sampled in proportion to its
    /// visit count; from then on it is `best_move`.
    pub fn select_move(&self, ply: usize, random_count: usize, rng: &mut GameRng) -> M {
        if ply >= random_count {
            return self.best_move;
        }
        let weights: Vec<f32> = self.visits.iter().map(|&v| v as f32).collect();
        rng.choose_weighted(&weights)
            .map_or(self.best_move, |i| self.moves[i])
    }
}

/// Where a simulation stopped and what it found there.
struct Leaf {
    value: f32,
    perspective: Player,
}

/// Main MCTS search context.
///
/// Generic over the game and the encoder. A fresh tree is built for every
/// call to `search`, so one `MCTSSearch` can serve many concurrent games.
pub struct MCTSSearch<G: Game, E> {
    /// The game rules.
    game: G,

    /// Position encoder for model queries.
    encoder: E,

    /// Search configuration.
    config: MCTSConfig,

    /// Selection policy.
    selection: Box<dyn SelectionPolicy<G::Move>>,
}

impl<G, E> MCTSSearch<G, E>
where
    G: Game,
    E: StateEncoder<G::State>,
{
    /// Create a new MCTS search context.
    pub fn new(game: G, encoder: E, config: MCTSConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            game,
            encoder,
            config,
            selection: Box::new(PUCT),
        })
    }

    /// Set a custom selection policy.
    pub fn with_selection<S: SelectionPolicy<G::Move> + 'static>(mut self, selection: S) -> Self {
        self.selection = Box::new(selection);
        self
    }

    /// The game being searched.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// The encoder used for model queries.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Search configuration.
    pub fn config(&self) -> &MCTSConfig {
        &self.config
    }

    /// Run a search from `state`.
    ///
    /// Fails with `Error::Precondition` on a finished game and with
    /// `Error::Inference` when the model returns malformed output.
    pub fn search<M>(&self, state: &G::State, model: &M) -> Result<SearchResult<G::Move>>
    where
        M: DualModel + ?Sized,
    {
        if self.game.is_terminal(state) {
            return Err(Error::Precondition("search from a finished game".into()));
        }

        let start = Instant::now();
        let mut stats = SearchStats::new();
        let capacity = self
            .config
            .max_nodes
            .min(self.config.budget as usize + 1)
            .min(INITIAL_TREE_CAPACITY);
        let mut tree = MCTSTree::with_capacity(self.game.to_move(state), capacity);

        let root = tree.root();
        self.expand(&mut tree, root, state, model, &mut stats)?;

        for _ in 0..self.config.budget {
            if tree.len() >= self.config.max_nodes {
                break;
            }
            self.simulate(&mut tree, state, model, &mut stats)?;
            stats.simulations += 1;

            if let Some(timeout) = self.config.timeout {
                if start.elapsed() >= timeout {
                    stats.timed_out = stats.simulations < self.config.budget;
                    break;
                }
            }
        }

        stats.time_us = start.elapsed().as_micros() as u64;
        let result = self.build_result(&tree, stats);

        if log_enabled!(Level::Trace) {
            let shape = tree.stats();
            trace!(
                "search: {} simulations ({:.0}/s), {} nodes, {} terminal, branching {:.1}, value {:.3}, best {:?}",
                result.stats.simulations,
                result.stats.simulations_per_second(),
                shape.node_count,
                shape.terminal_count,
                shape.branching_factor(),
                result.root_value,
                result.best_move
            );
        }

        Ok(result)
    }

    /// One simulation: select, expand, back up.
    fn simulate<M>(
        &self,
        tree: &mut MCTSTree<G::Move>,
        root_state: &G::State,
        model: &M,
        stats: &mut SearchStats,
    ) -> Result<()>
    where
        M: DualModel + ?Sized,
    {
        let mut path: Vec<(NodeId, usize)> = Vec::new();
        let mut current = tree.root();
        let mut state = root_state.clone();

        // === SELECTION ===
        let leaf = loop {
            let node = tree.get(current);

            if let Some(value) = node.terminal_value {
                break Leaf {
                    value,
                    perspective: node.to_move,
                };
            }

            let edge_idx = self.selection.select(node, &self.config);
            path.push((current, edge_idx));

            let edge = &node.edges[edge_idx];
            let (mv, child, is_pass) = (edge.mv, edge.child, edge.is_pass);
            let mover = node.to_move;
            let estimate = node.value_estimate;

            state = self.game.apply(&state, mv)?;

            if is_pass && self.config.dumb_pass {
                stats.pass_cutoffs += 1;
                let value = match self.game.result(&state) {
                    Some(result) => result.value_for(mover),
                    None => estimate,
                };
                break Leaf {
                    value,
                    perspective: mover,
                };
            }

            if child.is_none() {
                // === EXPANSION ===
                let child = self.expand_child(tree, current, edge_idx, &state, model, stats)?;
                let node = tree.get(child);
                let value = node.terminal_value.unwrap_or(node.value_estimate);
                current = child;
                break Leaf {
                    value,
                    perspective: node.to_move,
                };
            }

            current = child;
        };

        // === BACKUP ===
        if !path.is_empty() && path[path.len() - 1].0 != current {
            tree.get_mut(current).visits += 1;
        }
        for &(node_id, edge_idx) in path.iter().rev() {
            let node = tree.get_mut(node_id);
            let value = if node.to_move == leaf.perspective {
                leaf.value
            } else {
                -leaf.value
            };
            node.visits += 1;
            node.edges[edge_idx].record(value as f64);
        }

        Ok(())
    }

    /// Fill in a node: exact value if the game is over, otherwise priors and
    /// a value estimate from one model query.
    fn expand<M>(
        &self,
        tree: &mut MCTSTree<G::Move>,
        node_id: NodeId,
        state: &G::State,
        model: &M,
        stats: &mut SearchStats,
    ) -> Result<()>
    where
        M: DualModel + ?Sized,
    {
        let to_move = tree.get(node_id).to_move;

        if let Some(result) = self.game.result(state) {
            tree.get_mut(node_id).terminal_value = Some(result.value_for(to_move));
            return Ok(());
        }

        let moves = self.game.legal_moves(state);
        if moves.is_empty() {
            return Err(Error::Precondition(
                "unfinished game with no legal moves".into(),
            ));
        }
        let indices: Vec<usize> = moves.iter().map(|&mv| self.game.move_index(mv)).collect();

        let prediction = model.infer(&self.encoder.encode(state), &indices)?;
        stats.model_calls += 1;

        let node = tree.get_mut(node_id);
        node.value_estimate = prediction.value;
        node.edges.extend(moves.into_iter().zip(indices).map(|(mv, index)| {
            Edge::new(mv, index, prediction.policy[index]).with_pass(self.game.is_pass(mv))
        }));

        stats.nodes_expanded += 1;
        Ok(())
    }

    /// Create and expand the child behind an edge.
    fn expand_child<M>(
        &self,
        tree: &mut MCTSTree<G::Move>,
        parent_id: NodeId,
        edge_idx: usize,
        state: &G::State,
        model: &M,
        stats: &mut SearchStats,
    ) -> Result<NodeId>
    where
        M: DualModel + ?Sized,
    {
        let depth = tree.get(parent_id).depth + 1;
        stats.max_depth = stats.max_depth.max(depth);

        let child = MCTSNode::new(parent_id, self.game.to_move(state), depth);
        let child_id = tree.alloc(child);
        tree.get_mut(parent_id).edges[edge_idx].child = child_id;

        self.expand(tree, child_id, state, model, stats)?;
        Ok(child_id)
    }

    fn build_result(&self, tree: &MCTSTree<G::Move>, stats: SearchStats) -> SearchResult<G::Move> {
        let root = tree.root_node();
        let best = root.best_edge(self.config.pass_preference).unwrap_or(0);

        let moves: Vec<G::Move> = root.edges.iter().map(|e| e.mv).collect();
        let visits: Vec<u32> = root.edges.iter().map(|e| e.visits).collect();
        let total = root.edge_visits();

        let mut policy = vec![0.0f32; self.game.action_space()];
        for edge in &root.edges {
            policy[edge.index] = if total > 0 {
                edge.visits as f32 / total as f32
            } else {
                edge.prior
            };
        }

        let root_value = if total > 0 {
            (root.edges.iter().map(|e| e.total_value).sum::<f64>() / total as f64) as f32
        } else {
            root.value_estimate
        };

        SearchResult {
            best_move: root.edges[best].mv,
            moves,
            visits,
            policy,
            root_value,
            stats,
        }
    }
}
