//! Monte Carlo Tree Search guided by a dual model.
//!
//! ## Overview
//!
//! - **PUCT selection**: priors from the model steer exploration
//! - **Model expansion**: one model query per new node, exact values on
//!   finished games
//! - **Negamax backup**: values flip sign whenever the mover changes
//! - **Budget and soft timeout**: a simulation count plus an optional
//!   wall-clock limit checked between simulations
//! - **Pass handling**: dumb pass and pass preference for games with passes
//!
//! ## Usage
//!
//! ```rust
//! use rust_azero::games::mnk::MnkGameBuilder;
//! use rust_azero::mcts::{MCTSConfig, MCTSSearch};
//! use rust_azero::nn::{BoardEncoder, UniformModel};
//! use rust_azero::rules::Game;
//!
//! let game = MnkGameBuilder::new().build().unwrap();
//! let config = MCTSConfig::default().with_budget(100).with_timeout(None);
//! let search = MCTSSearch::new(game.clone(), BoardEncoder::new(9), config).unwrap();
//!
//! let model = UniformModel::new(18, 9);
//! let result = search.search(&game.initial_state(), &model).unwrap();
//! assert_eq!(result.total_visits(), 100);
//!
//! // Visit distribution for training
//! for (mv, visits) in result.moves.iter().zip(&result.visits) {
//!     println!("{:?}: {}", mv, visits);
//! }
//! ```

pub mod config;
pub mod node;
pub mod policy;
pub mod search;
pub mod stats;
pub mod tree;

// Re-export main types
pub use config::{MCTSConfig, PassPreference};
pub use node::{Edge, MCTSNode, NodeId};
pub use policy::{SelectionPolicy, PUCT};
pub use search::{MCTSSearch, SearchResult};
pub use stats::SearchStats;
pub use tree::{MCTSTree, TreeStats};
