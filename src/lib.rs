//! # rust-azero
//!
//! AlphaZero-style self-play training for two-player, perfect-information
//! board games.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: Search and training only see the `Game` trait.
//!    Rules, encodings and renderers plug in from outside.
//!
//! 2. **Explicit Ownership**: The trainer owns the champion and the
//!    challenger as plain values. Search trees live for one search call.
//!
//! 3. **Deterministic by Seed**: Every source of randomness is a seeded
//!    `GameRng`, so a run is reproducible from its configuration.
//!
//! ## Architecture
//!
//! - **PUCT MCTS**: One model query per expanded node, negamax backup.
//!
//! - **Persistent Data Structures**: Board states use `im-rs` vectors, so
//!   successor positions share structure with their parents.
//!
//! - **Parallel Games**: Self-play and arena games run on `rayon`; the
//!   champion is shared read-only, the challenger trained exclusively.
//!
//! ## Modules
//!
//! - `core`: Players, RNG, errors
//! - `rules`: `Game` trait for game implementations
//! - `games`: Concrete games (m,n,k)
//! - `nn`: State encoders, model traits, `DualNet`
//! - `mcts`: Monte Carlo Tree Search
//! - `training`: Self-play, arena, trainer loop, configuration
//! - `checkpoint`: Model persistence
//! - `render`: Game record output

pub mod core;
pub mod rules;
pub mod games;
pub mod nn;
pub mod mcts;
pub mod training;
pub mod checkpoint;
pub mod render;

// Re-export commonly used types
pub use crate::core::{Error, GameRng, Phase, Player, Result};

pub use crate::rules::{Game, GameResult};

pub use crate::games::mnk::{MnkGame, MnkGameBuilder, MnkMove, MnkState};

pub use crate::nn::{
    BoardEncoder, BoardView, DualModel, DualNet, EncodedState, FnEncoder, NNConfig, Prediction,
    StateEncoder, TrainLoss, TrainableModel, UniformModel,
};

pub use crate::mcts::{
    MCTSConfig, MCTSSearch, MCTSTree, MCTSNode, NodeId, Edge,
    PassPreference, SearchResult, SearchStats, TreeStats,
    SelectionPolicy, PUCT,
};

pub use crate::training::{
    AgentConfig, ArenaResult, Episode, EpochReport, ExperienceBuffer, LearnReport,
    SelfPlayConfig, SelfPlayWorker, Trainer, TrainerConfig, TrainingExample,
};

pub use crate::checkpoint::{
    CheckpointHandle, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
};

pub use crate::render::{GameRenderer, TextRenderer};
