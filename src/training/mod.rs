//! Training infrastructure.
//!
//! This module provides the data structures and loops of an
//! AlphaZero-style training pipeline.
//!
//! ## Overview
//!
//! - **TrainingExample / Episode**: one ply, one complete game
//! - **ExperienceBuffer**: pools examples and samples batches
//! - **SelfPlayWorker**: plays games with MCTS to generate episodes
//! - **ArenaResult**: champion versus challenger tally and promotion rule
//! - **Trainer**: the self-play / train / evaluate / promote loop
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rust_azero::checkpoint::FileCheckpointStore;
//! use rust_azero::games::mnk::MnkGameBuilder;
//! use rust_azero::nn::BoardEncoder;
//! use rust_azero::rules::Game;
//! use rust_azero::training::{AgentConfig, Trainer};
//!
//! let game = MnkGameBuilder::new().size(6).win_length(4).build().unwrap();
//! let config = AgentConfig::for_board("mnk", 6, 6, game.action_space());
//! let store = FileCheckpointStore::open("checkpoints").unwrap();
//!
//! let mut trainer = Trainer::new(game, BoardEncoder::new(36), &config, Box::new(store)).unwrap();
//! let report = trainer.learn(5, 30, 200, 30).unwrap();
//! println!("{} promotions", report.promotions());
//! trainer.save("example.model").unwrap();
//! ```

pub mod arena;
pub mod config;
pub mod self_play;
pub mod trainer;
pub mod trajectory;

// Re-export main types
pub use arena::{challenger_side, play_arena_game, ArenaResult};
pub use config::{AgentConfig, TrainerConfig};
pub use self_play::{SelfPlayConfig, SelfPlayWorker};
pub use trainer::{EpochReport, LearnReport, Trainer};
pub use trajectory::{Episode, ExperienceBuffer, TrainingExample};
