//! Dual-headed models and state encoding.
//!
//! ## Overview
//!
//! - **Traits**: `DualModel` (inference), `TrainableModel` (gradient steps)
//! - **Encoding**: `StateEncoder` trait, `BoardEncoder`, `FnEncoder`
//! - **Network**: `DualNet`, a shared-trunk perceptron with policy and value heads
//! - **Baseline**: `UniformModel` for testing
//!
//! ## Usage
//!
//! ```
//! use rust_azero::games::mnk::MnkGameBuilder;
//! use rust_azero::nn::{BoardEncoder, DualModel, DualNet, NNConfig, StateEncoder};
//! use rust_azero::rules::Game;
//!
//! let game = MnkGameBuilder::new().build().unwrap();
//! let encoder = BoardEncoder::new(9);
//! let net = DualNet::new(NNConfig::for_board(3, 3, game.action_space())).unwrap();
//!
//! let state = game.initial_state();
//! let prediction = net.infer(&encoder.encode(&state), &game.legal_indices(&state)).unwrap();
//! assert!((prediction.policy.iter().sum::<f32>() - 1.0).abs() < 1e-4);
//! ```

pub mod dualnet;
pub mod encoder;
pub mod traits;

// Re-export main types
pub use dualnet::{DualNet, NNConfig};
pub use encoder::{BoardEncoder, BoardView, FnEncoder, StateEncoder, EMPTY_EPSILON};
pub use traits::{
    mask_policy, DualModel, EncodedState, Prediction, TrainLoss, TrainableModel, UniformModel,
};
