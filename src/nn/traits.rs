//! Model traits for policy and value prediction.
//!
//! These traits define the contract between search/training and any
//! dual-headed model implementation.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::training::TrainingExample;

/// Encoded game state as a flat tensor for model input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodedState {
    /// Flattened tensor data (row-major order).
    pub tensor: Vec<f32>,

    /// Shape of the tensor (e.g., [channels, cells] or [features]).
    pub shape: Vec<usize>,
}

impl EncodedState {
    /// Create a new encoded state.
    pub fn new(tensor: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(
            tensor.len(),
            shape.iter().product::<usize>(),
            "Tensor length must match shape product"
        );
        Self { tensor, shape }
    }

    /// Create a zero-filled encoded state with the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            tensor: vec![0.0; size],
            shape,
        }
    }

    /// Get the total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    /// Check if the tensor is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }
}

/// Output of one model evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Move probabilities over the whole action space. Illegal entries are
    /// zero and legal entries sum to 1.
    pub policy: Vec<f32>,

    /// Position value in [-1, 1] for the player to move.
    pub value: f32,
}

/// Restrict a raw distribution to the legal moves.
///
/// Illegal entries are zeroed and the legal ones rescaled to sum to 1.
/// Negative or non-finite legal entries count as zero. When no legal entry
/// keeps any mass, the distribution is uniform over the legal moves.
#[must_use]
pub fn mask_policy(raw: &[f32], legal: &[usize]) -> Vec<f32> {
    let mut policy = vec![0.0f32; raw.len()];
    let mut total = 0.0f32;

    for &i in legal {
        let p = raw[i];
        if p.is_finite() && p > 0.0 {
            policy[i] = p;
            total += p;
        }
    }

    if total > 0.0 {
        for &i in legal {
            policy[i] /= total;
        }
    } else if !legal.is_empty() {
        let uniform = 1.0 / legal.len() as f32;
        for &i in legal {
            policy[i] = uniform;
        }
    }

    policy
}

/// Dual-headed model: move probabilities plus a position value.
///
/// `predict` takes `&self`, so a model can serve many searches at once.
pub trait DualModel: Send + Sync {
    /// Expected input length.
    fn input_len(&self) -> usize;

    /// Length of the policy output.
    fn action_space(&self) -> usize;

    /// Raw prediction: unmasked probabilities over the action space and a
    /// value for the player to move.
    fn predict(&self, encoded: &EncodedState) -> Result<(Vec<f32>, f32)>;

    /// Checked prediction restricted to `legal` policy indices.
    ///
    /// Fails with `Error::Inference` when the model output is malformed.
    fn infer(&self, encoded: &EncodedState, legal: &[usize]) -> Result<Prediction> {
        if encoded.len() != self.input_len() {
            return Err(Error::Inference(format!(
                "input has {} features, expected {}",
                encoded.len(),
                self.input_len()
            )));
        }

        let (raw, value) = self.predict(encoded)?;

        if raw.len() != self.action_space() {
            return Err(Error::Inference(format!(
                "policy has {} entries, expected {}",
                raw.len(),
                self.action_space()
            )));
        }
        if let Some(&bad) = legal.iter().find(|&&i| i >= raw.len()) {
            return Err(Error::Inference(format!(
                "legal move index {bad} outside action space {}",
                raw.len()
            )));
        }
        if !value.is_finite() {
            return Err(Error::Inference(format!("value is {value}")));
        }

        Ok(Prediction {
            policy: mask_policy(&raw, legal),
            value: value.clamp(-1.0, 1.0),
        })
    }
}

/// Losses reported by one training step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainLoss {
    /// Mean cross-entropy between target and predicted policy.
    pub policy: f32,
    /// Mean squared error between target and predicted value.
    pub value: f32,
}

impl TrainLoss {
    /// Combined objective.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.policy + self.value
    }
}

/// A model that can be updated from self-play examples.
///
/// `train_step` takes `&mut self`: training is a single-writer operation
/// and can never overlap inference on the same instance.
pub trait TrainableModel: DualModel + Clone {
    /// One gradient step on a batch.
    fn train_step(&mut self, batch: &[TrainingExample]) -> Result<TrainLoss>;

    /// Preferred batch size.
    fn batch_size(&self) -> usize;
}

/// Uniform policy and zero value (baseline for testing).
#[derive(Clone, Debug, Default)]
pub struct UniformModel {
    input_len: usize,
    action_space: usize,
}

impl UniformModel {
    /// Create a new baseline model.
    pub fn new(input_len: usize, action_space: usize) -> Self {
        Self {
            input_len,
            action_space,
        }
    }
}

impl DualModel for UniformModel {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn action_space(&self) -> usize {
        self.action_space
    }

    fn predict(&self, _encoded: &EncodedState) -> Result<(Vec<f32>, f32)> {
        if self.action_space == 0 {
            return Ok((vec![], 0.0));
        }
        let prob = 1.0 / self.action_space as f32;
        Ok((vec![prob; self.action_space], 0.0))
    }
}
