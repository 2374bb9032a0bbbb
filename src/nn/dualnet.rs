//! Multi-layer perceptron with a shared trunk and two heads.
//!
//! ```text
//! input ─► [dense + ReLU] x shared_layers ─┬─► dense ─► softmax   (policy)
//!                                          └─► dense + ReLU ─► dense ─► tanh (value)
//! ```
//!
//! Trained with plain SGD and L2 weight decay on
//! `cross_entropy(pi, p) + (z - v)^2`, averaged over the batch. Every layer
//! works on whole batches as `ndarray` matrices, one row per example.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::core::{Error, GameRng, Result};
use crate::nn::traits::{DualModel, EncodedState, TrainLoss, TrainableModel};
use crate::training::TrainingExample;

/// Architecture and optimiser settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NNConfig {
    /// Input vector length (encoder output).
    pub input_len: usize,

    /// Policy output length (game action space).
    pub action_space: usize,

    /// Feature channels per cell in the input encoding.
    pub features: usize,

    /// Width multiplier: hidden layers have `k * input_len` units.
    pub k: usize,

    /// Depth of the shared trunk.
    pub shared_layers: usize,

    /// Examples per gradient step.
    pub batch_size: usize,

    /// SGD step size.
    pub learning_rate: f32,

    /// L2 weight decay coefficient.
    pub l2: f32,

    /// Seed for weight initialisation.
    pub seed: u64,
}

impl Default for NNConfig {
    fn default() -> Self {
        Self::for_board(3, 3, 9)
    }
}

impl NNConfig {
    /// Config for a `width` x `height` board encoded with two feature
    /// channels.
    pub fn for_board(width: usize, height: usize, action_space: usize) -> Self {
        let features = 2;
        Self {
            input_len: features * width * height,
            action_space,
            features,
            k: 3,
            shared_layers: 3,
            batch_size: 100,
            learning_rate: 0.01,
            l2: 1e-4,
            seed: 0,
        }
    }

    /// Set the width multiplier.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the trunk depth.
    pub fn with_shared_layers(mut self, layers: usize) -> Self {
        self.shared_layers = layers;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the initialisation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Units in each hidden layer.
    #[must_use]
    pub fn hidden_width(&self) -> usize {
        self.k * self.input_len
    }

    /// Check the settings describe a buildable network.
    pub fn validate(&self) -> Result<()> {
        if self.input_len == 0 || self.action_space == 0 {
            return Err(Error::Config("input and action space must be non-empty".into()));
        }
        if self.features == 0 || self.input_len % self.features != 0 {
            return Err(Error::Config(format!(
                "input length {} is not a multiple of {} feature channels",
                self.input_len, self.features
            )));
        }
        if self.k == 0 || self.batch_size == 0 {
            return Err(Error::Config("k and batch size must be positive".into()));
        }
        if !(self.learning_rate > 0.0) || !(self.l2 >= 0.0) {
            return Err(Error::Config("learning rate must be positive, l2 non-negative".into()));
        }
        Ok(())
    }
}

/// Fully connected layer, `y = x W + b` with `W` shaped `[inputs, outputs]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Dense {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

/// Parameter gradients of one `Dense` layer.
struct Gradient {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Gradient {
    fn is_finite(&self) -> bool {
        self.weights.iter().chain(self.bias.iter()).all(|v| v.is_finite())
    }
}

impl Dense {
    /// He-uniform initialisation.
    fn new(inputs: usize, outputs: usize, rng: &mut GameRng) -> Self {
        let limit = (6.0 / inputs as f32).sqrt();
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range_f32(-limit, limit)),
            bias: Array1::zeros(outputs),
        }
    }

    fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weights) + &self.bias
    }

    /// Gradients for a batch given `delta = dL/dy`, plus `dL/dx`.
    fn backward(&self, x: &Array2<f32>, delta: &Array2<f32>) -> (Gradient, Array2<f32>) {
        let grad = Gradient {
            weights: x.t().dot(delta),
            bias: delta.sum_axis(Axis(0)),
        };
        (grad, delta.dot(&self.weights.t()))
    }

    fn descend(&mut self, grad: &Gradient, lr: f32, l2: f32) {
        let decay = 1.0 - lr * l2;
        self.weights.mapv_inplace(|w| w * decay);
        self.weights.scaled_add(-lr, &grad.weights);
        self.bias.scaled_add(-lr, &grad.bias);
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}

fn relu(x: Array2<f32>) -> Array2<f32> {
    x.mapv_into(|v| v.max(0.0))
}

/// Zero the gradient wherever the ReLU output was clamped.
fn relu_backward(grad: Array2<f32>, output: &Array2<f32>) -> Array2<f32> {
    grad * &output.mapv(|a| if a > 0.0 { 1.0 } else { 0.0 })
}

/// Row-wise softmax.
fn softmax(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    logits
}

/// Intermediate values of one batched forward pass, kept for backprop.
struct Activations {
    /// Trunk activations; `trunk[0]` is the input.
    trunk: Vec<Array2<f32>>,
    policy: Array2<f32>,
    value_hidden: Array2<f32>,
    value: Array1<f32>,
}

impl Activations {
    fn features(&self) -> &Array2<f32> {
        &self.trunk[self.trunk.len() - 1]
    }
}

/// Dual-headed network.
///
/// Cloning copies the full parameter set, which is how a challenger is
/// derived from the champion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DualNet {
    config: NNConfig,
    trunk: Vec<Dense>,
    policy_head: Dense,
    value_hidden: Dense,
    value_out: Dense,
    version: u64,
}

impl DualNet {
    /// Build a freshly initialised network.
    pub fn new(config: NNConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = GameRng::new(config.seed);
        let hidden = config.hidden_width();

        let mut trunk = Vec::with_capacity(config.shared_layers);
        let mut width = config.input_len;
        for _ in 0..config.shared_layers {
            trunk.push(Dense::new(width, hidden, &mut rng));
            width = hidden;
        }

        let policy_head = Dense::new(width, config.action_space, &mut rng);
        let value_hidden = Dense::new(width, hidden, &mut rng);
        let value_out = Dense::new(hidden, 1, &mut rng);

        Ok(Self {
            config,
            trunk,
            policy_head,
            value_hidden,
            value_out,
            version: 0,
        })
    }

    /// Architecture settings.
    #[must_use]
    pub fn config(&self) -> &NNConfig {
        &self.config
    }

    /// Number of gradient steps applied since initialisation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total trainable parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.trunk
            .iter()
            .chain([&self.policy_head, &self.value_hidden, &self.value_out])
            .map(Dense::parameter_count)
            .sum()
    }

    fn forward(&self, input: Array2<f32>) -> Activations {
        let mut trunk = Vec::with_capacity(self.trunk.len() + 1);
        trunk.push(input);
        for layer in &self.trunk {
            let next = relu(layer.forward(&trunk[trunk.len() - 1]));
            trunk.push(next);
        }

        let features = &trunk[trunk.len() - 1];
        let policy = softmax(self.policy_head.forward(features));
        let value_hidden = relu(self.value_hidden.forward(features));
        let value = self
            .value_out
            .forward(&value_hidden)
            .column(0)
            .mapv(f32::tanh);

        Activations {
            trunk,
            policy,
            value_hidden,
            value,
        }
    }

    fn check_example(&self, example: &TrainingExample) -> Result<()> {
        if example.state.len() != self.config.input_len {
            return Err(Error::Inference(format!(
                "example has {} features, expected {}",
                example.state.len(),
                self.config.input_len
            )));
        }
        if example.policy.len() != self.config.action_space {
            return Err(Error::Inference(format!(
                "policy target has {} entries, expected {}",
                example.policy.len(),
                self.config.action_space
            )));
        }
        Ok(())
    }
}

/// Stack row vectors into a `[rows, width]` matrix.
fn stack<'a>(
    rows: impl Iterator<Item = &'a [f32]>,
    count: usize,
    width: usize,
) -> Result<Array2<f32>> {
    let data: Vec<f32> = rows.flat_map(|r| r.iter().copied()).collect();
    Array2::from_shape_vec((count, width), data)
        .map_err(|e| Error::Inference(format!("cannot shape batch: {e}")))
}

impl DualModel for DualNet {
    fn input_len(&self) -> usize {
        self.config.input_len
    }

    fn action_space(&self) -> usize {
        self.config.action_space
    }

    fn predict(&self, encoded: &EncodedState) -> Result<(Vec<f32>, f32)> {
        if encoded.len() != self.config.input_len {
            return Err(Error::Inference(format!(
                "input has {} features, expected {}",
                encoded.len(),
                self.config.input_len
            )));
        }
        let input = stack(std::iter::once(encoded.tensor.as_slice()), 1, self.config.input_len)?;
        let out = self.forward(input);
        Ok((out.policy.row(0).to_vec(), out.value[0]))
    }
}

impl TrainableModel for DualNet {
    /// One SGD step. On error the parameters and version are untouched.
    fn train_step(&mut self, batch: &[TrainingExample]) -> Result<TrainLoss> {
        if batch.is_empty() {
            return Err(Error::Precondition("training batch is empty".into()));
        }
        for example in batch {
            self.check_example(example)?;
        }

        let n = batch.len();
        let scale = 1.0 / n as f32;
        let (width, actions) = (self.config.input_len, self.config.action_space);
        let inputs = stack(batch.iter().map(|e| e.state.tensor.as_slice()), n, width)?;
        let targets = stack(batch.iter().map(|e| e.policy.as_slice()), n, actions)?;
        let values: Array1<f32> = batch.iter().map(|e| e.value).collect();

        let act = self.forward(inputs);

        let log_policy = act.policy.mapv(|p| p.max(1e-12).ln());
        let error = &act.value - &values;
        let loss = TrainLoss {
            policy: -(&targets * &log_policy).sum() * scale,
            value: error.mapv(|e| e * e).sum() * scale,
        };

        // Policy head: d(CE)/d(logits) = p - pi
        let policy_delta = (&act.policy - &targets) * scale;
        let (policy_grad, from_policy) = self.policy_head.backward(act.features(), &policy_delta);

        // Value head: d((z - v)^2)/d(pre-tanh) = 2 (v - z)(1 - v^2)
        let value_delta =
            (&error * &act.value.mapv(|v| 1.0 - v * v) * (2.0 * scale)).insert_axis(Axis(1));
        let (value_out_grad, grad_hidden) = self.value_out.backward(&act.value_hidden, &value_delta);
        let grad_hidden = relu_backward(grad_hidden, &act.value_hidden);
        let (value_hidden_grad, from_value) = self.value_hidden.backward(act.features(), &grad_hidden);

        // Trunk, last layer first
        let mut grad_features = from_policy + &from_value;
        let mut trunk_grads = Vec::with_capacity(self.trunk.len());
        for (i, layer) in self.trunk.iter().enumerate().rev() {
            let delta = relu_backward(grad_features, &act.trunk[i + 1]);
            let (grad, grad_in) = layer.backward(&act.trunk[i], &delta);
            trunk_grads.push(grad);
            grad_features = grad_in;
        }
        trunk_grads.reverse();

        let head_grads = [&policy_grad, &value_hidden_grad, &value_out_grad];
        if !loss.total().is_finite()
            || !trunk_grads.iter().chain(head_grads).all(Gradient::is_finite)
        {
            return Err(Error::Inference(format!("training diverged: {loss:?}")));
        }

        let (lr, l2) = (self.config.learning_rate, self.config.l2);
        for (layer, grad) in self.trunk.iter_mut().zip(&trunk_grads) {
            layer.descend(grad, lr, l2);
        }
        self.policy_head.descend(&policy_grad, lr, l2);
        self.value_hidden.descend(&value_hidden_grad, lr, l2);
        self.value_out.descend(&value_out_grad, lr, l2);
        self.version += 1;

        Ok(loss)
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Player;

    fn small_config() -> NNConfig {
        NNConfig::for_board(3, 3, 9).with_k(1).with_shared_layers(2).with_seed(7)
    }

    fn example(policy_cell: usize, value: f32) -> TrainingExample {
        let mut policy = vec![0.0; 9];
        policy[policy_cell] = 1.0;
        let mut tensor = vec![0.001; 18];
        tensor[policy_cell] = 1.0;
        for v in tensor.iter_mut().skip(9) {
            *v = 1.0;
        }
        TrainingExample {
            state: EncodedState::new(tensor, vec![2, 9]),
            policy,
            value,
            player: Player::First,
            ply: 0,
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = NNConfig::for_board(6, 6, 36);
        assert_eq!(config.input_len, 72);
        assert_eq!(config.features, 2);
        assert_eq!(config.k, 3);
        assert_eq!(config.shared_layers, 3);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.hidden_width(), 216);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = small_config();
        config.input_len = 17;
        assert!(matches!(DualNet::new(config), Err(Error::Config(_))));

        let config = small_config().with_batch_size(0);
        assert!(DualNet::new(config).is_err());

        let config = small_config().with_learning_rate(0.0);
        assert!(DualNet::new(config).is_err());
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = DualNet::new(small_config()).unwrap();
        let b = DualNet::new(small_config()).unwrap();
        let c = DualNet::new(small_config().with_seed(8)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parameter_count() {
        let net = DualNet::new(small_config()).unwrap();
        // trunk 18->18, 18->18; policy 18->9; value 18->18->1
        let expected = 2 * (18 * 18 + 18) + (18 * 9 + 9) + (18 * 18 + 18) + (18 + 1);
        assert_eq!(net.parameter_count(), expected);
    }

    #[test]
    fn test_predict_outputs() {
        let net = DualNet::new(small_config()).unwrap();
        let (policy, value) = net.predict(&example(0, 1.0).state).unwrap();

        assert_eq!(policy.len(), 9);
        assert!((policy.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(policy.iter().all(|&p| p >= 0.0));
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn test_predict_rejects_wrong_input() {
        let net = DualNet::new(small_config()).unwrap();
        let err = net.predict(&EncodedState::zeros(vec![5])).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = DualNet::new(small_config().with_learning_rate(0.05)).unwrap();
        let batch = vec![example(4, 1.0), example(0, -1.0), example(8, 0.0)];

        let first = net.train_step(&batch).unwrap();
        let mut last = first;
        for _ in 0..200 {
            last = net.train_step(&batch).unwrap();
        }

        assert!(last.total() < first.total(), "{last:?} !< {first:?}");
        assert_eq!(net.version(), 201);

        let (policy, value) = net.predict(&batch[0].state).unwrap();
        let best = policy
            .iter()
            .enumerate()
            .fold(0, |best, (i, &p)| if p > policy[best] { i } else { best });
        assert_eq!(best, 4);
        assert!(value > 0.0);
    }

    #[test]
    fn test_train_step_rejects_bad_batches() {
        let mut net = DualNet::new(small_config()).unwrap();
        assert!(net.train_step(&[]).is_err());

        let mut bad = example(0, 0.0);
        bad.policy.truncate(3);
        assert!(matches!(net.train_step(&[bad]), Err(Error::Inference(_))));
        assert_eq!(net.version(), 0);
    }

    #[test]
    fn test_diverged_step_leaves_model_unchanged() {
        let mut net = DualNet::new(small_config()).unwrap();
        let before = net.clone();

        let err = net.train_step(&[example(1, f32::INFINITY)]).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert_eq!(net, before);
        assert_eq!(net.version(), 0);

        // NaN input
        let mut poisoned = example(1, 0.5);
        poisoned.state.tensor[3] = f32::NAN;
        assert!(net.train_step(&[poisoned]).is_err());
        assert_eq!(net, before);

        net.train_step(&[example(1, 0.5)]).unwrap();
        assert_eq!(net.version(), 1);
    }

    #[test]
    fn test_batch_matches_single_predictions() {
        let net = DualNet::new(small_config()).unwrap();
        let batch = vec![example(4, 1.0), example(0, -1.0)];
        let inputs = stack(batch.iter().map(|e| e.state.tensor.as_slice()), 2, 18).unwrap();
        let act = net.forward(inputs);

        for (i, e) in batch.iter().enumerate() {
            let (policy, value) = net.predict(&e.state).unwrap();
            for (a, b) in policy.iter().zip(act.policy.row(i)) {
                assert!((a - b).abs() < 1e-6);
            }
            assert!((value - act.value[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let champion = DualNet::new(small_config()).unwrap();
        let mut challenger = champion.clone();
        challenger.train_step(&[example(2, 1.0)]).unwrap();

        assert_ne!(champion, challenger);
        assert_eq!(champion.version(), 0);
    }
}
