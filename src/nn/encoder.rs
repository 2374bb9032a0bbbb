//! State encoding for model input.
//!
//! Transforms game positions into flat feature vectors.

use crate::core::Player;
use crate::nn::traits::EncodedState;

/// Read-only view of a grid board, enough to build board encodings.
pub trait BoardView {
    /// Cell contents in row-major order.
    fn cells(&self) -> Vec<Option<Player>>;

    /// Player to move.
    fn side_to_move(&self) -> Player;
}

/// Encodes game positions into feature vectors.
///
/// Implementations must be pure: the same position always produces the
/// same vector, regardless of the move order that reached it.
pub trait StateEncoder<S>: Send + Sync {
    /// Encode a position.
    fn encode(&self, state: &S) -> EncodedState;

    /// Get the shape of encoded states.
    fn output_shape(&self) -> Vec<usize>;

    /// Total number of features.
    fn feature_len(&self) -> usize {
        self.output_shape().iter().product()
    }
}

/// Default occupancy value for empty cells.
pub const EMPTY_EPSILON: f32 = 0.001;

/// Two-plane board encoder.
///
/// Encodes a board as two concatenated planes of `cell_count` values:
/// - occupancy: `+1.0` for a First stone, `-1.0` for a Second stone,
///   `epsilon` for an empty cell (never exactly zero, so multiplicative
///   layers still see a gradient)
/// - to-move: every entry `+1.0` when First is to move, `-1.0` otherwise
///
/// Total features = 2 * cell_count
#[derive(Clone, Debug)]
pub struct BoardEncoder {
    cell_count: usize,
    epsilon: f32,
}

impl BoardEncoder {
    /// Create an encoder for a board with `cell_count` cells.
    pub fn new(cell_count: usize) -> Self {
        Self {
            cell_count,
            epsilon: EMPTY_EPSILON,
        }
    }

    /// Set the value used for empty cells.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

impl<S: BoardView> StateEncoder<S> for BoardEncoder {
    fn encode(&self, state: &S) -> EncodedState {
        let cells = state.cells();
        debug_assert_eq!(cells.len(), self.cell_count, "board size mismatch");

        let mut tensor = Vec::with_capacity(2 * self.cell_count);
        tensor.extend(cells.iter().map(|cell| match cell {
            Some(player) => player.sign(),
            None => self.epsilon,
        }));

        let to_move = state.side_to_move().sign();
        tensor.extend(std::iter::repeat(to_move).take(self.cell_count));

        EncodedState::new(tensor, vec![2, self.cell_count])
    }

    fn output_shape(&self) -> Vec<usize> {
        vec![2, self.cell_count]
    }
}

/// Encoder backed by a plain function.
///
/// Lets the feature layout vary per game without touching search or
/// training code.
///
/// ```
/// use rust_azero::nn::{FnEncoder, StateEncoder};
///
/// let encoder = FnEncoder::new(vec![3], |x: &u8| vec![*x as f32, 0.0, 1.0]);
/// assert_eq!(encoder.encode(&7).tensor, vec![7.0, 0.0, 1.0]);
/// ```
pub struct FnEncoder<F> {
    shape: Vec<usize>,
    f: F,
}

impl<F> FnEncoder<F> {
    /// Wrap `f`, declaring the shape of its output.
    pub fn new(shape: Vec<usize>, f: F) -> Self {
        Self { shape, f }
    }
}

impl<S, F> StateEncoder<S> for FnEncoder<F>
where
    F: Fn(&S) -> Vec<f32> + Send + Sync,
{
    fn encode(&self, state: &S) -> EncodedState {
        EncodedState::new((self.f)(state), self.shape.clone())
    }

    fn output_shape(&self) -> Vec<usize> {
        self.shape.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::mnk::{MnkGameBuilder, MnkMove};
    use crate::rules::Game;

    #[test]
    fn test_board_encoder_shape() {
        let encoder = BoardEncoder::new(9);
        let shape = <BoardEncoder as StateEncoder<crate::games::mnk::MnkState>>::output_shape(&encoder);
        assert_eq!(shape, vec![2, 9]);
    }

    #[test]
    fn test_empty_six_by_six() {
        let game = MnkGameBuilder::new().size(6).win_length(4).build().unwrap();
        let encoder = BoardEncoder::new(36);
        let encoded = encoder.encode(&game.initial_state());

        assert_eq!(encoded.len(), 72);
        assert!(encoded.tensor[..36].iter().all(|&v| (v - 0.001).abs() < 1e-9));
        assert!(encoded.tensor[36..].iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_stones_and_to_move() {
        let game = MnkGameBuilder::new().build().unwrap();
        let state = game.apply(&game.initial_state(), MnkMove::Place(0)).unwrap();
        let state = game.apply(&state, MnkMove::Place(4)).unwrap();
        let state = game.apply(&state, MnkMove::Place(8)).unwrap();

        let encoded = BoardEncoder::new(9).encode(&state);

        assert_eq!(encoded.tensor[0], 1.0);
        assert_eq!(encoded.tensor[4], -1.0);
        assert_eq!(encoded.tensor[8], 1.0);
        assert_eq!(encoded.tensor[1], EMPTY_EPSILON);
        // Second to move
        assert!(encoded.tensor[9..].iter().all(|&v| v == -1.0));
    }

    #[test]
    fn test_transposition_encodes_identically() {
        let game = MnkGameBuilder::new().build().unwrap();
        let a = [0, 4, 8];
        let b = [8, 4, 0];

        let play = |cells: &[usize]| {
            cells.iter().fold(game.initial_state(), |s, &c| {
                game.apply(&s, MnkMove::Place(c)).unwrap()
            })
        };

        let encoder = BoardEncoder::new(9);
        assert_eq!(encoder.encode(&play(&a)).tensor, encoder.encode(&play(&b)).tensor);
    }

    #[test]
    fn test_custom_epsilon() {
        let game = MnkGameBuilder::new().build().unwrap();
        let encoder = BoardEncoder::new(9).with_epsilon(0.0);
        let encoded = encoder.encode(&game.initial_state());
        assert!(encoded.tensor[..9].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fn_encoder() {
        let encoder = FnEncoder::new(vec![2], |x: &i32| vec![*x as f32, -(*x as f32)]);
        let encoded = encoder.encode(&3);

        assert_eq!(encoded.tensor, vec![3.0, -3.0]);
        assert_eq!(StateEncoder::<i32>::feature_len(&encoder), 2);
    }
}
