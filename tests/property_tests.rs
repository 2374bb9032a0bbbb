//! Property-based tests for encoding, search and promotion.

use proptest::prelude::*;

use rust_azero::core::{GameRng, Player};
use rust_azero::games::mnk::{MnkGame, MnkGameBuilder, MnkState};
use rust_azero::mcts::{MCTSConfig, MCTSSearch};
use rust_azero::nn::{mask_policy, BoardEncoder, StateEncoder, UniformModel};
use rust_azero::rules::{Game, GameResult};
use rust_azero::training::ArenaResult;

const POLICY_SUM_TOLERANCE: f32 = 1e-5;

fn board() -> MnkGame {
    MnkGameBuilder::new().size(4).win_length(3).build().unwrap()
}

/// Play up to `plies` random moves, stopping early at a finished game.
fn random_position(game: &MnkGame, plies: usize, seed: u64) -> MnkState {
    let mut rng = GameRng::new(seed);
    let mut state = game.initial_state();
    for _ in 0..plies {
        if game.is_terminal(&state) {
            break;
        }
        let moves = game.legal_moves(&state);
        let mv = moves[rng.gen_range_usize(0..moves.len())];
        state = game.apply(&state, mv).unwrap();
    }
    state
}

// =============================================================================
// Strategies
// =============================================================================

fn arb_position() -> impl Strategy<Value = MnkState> {
    (0usize..12, any::<u64>()).prop_map(|(plies, seed)| random_position(&board(), plies, seed))
}

fn arb_tally() -> impl Strategy<Value = (usize, usize, usize)> {
    (0usize..40, 0usize..40, 0usize..40)
}

// =============================================================================
// Encoding
// =============================================================================

proptest! {
    #[test]
    fn prop_encoding_is_deterministic(state in arb_position()) {
        let encoder = BoardEncoder::new(16);
        let a = encoder.encode(&state);
        let b = encoder.encode(&state.clone());

        prop_assert_eq!(a.len(), 32);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_encoding_planes(state in arb_position()) {
        let game = board();
        let encoded = BoardEncoder::new(16).encode(&state);
        let side = game.to_move(&state).sign();

        prop_assert!(encoded.tensor[..16].iter().all(|&v| v == 1.0 || v == -1.0 || (v > 0.0 && v < 0.01)));
        prop_assert!(encoded.tensor[16..].iter().all(|&v| v == side));
    }
}

// =============================================================================
// Policy Masking
// =============================================================================

proptest! {
    #[test]
    fn prop_masked_policy_is_distribution(
        raw in prop::collection::vec(-1.0f32..1.0, 9),
        legal_mask in prop::collection::vec(any::<bool>(), 9),
    ) {
        let legal: Vec<usize> = (0..9).filter(|&i| legal_mask[i]).collect();
        let policy = mask_policy(&raw, &legal);

        for (i, &p) in policy.iter().enumerate() {
            prop_assert!(p >= 0.0);
            if !legal.contains(&i) {
                prop_assert_eq!(p, 0.0);
            }
        }
        if !legal.is_empty() {
            let sum: f32 = policy.iter().sum();
            prop_assert!((sum - 1.0).abs() < POLICY_SUM_TOLERANCE);
        }
    }
}

// =============================================================================
// Search
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_search_visits_match_budget(state in arb_position(), budget in 1u32..120) {
        let game = board();
        prop_assume!(!game.is_terminal(&state));

        let config = MCTSConfig::default().with_budget(budget).with_timeout(None);
        let search = MCTSSearch::new(game.clone(), BoardEncoder::new(16), config).unwrap();
        let result = search.search(&state, &UniformModel::new(32, 16)).unwrap();

        prop_assert_eq!(result.total_visits(), budget);
        prop_assert!((-1.0..=1.0).contains(&result.root_value));

        let sum: f32 = result.policy.iter().sum();
        prop_assert!((sum - 1.0).abs() < POLICY_SUM_TOLERANCE);

        let legal = game.legal_indices(&state);
        for (i, &p) in result.policy.iter().enumerate() {
            if !legal.contains(&i) {
                prop_assert_eq!(p, 0.0);
            }
        }
        prop_assert!(game.legal_moves(&state).contains(&result.best_move));
    }

    #[test]
    fn prop_search_is_deterministic(state in arb_position(), budget in 1u32..60) {
        let game = board();
        prop_assume!(!game.is_terminal(&state));

        let config = MCTSConfig::default().with_budget(budget).with_timeout(None);
        let search = MCTSSearch::new(game, BoardEncoder::new(16), config).unwrap();
        let model = UniformModel::new(32, 16);

        let a = search.search(&state, &model).unwrap();
        let b = search.search(&state, &model).unwrap();

        prop_assert_eq!(a.best_move, b.best_move);
        prop_assert_eq!(a.visits, b.visits);
    }
}

// =============================================================================
// Promotion
// =============================================================================

fn tally(wins: usize, losses: usize, draws: usize) -> ArenaResult {
    let mut arena = ArenaResult::new(wins + losses + draws);
    for _ in 0..wins {
        arena.record(GameResult::Winner(Player::First), Player::First);
    }
    for _ in 0..losses {
        arena.record(GameResult::Winner(Player::Second), Player::First);
    }
    for _ in 0..draws {
        arena.record(GameResult::Draw, Player::First);
    }
    arena
}

proptest! {
    #[test]
    fn prop_promotion_matches_win_rate((wins, losses, draws) in arb_tally(), threshold in 0.0f64..1.0) {
        let arena = tally(wins, losses, draws);
        let games = wins + losses + draws;
        let expected = games > 0 && wins as f64 / games as f64 > threshold;

        prop_assert_eq!(arena.should_promote(threshold), expected);
    }

    #[test]
    fn prop_extra_win_never_demotes((wins, losses, draws) in arb_tally(), threshold in 0.0f64..1.0) {
        // Turning a loss into a win can only help
        prop_assume!(losses > 0);
        let before = tally(wins, losses, draws).should_promote(threshold);
        let after = tally(wins + 1, losses - 1, draws).should_promote(threshold);

        prop_assert!(!before || after);
    }
}
