//! Benchmark for MCTS search
//!
//! Measures simulations with a uniform model (search overhead only) and
//! with `DualNet` (search plus inference) on the 6x6, 4-in-a-row board.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rust_azero::games::mnk::MnkGameBuilder;
use rust_azero::mcts::{MCTSConfig, MCTSSearch};
use rust_azero::nn::{BoardEncoder, DualNet, NNConfig, UniformModel};
use rust_azero::rules::Game;

fn bench_uniform_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_uniform");
    let game = MnkGameBuilder::new().size(6).win_length(4).build().unwrap();
    let model = UniformModel::new(72, game.action_space());
    let state = game.initial_state();

    for budget in [100u32, 400, 1000] {
        let config = MCTSConfig::default().with_budget(budget).with_timeout(None);
        let search = MCTSSearch::new(game.clone(), BoardEncoder::new(36), config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |b, _| {
            b.iter(|| black_box(search.search(black_box(&state), &model).unwrap()))
        });
    }

    group.finish();
}

fn bench_dualnet_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_dualnet");
    let game = MnkGameBuilder::new().size(6).win_length(4).build().unwrap();
    let model = DualNet::new(NNConfig::for_board(6, 6, game.action_space())).unwrap();
    let state = game.initial_state();

    for budget in [50u32, 200] {
        let config = MCTSConfig::default().with_budget(budget).with_timeout(None);
        let search = MCTSSearch::new(game.clone(), BoardEncoder::new(36), config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |b, _| {
            b.iter(|| black_box(search.search(black_box(&state), &model).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uniform_search, bench_dualnet_search);
criterion_main!(benches);
