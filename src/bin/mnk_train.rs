//! Train an agent on an m,n,k game by self-play.
//!
//! Usage: cargo run --release --bin mnk-train -- [--width 6 --height 6 --win 4] [--render games.txt]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use rust_azero::checkpoint::FileCheckpointStore;
use rust_azero::games::mnk::MnkGameBuilder;
use rust_azero::nn::{BoardEncoder, NNConfig};
use rust_azero::render::TextRenderer;
use rust_azero::rules::Game;
use rust_azero::training::{AgentConfig, Trainer};

/// Self-play trainer for m,n,k games
#[derive(Parser, Debug)]
#[command(name = "mnk-train")]
#[command(about = "Train an AlphaZero-style agent on an m,n,k game", long_about = None)]
struct Args {
    /// Board width
    #[arg(long, default_value_t = 6)]
    width: usize,

    /// Board height
    #[arg(long, default_value_t = 6)]
    height: usize,

    /// Stones in a row needed to win
    #[arg(long, default_value_t = 4)]
    win: usize,

    /// Training epochs
    #[arg(long, default_value_t = 5)]
    epochs: usize,

    /// Self-play games per epoch
    #[arg(long, default_value_t = 30)]
    episodes: usize,

    /// Gradient steps per epoch
    #[arg(long, default_value_t = 200)]
    iterations: usize,

    /// Arena games per epoch
    #[arg(long, default_value_t = 30)]
    arena_games: usize,

    /// MCTS simulations per move (overrides the config file)
    #[arg(long)]
    budget: Option<u32>,

    /// Search timeout per move in milliseconds, 0 for none (overrides the config file)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Promotion threshold (overrides the config file)
    #[arg(long)]
    threshold: Option<f64>,

    /// JSON agent configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to save the final champion
    #[arg(long, default_value = "example.model")]
    output: PathBuf,

    /// Directory for per-epoch checkpoints
    #[arg(long, default_value = "checkpoints")]
    checkpoints: PathBuf,

    /// Write rendered games to this file
    #[arg(long)]
    render: Option<PathBuf>,

    /// Resume from a saved champion
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let game = MnkGameBuilder::new()
        .width(args.width)
        .height(args.height)
        .win_length(args.win)
        .build()
        .context("invalid board")?;
    let cells = args.width * args.height;

    let mut config = match &args.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let mut config = AgentConfig::for_board("mnk", args.width, args.height, game.action_space());
            config.trainer.seed = args.seed;
            config.nn = NNConfig { seed: args.seed, ..config.nn };
            config
        }
    };
    if let Some(budget) = args.budget {
        config.mcts.budget = budget;
    }
    if let Some(ms) = args.timeout_ms {
        config.mcts.timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(threshold) = args.threshold {
        config.trainer.update_threshold = threshold;
    }

    let store = FileCheckpointStore::open(&args.checkpoints)
        .with_context(|| format!("opening {}", args.checkpoints.display()))?;
    let mut trainer = Trainer::new(game, BoardEncoder::new(cells), &config, Box::new(store))
        .context("building trainer")?;

    if let Some(path) = &args.render {
        let renderer = TextRenderer::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        trainer = trainer.with_renderer(Box::new(renderer));
    }
    if let Some(path) = &args.resume {
        trainer
            .load(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }

    let report = trainer.learn(args.epochs, args.episodes, args.iterations, args.arena_games)?;

    for epoch in &report.epochs {
        let loss = epoch
            .mean_loss
            .map_or_else(|| "-".to_string(), |l| format!("{:.4}", l.total()));
        println!(
            "epoch {}: {} examples, loss {}, arena {}{}",
            epoch.epoch,
            epoch.examples,
            loss,
            epoch.arena,
            if epoch.promoted { ", promoted" } else { "" }
        );
    }

    trainer
        .save(&args.output)
        .with_context(|| format!("saving {}", args.output.display()))?;
    println!("saved champion to {}", args.output.display());
    Ok(())
}
