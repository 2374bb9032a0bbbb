//! The self-play / train / evaluate / promote loop.
//!
//! Each epoch:
//! 1. the champion plays `episodes` self-play games (in parallel);
//! 2. a clone of the champion, the challenger, takes `iterations` SGD steps
//!    on batches drawn from the example pool;
//! 3. challenger and champion play `arena_games`, alternating sides;
//! 4. the challenger replaces the champion iff its win rate strictly
//!    exceeds `update_threshold`;
//! 5. the champion is saved through the checkpoint store.

use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{load_model, save_model, CheckpointHandle, CheckpointStore};
use crate::core::{Error, GameRng, Phase, Result};
use crate::mcts::MCTSSearch;
use crate::nn::{DualModel, DualNet, StateEncoder, TrainLoss, TrainableModel};
use crate::render::GameRenderer;
use crate::rules::{Game, GameResult};

use super::arena::{challenger_side, play_arena_game, ArenaResult};
use super::config::{AgentConfig, TrainerConfig};
use super::self_play::{SelfPlayConfig, SelfPlayWorker};
use super::trajectory::ExperienceBuffer;

/// What happened in one epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// Epoch number, counting from 0 across `learn` calls.
    pub epoch: usize,
    /// Self-play games that finished.
    pub games_played: usize,
    /// Self-play games dropped after an error.
    pub self_play_failures: usize,
    /// Examples added to the pool this epoch.
    pub examples: usize,
    /// Pool size after self-play.
    pub pool_size: usize,
    /// Gradient steps taken on the challenger.
    pub iterations: usize,
    /// Mean training loss, `None` when no step was taken.
    pub mean_loss: Option<TrainLoss>,
    /// Arena tally for the challenger.
    pub arena: ArenaResult,
    /// Whether the challenger was promoted.
    pub promoted: bool,
    /// Where the champion was saved.
    pub checkpoint: CheckpointHandle,
}

/// Summary of a `learn` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnReport {
    /// One report per epoch, in order.
    pub epochs: Vec<EpochReport>,
}

impl LearnReport {
    /// Number of promotions.
    #[must_use]
    pub fn promotions(&self) -> usize {
        self.epochs.iter().filter(|e| e.promoted).count()
    }

    /// Last saved champion.
    #[must_use]
    pub fn last_checkpoint(&self) -> Option<&CheckpointHandle> {
        self.epochs.last().map(|e| &e.checkpoint)
    }
}

/// Owns the champion and drives training epochs.
pub struct Trainer<G: Game, E> {
    name: String,
    search: MCTSSearch<G, E>,
    champion: DualNet,
    config: TrainerConfig,
    self_play: SelfPlayConfig,
    store: Box<dyn CheckpointStore>,
    renderer: Option<Box<dyn GameRenderer<G::State, G::Move>>>,
    buffer: ExperienceBuffer,
    rng: GameRng,
    pool: Option<rayon::ThreadPool>,
    epochs_run: usize,
}

impl<G, E> Trainer<G, E>
where
    G: Game,
    E: StateEncoder<G::State>,
{
    /// Create a trainer with a freshly initialised champion.
    pub fn new(
        game: G,
        encoder: E,
        config: &AgentConfig,
        store: Box<dyn CheckpointStore>,
    ) -> Result<Self> {
        config.validate()?;

        if encoder.feature_len() != config.nn.input_len {
            return Err(Error::Config(format!(
                "encoder produces {} features, model expects {}",
                encoder.feature_len(),
                config.nn.input_len
            )));
        }
        if game.action_space() != config.nn.action_space {
            return Err(Error::Config(format!(
                "game has {} actions, model expects {}",
                game.action_space(),
                config.nn.action_space
            )));
        }

        let pool = match config.trainer.concurrency {
            0 => None,
            threads => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::Config(format!("thread pool: {e}")))?,
            ),
        };

        Ok(Self {
            name: config.name.clone(),
            search: MCTSSearch::new(game, encoder, config.mcts.clone())?,
            champion: DualNet::new(config.nn.clone())?,
            config: config.trainer.clone(),
            self_play: config.self_play(),
            store,
            renderer: None,
            buffer: ExperienceBuffer::new(config.trainer.buffer_capacity),
            rng: GameRng::new(config.trainer.seed),
            pool,
            epochs_run: 0,
        })
    }

    /// Send the first self-play game of every epoch and every arena game
    /// to `renderer`.
    pub fn with_renderer(mut self, renderer: Box<dyn GameRenderer<G::State, G::Move>>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Replace the champion.
    pub fn with_champion(mut self, champion: DualNet) -> Result<Self> {
        self.check_compatible(&champion)?;
        self.champion = champion;
        Ok(self)
    }

    /// Current champion.
    pub fn champion(&self) -> &DualNet {
        &self.champion
    }

    /// Search context shared by all games.
    pub fn search(&self) -> &MCTSSearch<G, E> {
        &self.search
    }

    /// Trainer settings.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Example pool.
    pub fn buffer(&self) -> &ExperienceBuffer {
        &self.buffer
    }

    /// Epochs completed so far.
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    /// Run `epochs` epochs.
    ///
    /// Stops at the first epoch error. Epochs completed before it keep
    /// their promotions and checkpoints.
    pub fn learn(
        &mut self,
        epochs: usize,
        episodes: usize,
        iterations: usize,
        arena_games: usize,
    ) -> Result<LearnReport> {
        info!(
            "{}: learning for {epochs} epochs ({episodes} episodes, {iterations} iterations, {arena_games} arena games)",
            self.name
        );

        let mut report = LearnReport::default();
        for _ in 0..epochs {
            let epoch = self.run_epoch(episodes, iterations, arena_games)?;
            report.epochs.push(epoch);
        }

        info!(
            "{}: done, {} promotions in {} epochs",
            self.name,
            report.promotions(),
            report.epochs.len()
        );
        Ok(report)
    }

    /// Save the champion to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_model(path.as_ref(), &self.champion)
    }

    /// Load a champion saved with `save`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let model = load_model(path.as_ref())?;
        self.check_compatible(&model)?;
        self.champion = model;
        Ok(())
    }

    fn check_compatible(&self, model: &DualNet) -> Result<()> {
        let input_len = self.search.encoder().feature_len();
        let action_space = self.search.game().action_space();
        if model.input_len() != input_len || model.action_space() != action_space {
            return Err(Error::Config(format!(
                "model shape {}x{} does not fit game shape {}x{}",
                model.input_len(),
                model.action_space(),
                input_len,
                action_space
            )));
        }
        Ok(())
    }

    fn run_epoch(
        &mut self,
        episodes: usize,
        iterations: usize,
        arena_games: usize,
    ) -> Result<EpochReport> {
        let epoch = self.epochs_run;

        // === SELF-PLAY ===
        let seeds = self.seeds(episodes);
        let results = {
            let worker = SelfPlayWorker::new(&self.search, self.self_play.clone());
            let champion = &self.champion;
            self.run_games(&seeds, |_, seed| worker.play_episode(champion, seed))
        };

        let mut games_played = 0;
        let mut examples = 0;
        let mut failures = Vec::new();
        let mut first_game = None;
        for result in results {
            match result {
                Ok(mut episode) => {
                    games_played += 1;
                    examples += episode.len();
                    if first_game.is_none() {
                        first_game = Some((std::mem::take(&mut episode.record), episode.result));
                    }
                    self.buffer.push_episode(episode);
                }
                Err(e) => {
                    warn!("epoch {epoch}: self-play game dropped: {e}");
                    failures.push(e);
                }
            }
        }
        let self_play_failures = failures.len();
        self.check_failures(epoch, Phase::SelfPlay, failures, episodes)?;

        if let Some((record, result)) = first_game {
            self.render(&record, result);
        }
        debug!(
            "epoch {epoch}: {games_played} games, {examples} examples, pool {}",
            self.buffer.len()
        );

        // === TRAINING ===
        let mut challenger = self.champion.clone();
        let mean_loss = self.train(epoch, &mut challenger, iterations)?;

        // === ARENA ===
        let seeds = self.seeds(arena_games);
        let results = {
            let worker = SelfPlayWorker::new(&self.search, self.self_play.clone());
            let champion = &self.champion;
            let challenger = &challenger;
            self.run_games(&seeds, |i, seed| {
                play_arena_game(&worker, challenger, champion, i, seed)
            })
        };

        let mut arena = ArenaResult::new(arena_games);
        let mut failures = Vec::new();
        let mut records = Vec::new();
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(episode) => {
                    if let Some(outcome) = episode.result {
                        arena.record(outcome, challenger_side(i));
                    }
                    records.push((episode.record, episode.result));
                }
                Err(e) => {
                    warn!("epoch {epoch}: arena game {i} dropped: {e}");
                    arena.record_failure();
                    failures.push(e);
                }
            }
        }
        self.check_failures(epoch, Phase::Arena, failures, arena_games)?;

        for (record, result) in &records {
            self.render(record, *result);
        }

        // === PROMOTION ===
        let promoted = arena.should_promote(self.config.update_threshold);
        if promoted {
            info!(
                "epoch {epoch}: challenger promoted ({arena}, threshold {:.2})",
                self.config.update_threshold
            );
            self.champion = challenger;
        } else {
            info!(
                "epoch {epoch}: champion kept ({arena}, threshold {:.2})",
                self.config.update_threshold
            );
        }

        // === CHECKPOINT ===
        let checkpoint = self
            .store
            .save(&self.champion)
            .map_err(|e| e.in_epoch(epoch, Phase::Checkpoint))?;
        self.flush_renderer();

        self.epochs_run += 1;
        Ok(EpochReport {
            epoch,
            games_played,
            self_play_failures,
            examples,
            pool_size: self.buffer.len(),
            iterations,
            mean_loss,
            arena,
            promoted,
            checkpoint,
        })
    }

    fn train(
        &mut self,
        epoch: usize,
        challenger: &mut DualNet,
        iterations: usize,
    ) -> Result<Option<TrainLoss>> {
        if iterations == 0 {
            return Ok(None);
        }
        if self.buffer.is_empty() {
            return Err(Error::Precondition("no training examples".into())
                .in_epoch(epoch, Phase::Training));
        }

        let batch_size = challenger.batch_size();
        let mut total = TrainLoss::default();
        for iteration in 0..iterations {
            let batch = self.buffer.sample_batch(batch_size, self.rng.next_u64());
            let loss = challenger
                .train_step(&batch)
                .map_err(|e| e.in_epoch(epoch, Phase::Training))?;
            total.policy += loss.policy;
            total.value += loss.value;

            if (iteration + 1) % 50 == 0 {
                debug!(
                    "epoch {epoch}: iteration {}/{iterations}, loss {:.4}",
                    iteration + 1,
                    loss.total()
                );
            }
        }

        let n = iterations as f32;
        Ok(Some(TrainLoss {
            policy: total.policy / n,
            value: total.value / n,
        }))
    }

    fn seeds(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.rng.next_u64()).collect()
    }

    /// Run one game per seed on the worker pool, keeping seed order.
    fn run_games<T, F>(&self, seeds: &[u64], play: F) -> Vec<Result<T>>
    where
        T: Send,
        F: Fn(usize, u64) -> Result<T> + Send + Sync,
    {
        let work = || -> Vec<Result<T>> {
            seeds
                .par_iter()
                .enumerate()
                .map(|(i, &seed)| play(i, seed))
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }

    /// Abort the epoch if more than `max_failure_rate` of the games failed,
    /// or if any failure is fatal on its own.
    fn check_failures(
        &self,
        epoch: usize,
        phase: Phase,
        mut failures: Vec<Error>,
        games: usize,
    ) -> Result<()> {
        if let Some(pos) = failures.iter().position(Error::is_fatal) {
            return Err(failures.swap_remove(pos).in_epoch(epoch, phase));
        }
        let allowed = self.config.max_failure_rate * games as f64;
        if failures.len() as f64 > allowed {
            let count = failures.len();
            if let Some(last) = failures.pop() {
                warn!("epoch {epoch}: {count} of {games} {phase} games failed, aborting");
                return Err(last.in_epoch(epoch, phase));
            }
        }
        Ok(())
    }

    fn render(&mut self, record: &[(G::State, G::Move)], result: Option<GameResult>) {
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.render_game(record, result) {
                warn!("rendering failed: {e}");
            }
        }
    }

    fn flush_renderer(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.flush() {
                warn!("rendering failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::checkpoint::MemoryCheckpointStore;
    use crate::core::Player;
    use crate::games::mnk::{MnkGame, MnkGameBuilder, MnkMove, MnkState};
    use crate::nn::BoardEncoder;

    fn tiny_config() -> AgentConfig {
        let mut config = AgentConfig::for_board("test", 3, 3, 9);
        config.mcts = config.mcts.with_budget(8).with_timeout(None);
        config.nn = config.nn.with_k(1).with_shared_layers(1).with_batch_size(8);
        config.trainer = config.trainer.with_concurrency(2).with_seed(11);
        config
    }

    fn trainer(config: &AgentConfig) -> Trainer<MnkGame, BoardEncoder> {
        let game = MnkGameBuilder::new().build().unwrap();
        Trainer::new(game, BoardEncoder::new(9), config, Box::new(MemoryCheckpointStore::new()))
            .unwrap()
    }

    /// Tic-tac-toe whose first `apply`, across all clones, fails.
    #[derive(Clone)]
    struct FlakyGame {
        inner: MnkGame,
        armed: Arc<AtomicBool>,
    }

    impl Game for FlakyGame {
        type State = MnkState;
        type Move = MnkMove;

        fn initial_state(&self) -> MnkState {
            self.inner.initial_state()
        }

        fn legal_moves(&self, state: &MnkState) -> Vec<MnkMove> {
            self.inner.legal_moves(state)
        }

        fn apply(&self, state: &MnkState, mv: MnkMove) -> Result<MnkState> {
            if self.armed.swap(false, Ordering::SeqCst) {
                return Err(Error::Inference("flaky move".into()));
            }
            self.inner.apply(state, mv)
        }

        fn is_terminal(&self, state: &MnkState) -> bool {
            self.inner.is_terminal(state)
        }

        fn winner(&self, state: &MnkState) -> Option<Player> {
            self.inner.winner(state)
        }

        fn to_move(&self, state: &MnkState) -> Player {
            self.inner.to_move(state)
        }

        fn action_space(&self) -> usize {
            self.inner.action_space()
        }

        fn move_index(&self, mv: MnkMove) -> usize {
            self.inner.move_index(mv)
        }

        fn is_pass(&self, mv: MnkMove) -> bool {
            self.inner.is_pass(mv)
        }
    }

    #[test]
    fn test_new_rejects_mismatched_model() {
        let game = MnkGameBuilder::new().build().unwrap();
        let mut config = tiny_config();
        config.nn.action_space = 10;

        let result = Trainer::new(
            game,
            BoardEncoder::new(9),
            &config,
            Box::new(MemoryCheckpointStore::new()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_learn_one_epoch() {
        let mut trainer = trainer(&tiny_config());
        let report = trainer.learn(1, 2, 3, 2).unwrap();

        assert_eq!(report.epochs.len(), 1);
        let epoch = &report.epochs[0];
        assert_eq!(epoch.epoch, 0);
        assert_eq!(epoch.games_played, 2);
        assert_eq!(epoch.self_play_failures, 0);
        assert!(epoch.examples >= 10);
        assert_eq!(epoch.pool_size, epoch.examples);
        assert_eq!(epoch.iterations, 3);
        assert!(epoch.mean_loss.is_some());
        assert_eq!(epoch.arena.games, 2);
        assert_eq!(epoch.arena.completed(), 2);
        assert_eq!(trainer.epochs_run(), 1);
    }

    #[test]
    fn test_unpromoted_champion_is_unchanged() {
        let mut config = tiny_config();
        // Nothing can beat a 100% threshold
        config.trainer.update_threshold = 1.0;
        let mut trainer = trainer(&config);
        let before = trainer.champion().clone();

        let report = trainer.learn(1, 1, 2, 2).unwrap();

        assert!(!report.epochs[0].promoted);
        assert_eq!(trainer.champion(), &before);
    }

    #[test]
    fn test_promoted_challenger_is_trained() {
        // The first mover wins a 1x1 board, so the challenger takes the
        // arena game it opens
        let mut config = AgentConfig::for_board("test", 1, 1, 1);
        config.mcts = config.mcts.with_budget(4).with_timeout(None);
        config.nn = config.nn.with_k(1).with_shared_layers(1).with_batch_size(4);
        config.trainer = config.trainer.with_concurrency(2).with_seed(11).with_update_threshold(0.0);
        let game = MnkGameBuilder::new().width(1).height(1).win_length(1).build().unwrap();
        let mut trainer =
            Trainer::new(game, BoardEncoder::new(1), &config, Box::new(MemoryCheckpointStore::new()))
                .unwrap();
        let before = trainer.champion().clone();

        let report = trainer.learn(1, 2, 3, 2).unwrap();
        let epoch = &report.epochs[0];

        assert_eq!(epoch.arena.wins, 1);
        assert_eq!(epoch.arena.losses, 1);
        assert!(epoch.promoted);
        assert_eq!(trainer.champion().version(), 3);
        assert_ne!(trainer.champion(), &before);
        assert_eq!(epoch.checkpoint.model_version, 3);
    }

    #[test]
    fn test_no_iterations_no_loss() {
        let mut trainer = trainer(&tiny_config());
        let report = trainer.learn(1, 1, 0, 0).unwrap();
        assert_eq!(report.epochs[0].mean_loss, None);
        assert!(!report.epochs[0].promoted);
    }

    #[test]
    fn test_runaway_games_abort_epoch() {
        let mut config = tiny_config();
        config.trainer.max_moves = 2;
        let mut trainer = trainer(&config);

        let err = trainer.learn(1, 3, 1, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Epoch {
                epoch: 0,
                phase: Phase::SelfPlay,
                ..
            }
        ));
        assert_eq!(trainer.epochs_run(), 0);
    }

    #[test]
    fn test_failures_within_tolerance() {
        let mut config = tiny_config();
        config.trainer.max_moves = 2;
        config.trainer.max_failure_rate = 1.0;
        let mut trainer = trainer(&config);

        // Every self-play game fails, so training has nothing to learn from
        let err = trainer.learn(1, 2, 1, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Epoch {
                phase: Phase::Training,
                ..
            }
        ));
    }

    #[test]
    fn test_single_failure_within_tolerance() {
        let mut config = tiny_config();
        config.trainer.max_failure_rate = 0.5;
        let armed = Arc::new(AtomicBool::new(true));
        let game = FlakyGame {
            inner: MnkGameBuilder::new().build().unwrap(),
            armed: Arc::clone(&armed),
        };
        let mut trainer =
            Trainer::new(game, BoardEncoder::new(9), &config, Box::new(MemoryCheckpointStore::new()))
                .unwrap();

        // One of three games fails: 1 <= 0.5 * 3
        let report = trainer.learn(1, 3, 2, 2).unwrap();
        let epoch = &report.epochs[0];

        assert!(!armed.load(Ordering::SeqCst));
        assert_eq!(epoch.self_play_failures, 1);
        assert_eq!(epoch.games_played, 2);
        assert!(epoch.examples >= 10);
        assert_eq!(epoch.pool_size, epoch.examples);
        assert_eq!(epoch.iterations, 2);
        assert_eq!(epoch.arena.failures, 0);
        assert_eq!(epoch.arena.completed(), 2);
        assert_eq!(trainer.epochs_run(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let first = trainer(&tiny_config());
        let path = std::env::temp_dir().join(format!("rust-azero-trainer-{}.model", std::process::id()));
        first.save(&path).unwrap();

        let mut config = tiny_config();
        config.nn.seed = 99;
        let mut second = trainer(&config);
        assert_ne!(second.champion(), first.champion());

        second.load(&path).unwrap();
        assert_eq!(second.champion(), first.champion());

        let _ = std::fs::remove_file(&path);
    }
}
