//! Agent and trainer configuration.
//!
//! Everything needed to reproduce a training run lives in one
//! `AgentConfig`, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::mcts::MCTSConfig;
use crate::nn::NNConfig;

use super::self_play::SelfPlayConfig;

/// Trainer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Challenger win rate that must be strictly exceeded for promotion.
    pub update_threshold: f64,

    /// Fraction of games per phase allowed to fail before the epoch aborts.
    pub max_failure_rate: f64,

    /// Worker threads for self-play and arena games (0 = rayon default).
    pub concurrency: usize,

    /// Ply cap per game.
    pub max_moves: usize,

    /// Examples kept in the pool (oldest dropped first).
    pub buffer_capacity: usize,

    /// Master seed for game seeds and batch sampling.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            update_threshold: 0.52,
            max_failure_rate: 0.1,
            concurrency: 0,
            max_moves: 500,
            buffer_capacity: 100_000,
            seed: 0,
        }
    }
}

impl TrainerConfig {
    /// Set the promotion threshold.
    pub fn with_update_threshold(mut self, threshold: f64) -> Self {
        self.update_threshold = threshold;
        self
    }

    /// Set the tolerated failure fraction.
    pub fn with_max_failure_rate(mut self, rate: f64) -> Self {
        self.max_failure_rate = rate;
        self
    }

    /// Set the worker thread count.
    pub fn with_concurrency(mut self, threads: usize) -> Self {
        self.concurrency = threads;
        self
    }

    /// Set the ply cap per game.
    pub fn with_max_moves(mut self, max: usize) -> Self {
        self.max_moves = max;
        self
    }

    /// Set the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.update_threshold) {
            return Err(Error::Config(format!(
                "update threshold {} outside [0, 1]",
                self.update_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.max_failure_rate) {
            return Err(Error::Config(format!(
                "max failure rate {} outside [0, 1]",
                self.max_failure_rate
            )));
        }
        if self.max_moves == 0 || self.buffer_capacity == 0 {
            return Err(Error::Config("max_moves and buffer_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Full agent configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name used in logs.
    pub name: String,

    /// Tree search settings.
    pub mcts: MCTSConfig,

    /// Model architecture and optimiser settings.
    pub nn: NNConfig,

    /// Training loop settings.
    pub trainer: TrainerConfig,
}

impl AgentConfig {
    /// Defaults for a `width` x `height` board with `action_space` moves.
    pub fn for_board(name: impl Into<String>, width: usize, height: usize, action_space: usize) -> Self {
        Self {
            name: name.into(),
            mcts: MCTSConfig::default(),
            nn: NNConfig::for_board(width, height, action_space),
            trainer: TrainerConfig::default(),
        }
    }

    /// Self-play settings derived from the search and trainer settings.
    #[must_use]
    pub fn self_play(&self) -> SelfPlayConfig {
        SelfPlayConfig::default()
            .with_max_moves(self.trainer.max_moves)
            .with_random_count(self.mcts.random_count)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.mcts.validate()?;
        self.nn.validate()?;
        self.trainer.validate()
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trainer_defaults() {
        let config = TrainerConfig::default();
        assert_eq!(config.update_threshold, 0.52);
        assert_eq!(config.concurrency, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trainer_validation() {
        assert!(TrainerConfig::default().with_update_threshold(1.5).validate().is_err());
        assert!(TrainerConfig::default().with_max_failure_rate(-0.1).validate().is_err());
        assert!(TrainerConfig::default().with_max_moves(0).validate().is_err());
    }

    #[test]
    fn test_agent_json_round_trip() {
        let config = AgentConfig::for_board("mnk", 6, 6, 36);
        let json = config.to_json().unwrap();
        let parsed = AgentConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_agent_json_rejects_invalid() {
        let mut config = AgentConfig::for_board("mnk", 3, 3, 9);
        config.mcts.budget = 0;
        let json = serde_json::to_string(&config).unwrap();

        assert!(matches!(AgentConfig::from_json(&json), Err(Error::Config(_))));
        assert!(AgentConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_self_play_settings() {
        let mut config = AgentConfig::for_board("mnk", 3, 3, 9);
        config.mcts.random_count = 4;
        config.trainer.max_moves = 9;

        let self_play = config.self_play();
        assert_eq!(self_play.random_count, 4);
        assert_eq!(self_play.max_moves, 9);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("rust-azero-missing-config.json");
        let err = AgentConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
    }
}
