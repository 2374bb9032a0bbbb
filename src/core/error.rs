//! Error types shared by search, training and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Stage of a training epoch, used to give fatal errors some context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Generating games with the champion.
    SelfPlay,
    /// Gradient steps on the challenger.
    Training,
    /// Champion versus challenger evaluation.
    Arena,
    /// Persisting the champion.
    Checkpoint,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::SelfPlay => "self-play",
            Phase::Training => "training",
            Phase::Arena => "arena",
            Phase::Checkpoint => "checkpoint",
        };
        f.write_str(name)
    }
}

/// Errors produced by the agent.
#[derive(Error, Debug)]
pub enum Error {
    /// A collaborator broke a contract: search on a terminal position,
    /// an illegal move, a game that never ends. Never retried.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The model produced or was given malformed data.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Checkpoint file could not be read or written.
    #[error("checkpoint I/O failed for {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Checkpoint bytes could not be encoded or decoded.
    #[error("checkpoint codec: {0}")]
    Codec(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An epoch could not continue.
    #[error("epoch {epoch} failed during {phase}: {source}")]
    Epoch {
        epoch: usize,
        phase: Phase,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the epoch and phase it occurred in.
    #[must_use]
    pub fn in_epoch(self, epoch: usize, phase: Phase) -> Self {
        Error::Epoch {
            epoch,
            phase,
            source: Box::new(self),
        }
    }

    /// Whether this error is fatal for the whole `learn` call rather than
    /// a single game.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Persistence { .. } | Error::Codec(_) | Error::Config(_) | Error::Epoch { .. }
        )
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
