//! Game record output.
//!
//! The trainer hands finished games to a `GameRenderer`. `TextRenderer`
//! prints every position of a game to any writer.

use std::fmt::{Debug, Display};
use std::io::Write;
use std::path::PathBuf;

use crate::core::{Error, Result};
use crate::rules::GameResult;

/// Sink for finished games.
pub trait GameRenderer<S, M>: Send {
    /// Render one game: the position before each move, the move, and the
    /// final result when known.
    fn render_game(&mut self, record: &[(S, M)], result: Option<GameResult>) -> Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Plain-text game renderer.
pub struct TextRenderer<W> {
    out: W,
    label: PathBuf,
    games: usize,
}

impl<W: Write + Send> TextRenderer<W> {
    /// Render into `out`. `label` names the destination in error messages.
    pub fn new(out: W, label: impl Into<PathBuf>) -> Self {
        Self {
            out,
            label: label.into(),
            games: 0,
        }
    }

    /// Games rendered so far.
    pub fn games(&self) -> usize {
        self.games
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn io(&self, source: std::io::Error) -> Error {
        Error::Persistence {
            path: self.label.clone(),
            source,
        }
    }
}

impl TextRenderer<std::io::BufWriter<std::fs::File>> {
    /// Render into a new file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = std::fs::File::create(&path).map_err(|source| Error::Persistence {
            path: path.clone(),
            source,
        })?;
        Ok(Self::new(std::io::BufWriter::new(file), path))
    }
}

impl<S, M, W> GameRenderer<S, M> for TextRenderer<W>
where
    S: Display,
    M: Debug,
    W: Write + Send,
{
    fn render_game(&mut self, record: &[(S, M)], result: Option<GameResult>) -> Result<()> {
        self.games += 1;
        let mut text = format!("=== game {} ===\n", self.games);
        for (ply, (state, mv)) in record.iter().enumerate() {
            text.push_str(&format!("{state}ply {ply}: {mv:?}\n\n"));
        }
        let outcome = match result {
            Some(GameResult::Winner(player)) => format!("{player} wins"),
            Some(GameResult::Draw) => "draw".to_string(),
            None => "unfinished".to_string(),
        };
        text.push_str(&format!("result: {outcome}\n\n"));

        self.out.write_all(text.as_bytes()).map_err(|e| self.io(e))
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(|e| self.io(e))
    }
}
