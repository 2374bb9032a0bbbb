//! m,n,k game implementation.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Player, Result};
use crate::nn::BoardView;
use crate::rules::Game;

/// A move on an m,n,k board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MnkMove {
    /// Place a stone on a cell (row-major index).
    Place(usize),
    /// Skip the turn. Only legal when the game allows passing.
    Pass,
}

/// m,n,k position.
///
/// Cells live in a persistent vector so successors share structure with
/// their parent; `apply` never touches the original.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MnkState {
    cells: Vector<Option<Player>>,
    width: usize,
    to_move: Player,
    winner: Option<Player>,
    consecutive_passes: u8,
    moves_played: usize,
}

impl MnkState {
    fn empty(width: usize, height: usize) -> Self {
        Self {
            cells: std::iter::repeat(None).take(width * height).collect(),
            width,
            to_move: Player::First,
            winner: None,
            consecutive_passes: 0,
            moves_played: 0,
        }
    }

    /// Stone on a cell, if any.
    #[must_use]
    pub fn get(&self, cell: usize) -> Option<Player> {
        self.cells.get(cell).copied().flatten()
    }

    /// Number of moves (including passes) played so far.
    #[must_use]
    pub fn moves_played(&self) -> usize {
        self.moves_played
    }

    /// Number of cells on the board.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

impl BoardView for MnkState {
    fn cells(&self) -> Vec<Option<Player>> {
        self.cells.iter().copied().collect()
    }

    fn side_to_move(&self) -> Player {
        self.to_move
    }
}

impl std::fmt::Display for MnkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            let c = match cell {
                Some(Player::First) => 'X',
                Some(Player::Second) => 'O',
                None => '.',
            };
            write!(f, "{c}")?;
            if (i + 1) % self.width == 0 {
                writeln!(f)?;
            } else {
                write!(f, " ")?;
            }
        }
        Ok(())
    }
}

/// Rules of an m,n,k game: `width` x `height` board, `win_length` in a row
/// (horizontally, vertically or diagonally) wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MnkGame {
    width: usize,
    height: usize,
    win_length: usize,
    allow_pass: bool,
}

impl MnkGame {
    /// Board width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Board height.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Stones in a row needed to win.
    #[must_use]
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Number of cells on the board.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether the stone just placed on `cell` completes a winning line.
    fn completes_line(&self, state: &MnkState, cell: usize, player: Player) -> bool {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

        let row = (cell / self.width) as isize;
        let col = (cell % self.width) as isize;

        DIRECTIONS.iter().any(|&(dr, dc)| {
            let run = 1
                + self.count_direction(state, row, col, dr, dc, player)
                + self.count_direction(state, row, col, -dr, -dc, player);
            run >= self.win_length
        })
    }

    fn count_direction(
        &self,
        state: &MnkState,
        row: isize,
        col: isize,
        dr: isize,
        dc: isize,
        player: Player,
    ) -> usize {
        let mut count = 0;
        let (mut r, mut c) = (row + dr, col + dc);
        while r >= 0 && c >= 0 && (r as usize) < self.height && (c as usize) < self.width {
            if state.get(r as usize * self.width + c as usize) != Some(player) {
                break;
            }
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }
}

impl Game for MnkGame {
    type State = MnkState;
    type Move = MnkMove;

    fn initial_state(&self) -> MnkState {
        MnkState::empty(self.width, self.height)
    }

    fn legal_moves(&self, state: &MnkState) -> Vec<MnkMove> {
        if self.is_terminal(state) {
            return Vec::new();
        }

        let mut moves: Vec<MnkMove> = state
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| MnkMove::Place(i))
            .collect();

        if self.allow_pass {
            moves.push(MnkMove::Pass);
        }
        moves
    }

    fn apply(&self, state: &MnkState, mv: MnkMove) -> Result<MnkState> {
        if self.is_terminal(state) {
            return Err(Error::Precondition(format!("move {mv:?} on a finished game")));
        }

        let player = state.to_move;
        let mut next = state.clone();
        next.to_move = player.opponent();
        next.moves_played += 1;

        match mv {
            MnkMove::Pass => {
                if !self.allow_pass {
                    return Err(Error::Precondition("passing is not allowed".into()));
                }
                next.consecutive_passes += 1;
            }
            MnkMove::Place(cell) => {
                if cell >= self.cell_count() {
                    return Err(Error::Precondition(format!("cell {cell} is off the board")));
                }
                if state.get(cell).is_some() {
                    return Err(Error::Precondition(format!("cell {cell} is occupied")));
                }
                next.cells.set(cell, Some(player));
                next.consecutive_passes = 0;
                if self.completes_line(&next, cell, player) {
                    next.winner = Some(player);
                }
            }
        }

        Ok(next)
    }

    fn is_terminal(&self, state: &MnkState) -> bool {
        state.winner.is_some() || state.consecutive_passes >= 2 || state.is_full()
    }

    fn winner(&self, state: &MnkState) -> Option<Player> {
        state.winner
    }

    fn to_move(&self, state: &MnkState) -> Player {
        state.to_move
    }

    fn action_space(&self) -> usize {
        self.cell_count() + usize::from(self.allow_pass)
    }

    fn move_index(&self, mv: MnkMove) -> usize {
        match mv {
            MnkMove::Place(cell) => cell,
            MnkMove::Pass => self.cell_count(),
        }
    }

    fn is_pass(&self, mv: MnkMove) -> bool {
        mv == MnkMove::Pass
    }
}

/// Builder for creating an `MnkGame`.
pub struct MnkGameBuilder {
    width: usize,
    height: usize,
    win_length: usize,
    allow_pass: bool,
}

impl Default for MnkGameBuilder {
    fn default() -> Self {
        Self {
            width: 3,
            height: 3,
            win_length: 3,
            allow_pass: false,
        }
    }
}

impl MnkGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: usize) -> Self {
        self.height = height;
        self
    }

    /// Square board shorthand.
    pub fn size(self, size: usize) -> Self {
        self.width(size).height(size)
    }

    pub fn win_length(mut self, k: usize) -> Self {
        self.win_length = k;
        self
    }

    pub fn allow_pass(mut self, allow: bool) -> Self {
        self.allow_pass = allow;
        self
    }

    /// Validate and build the game.
    pub fn build(self) -> Result<MnkGame> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config("board must have at least one cell".into()));
        }
        if self.win_length == 0 || self.win_length > self.width.max(self.height) {
            return Err(Error::Config(format!(
                "win length {} does not fit a {}x{} board",
                self.win_length, self.width, self.height
            )));
        }
        Ok(MnkGame {
            width: self.width,
            height: self.height,
            win_length: self.win_length,
            allow_pass: self.allow_pass,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GameResult;

    fn tictactoe() -> MnkGame {
        MnkGameBuilder::new().build().unwrap()
    }

    fn play(game: &MnkGame, cells: &[usize]) -> MnkState {
        cells.iter().fold(game.initial_state(), |s, &c| {
            game.apply(&s, MnkMove::Place(c)).unwrap()
        })
    }

    #[test]
    fn test_initial_state() {
        let game = tictactoe();
        let state = game.initial_state();

        assert_eq!(game.to_move(&state), Player::First);
        assert_eq!(game.legal_moves(&state).len(), 9);
        assert!(!game.is_terminal(&state));
        assert_eq!(game.action_space(), 9);
    }

    #[test]
    fn test_apply_is_immutable() {
        let game = tictactoe();
        let state = game.initial_state();
        let next = game.apply(&state, MnkMove::Place(4)).unwrap();

        assert_eq!(state.get(4), None);
        assert_eq!(next.get(4), Some(Player::First));
        assert_eq!(game.to_move(&next), Player::Second);
    }

    #[test]
    fn test_row_win() {
        let game = tictactoe();
        // X: 0 1 2, O: 3 4
        let state = play(&game, &[0, 3, 1, 4, 2]);

        assert!(game.is_terminal(&state));
        assert_eq!(game.winner(&state), Some(Player::First));
        assert_eq!(game.result(&state), Some(GameResult::Winner(Player::First)));
        assert!(game.legal_moves(&state).is_empty());
    }

    #[test]
    fn test_anti_diagonal_win() {
        let game = tictactoe();
        // X: 0 1 8, O: 2 4 6
        let state = play(&game, &[0, 2, 1, 4, 8, 6]);
        assert_eq!(game.winner(&state), Some(Player::Second));
    }

    #[test]
    fn test_draw() {
        let game = tictactoe();
        // X O X / X O O / O X X
        let state = play(&game, &[0, 1, 2, 4, 3, 5, 7, 6, 8]);

        assert!(game.is_terminal(&state));
        assert_eq!(game.winner(&state), None);
        assert_eq!(game.result(&state), Some(GameResult::Draw));
    }

    #[test]
    fn test_illegal_moves() {
        let game = tictactoe();
        let state = play(&game, &[4]);

        assert!(matches!(
            game.apply(&state, MnkMove::Place(4)),
            Err(Error::Precondition(_))
        ));
        assert!(game.apply(&state, MnkMove::Place(9)).is_err());
        assert!(game.apply(&state, MnkMove::Pass).is_err());
    }

    #[test]
    fn test_six_by_six_four_in_a_row() {
        let game = MnkGameBuilder::new().size(6).win_length(4).build().unwrap();
        // X on the main diagonal, O along the bottom row
        let state = play(&game, &[0, 30, 7, 31, 14, 32]);
        assert!(!game.is_terminal(&state));

        let state = game.apply(&state, MnkMove::Place(21)).unwrap();
        assert_eq!(game.winner(&state), Some(Player::First));
    }

    #[test]
    fn test_pass_rules() {
        let game = MnkGameBuilder::new().allow_pass(true).build().unwrap();
        let state = game.initial_state();

        assert_eq!(game.action_space(), 10);
        assert_eq!(game.legal_moves(&state).last(), Some(&MnkMove::Pass));
        assert_eq!(game.move_index(MnkMove::Pass), 9);
        assert!(game.is_pass(MnkMove::Pass));

        let once = game.apply(&state, MnkMove::Pass).unwrap();
        assert!(!game.is_terminal(&once));
        assert_eq!(game.to_move(&once), Player::Second);

        let twice = game.apply(&once, MnkMove::Pass).unwrap();
        assert!(game.is_terminal(&twice));
        assert_eq!(game.result(&twice), Some(GameResult::Draw));
    }

    #[test]
    fn test_builder_validation() {
        assert!(MnkGameBuilder::new().size(0).build().is_err());
        assert!(MnkGameBuilder::new().size(3).win_length(4).build().is_err());
        assert!(MnkGameBuilder::new().width(6).height(4).win_length(5).build().is_ok());
    }

    #[test]
    fn test_display() {
        let game = tictactoe();
        let state = play(&game, &[0, 4]);
        assert_eq!(state.to_string(), "X . .\n. O .\n. . .\n");
    }

    #[test]
    fn test_state_serialization() {
        let game = tictactoe();
        let state = play(&game, &[4, 0, 8]);

        let json = serde_json::to_string(&(state.clone(), MnkMove::Place(2))).unwrap();
        let (decoded, mv): (MnkState, MnkMove) = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, state);
        assert_eq!(mv, MnkMove::Place(2));
    }
}
