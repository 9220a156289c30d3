use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::RulesConfig;
use crate::{rules, terminal};

/// Board size constants
pub const BOARD_SIZE: usize = 11;
pub const CENTER: usize = BOARD_SIZE / 2;

/// Orthogonal step directions, in the order captures and flood fills visit them.
pub const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

pub type Grid = [[Square; BOARD_SIZE]; BOARD_SIZE];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    #[default]
    Empty,
    King,
    Defender,
    Attacker,
}

impl Square {
    pub fn is_attacking(self) -> bool {
        self == Square::Attacker
    }

    pub fn is_defending(self) -> bool {
        matches!(self, Square::Defender | Square::King)
    }

    pub fn is_empty(self) -> bool {
        self == Square::Empty
    }

    pub fn belongs_to(self, player: Player) -> bool {
        match player {
            Player::Attackers => self.is_attacking(),
            Player::Defenders => self.is_defending(),
        }
    }

    /// Character used by the persisted grid rows.
    pub fn to_char(self) -> char {
        match self {
            Square::Empty => 'E',
            Square::King => 'K',
            Square::Defender => 'D',
            Square::Attacker => 'A',
        }
    }

    /// Accepts the persisted characters plus `.` for an empty square.
    pub fn from_char(c: char) -> Option<Square> {
        match c {
            'E' | '.' => Some(Square::Empty),
            'K' => Some(Square::King),
            'D' => Some(Square::Defender),
            'A' => Some(Square::Attacker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Attackers,
    Defenders,
}

impl Player {
    pub fn opponent(&self) -> Player {
        match self {
            Player::Attackers => Player::Defenders,
            Player::Defenders => Player::Attackers,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Attackers => write!(f, "Attackers"),
            Player::Defenders => write!(f, "Defenders"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Neighbour one step away, or `None` when it falls off the board.
    pub fn step(self, dr: isize, dc: isize) -> Option<Position> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Position { row, col })
    }

    pub fn is_corner(self) -> bool {
        (self.row == 0 || self.row == BOARD_SIZE - 1)
            && (self.col == 0 || self.col == BOARD_SIZE - 1)
    }

    pub fn is_throne(self) -> bool {
        self.row == CENTER && self.col == CENTER
    }

    /// Corners and the throne are reserved for the king.
    pub fn is_special(self) -> bool {
        self.is_corner() || self.is_throne()
    }

    pub fn is_edge(self) -> bool {
        self.row == 0 || self.col == 0 || self.row == BOARD_SIZE - 1 || self.col == BOARD_SIZE - 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

impl Move {
    pub fn new(from: Position, to: Position) -> Self {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("square ({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },
    #[error("bad board format: {0}")]
    BadBoardFormat(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Game already over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    AttackersWin,
    DefendersWin,
    Draw,
}

impl GameResult {
    fn loss_for(player: Player) -> GameResult {
        match player {
            Player::Attackers => GameResult::DefendersWin,
            Player::Defenders => GameResult::AttackersWin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardState {
    grid: Grid,
    turn: Player,
    selection: Option<Position>,
    king: Position,
    moves_without_capture: u32,
    attacker_history: Vec<Position>,
    defender_history: Vec<Position>,
    /// Occupancy fingerprints of the defending side since the last capture.
    defensive_positions: HashMap<u128, u32>,
    result: Option<GameResult>,
    rules: RulesConfig,
}

impl BoardState {
    /// Standard opening position, attackers to move.
    pub fn new() -> Self {
        Self::with_rules(RulesConfig::default())
    }

    pub fn with_rules(rules: RulesConfig) -> Self {
        let mut grid = [[Square::Empty; BOARD_SIZE]; BOARD_SIZE];

        // Place king on the throne
        grid[CENTER][CENTER] = Square::King;

        // Defenders form a diamond around the king
        let defenders = [
            (3, 5),
            (4, 4),
            (4, 5),
            (4, 6),
            (5, 3),
            (5, 4),
            (5, 6),
            (5, 7),
            (6, 4),
            (6, 5),
            (6, 6),
            (7, 5),
        ];

        for &(r, c) in &defenders {
            grid[r][c] = Square::Defender;
        }

        // Place attackers on edges (T-shape on each side)
        let attackers = [
            // Top
            (0, 3),
            (0, 4),
            (0, 5),
            (0, 6),
            (0, 7),
            (1, 5),
            // Bottom
            (10, 3),
            (10, 4),
            (10, 5),
            (10, 6),
            (10, 7),
            (9, 5),
            // Left
            (3, 0),
            (4, 0),
            (5, 0),
            (6, 0),
            (7, 0),
            (5, 1),
            // Right
            (3, 10),
            (4, 10),
            (5, 10),
            (6, 10),
            (7, 10),
            (5, 9),
        ];

        for &(r, c) in &attackers {
            grid[r][c] = Square::Attacker;
        }

        BoardState {
            grid,
            turn: Player::Attackers,
            selection: None,
            king: Position::new(CENTER, CENTER),
            moves_without_capture: 0,
            attacker_history: Vec::new(),
            defender_history: Vec::new(),
            defensive_positions: HashMap::new(),
            result: None,
            rules,
        }
    }

    /// Build a position from 11 rows of 11 characters drawn from `A`, `D`, `K`, `E` (or `.`).
    pub fn from_rows<S: AsRef<str>>(rows: &[S], turn: Player) -> Result<Self, GameError> {
        let grid = parse_grid(rows)?;
        Self::from_parts(
            grid,
            turn,
            0,
            Vec::new(),
            Vec::new(),
            RulesConfig::default(),
        )
    }

    pub(crate) fn from_parts(
        grid: Grid,
        turn: Player,
        moves_without_capture: u32,
        attacker_history: Vec<Position>,
        defender_history: Vec<Position>,
        rules: RulesConfig,
    ) -> Result<Self, GameError> {
        let kings: Vec<Position> = all_positions()
            .filter(|pos| grid[pos.row][pos.col] == Square::King)
            .collect();
        let king = match kings.as_slice() {
            [king] => *king,
            _ => {
                return Err(GameError::BadBoardFormat(format!(
                    "expected exactly one king, found {}",
                    kings.len()
                )));
            }
        };

        for pos in all_positions() {
            let square = grid[pos.row][pos.col];
            if pos.is_special() && !square.is_empty() && square != Square::King {
                return Err(GameError::BadBoardFormat(format!(
                    "{:?} occupies reserved square {}",
                    square, pos
                )));
            }
        }

        Ok(BoardState {
            grid,
            turn,
            selection: None,
            king,
            moves_without_capture,
            attacker_history,
            defender_history,
            defensive_positions: HashMap::new(),
            result: None,
            rules,
        })
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn current_player(&self) -> Player {
        self.turn
    }

    pub fn is_attacker_turn(&self) -> bool {
        self.turn == Player::Attackers
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn is_game_over(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_draw(&self) -> bool {
        self.result == Some(GameResult::Draw)
    }

    pub fn selection(&self) -> Option<Position> {
        self.selection
    }

    pub fn king_position(&self) -> Position {
        self.king
    }

    pub fn moves_without_capture(&self) -> u32 {
        self.moves_without_capture
    }

    pub fn attacker_history(&self) -> &[Position] {
        &self.attacker_history
    }

    pub fn defender_history(&self) -> &[Position] {
        &self.defender_history
    }

    pub fn history(&self, player: Player) -> &[Position] {
        match player {
            Player::Attackers => &self.attacker_history,
            Player::Defenders => &self.defender_history,
        }
    }

    /// Number of half-moves applied, as recorded in the move histories.
    pub fn move_count(&self) -> usize {
        self.attacker_history.len() + self.defender_history.len()
    }

    /// How many times `fingerprint` has been seen since the last capture.
    pub fn defensive_position_count(&self, fingerprint: u128) -> u32 {
        self.defensive_positions.get(&fingerprint).copied().unwrap_or(0)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn square(&self, row: usize, col: usize) -> Result<Square, GameError> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Ok(self.grid[row][col])
        } else {
            Err(GameError::OutOfBounds { row, col })
        }
    }

    pub fn square_at(&self, pos: Position) -> Result<Square, GameError> {
        self.square(pos.row, pos.col)
    }

    /// Off-board coordinates read as `Empty`. Meant for capture scanning and flood fills only.
    pub fn square_or_empty(&self, row: isize, col: isize) -> Square {
        if (0..BOARD_SIZE as isize).contains(&row) && (0..BOARD_SIZE as isize).contains(&col) {
            self.grid[row as usize][col as usize]
        } else {
            Square::Empty
        }
    }

    pub fn count(&self, square: Square) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|&&s| s == square)
            .count()
    }

    /// Positions of the given side's pieces in row-major order.
    pub fn pieces(&self, player: Player) -> impl Iterator<Item = Position> + '_ {
        all_positions().filter(move |pos| self.grid[pos.row][pos.col].belongs_to(player))
    }

    /// Select one of the side to move's pieces. Anything else leaves the selection unchanged.
    pub fn select(&mut self, row: usize, col: usize) -> bool {
        match self.square(row, col) {
            Ok(square) if square.belongs_to(self.turn) => {
                self.selection = Some(Position::new(row, col));
                true
            }
            _ => false,
        }
    }

    /// Move the selected piece to `(row, col)`. Returns whether the move was applied.
    pub fn move_to(&mut self, row: usize, col: usize) -> bool {
        if self.is_game_over() {
            return false;
        }
        let Some(from) = self.selection else {
            return false;
        };
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return false;
        }
        let to = Position::new(row, col);

        // Exactly one coordinate may change
        if (from.row == to.row) == (from.col == to.col) {
            return false;
        }
        if !rules::is_valid_move(self, to, from) {
            return false;
        }

        let piece = self.grid[from.row][from.col];
        self.grid[from.row][from.col] = Square::Empty;
        self.grid[to.row][to.col] = piece;
        self.selection = None;
        if piece == Square::King {
            self.king = to;
        }

        let captured = self.resolve_captures(to);

        let mover = self.turn;
        self.turn = mover.opponent();
        match mover {
            Player::Attackers => self.attacker_history.push(to),
            Player::Defenders => self.defender_history.push(to),
        }

        if captured > 0 {
            self.moves_without_capture = 0;
            self.defensive_positions.clear();
        } else {
            self.moves_without_capture += 1;
        }

        trace!(%mover, %from, %to, captured, "move applied");

        self.update_terminal_state(mover, captured > 0);
        true
    }

    /// Select-and-move in one call, reporting why a move was refused.
    pub fn make_move(&mut self, mv: Move) -> Result<(), GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        if !self.select(mv.from.row, mv.from.col) {
            return Err(GameError::InvalidMove(format!(
                "{} holds no piece of the side to move",
                mv.from
            )));
        }
        if !self.move_to(mv.to.row, mv.to.col) {
            self.selection = None;
            return Err(GameError::InvalidMove(format!("Move {} is not legal", mv)));
        }
        Ok(())
    }

    /// Custodian captures around the square a piece just landed on. Returns the number removed.
    fn resolve_captures(&mut self, moved_to: Position) -> usize {
        let mover = self.grid[moved_to.row][moved_to.col];
        let mut captured = 0;

        for &(dr, dc) in &DIRECTIONS {
            let r = moved_to.row as isize + dr;
            let c = moved_to.col as isize + dc;
            let between = self.square_or_empty(r, c);
            let beyond = self.square_or_empty(r + dr, c + dc);

            let flanked = match between {
                Square::Defender => mover.is_attacking() && beyond.is_attacking(),
                Square::Attacker => mover.is_defending() && beyond.is_defending(),
                _ => false,
            };

            // A non-empty `between` is always on the board
            if flanked {
                self.grid[r as usize][c as usize] = Square::Empty;
                captured += 1;
            }
        }

        captured
    }

    /// Record the defending side's occupancy after a quiet move. True when the position
    /// has now repeated often enough to cost the defenders the game.
    fn record_defensive_position(&mut self) -> bool {
        let fingerprint = terminal::defensive_fingerprint(self);
        let seen = self.defensive_positions.entry(fingerprint).or_insert(0);
        *seen += 1;
        fingerprint.count_ones() >= self.rules.min_defensive_pieces
            && *seen >= self.rules.position_repeat_limit
    }

    fn update_terminal_state(&mut self, mover: Player, captured: bool) {
        let outcome = if terminal::king_capture(self) || terminal::is_surrounded(self) {
            Some(GameResult::AttackersWin)
        } else if terminal::king_escaped(self) {
            Some(GameResult::DefendersWin)
        } else if terminal::is_repetition(self.history(mover), self.rules.repetition_window) {
            Some(GameResult::loss_for(mover))
        } else if !captured && self.record_defensive_position() {
            Some(GameResult::AttackersWin)
        } else if self.moves_without_capture >= self.rules.draw_threshold {
            Some(GameResult::Draw)
        } else if !rules::are_moves_available(self) {
            Some(GameResult::loss_for(self.turn))
        } else {
            None
        };

        if let Some(result) = outcome {
            // The turn flag is left on the winner
            match result {
                GameResult::AttackersWin => self.turn = Player::Attackers,
                GameResult::DefendersWin => self.turn = Player::Defenders,
                GameResult::Draw => {}
            }
            debug!(?result, moves = self.move_count(), "game over");
            self.result = Some(result);
        }
    }

    /// Get a string representation of the board
    pub fn display_board(&self) -> String {
        let mut result = String::new();
        result.push_str("   ");
        for col in 0..BOARD_SIZE {
            result.push_str(&format!("{:2} ", col));
        }
        result.push('\n');

        for row in 0..BOARD_SIZE {
            result.push_str(&format!("{:2} ", row));
            for col in 0..BOARD_SIZE {
                let pos = Position::new(row, col);
                let square = self.grid[row][col];
                let c = match square {
                    Square::Empty if pos.is_corner() => 'X',
                    Square::Empty if pos.is_throne() => 'T',
                    Square::Empty => '.',
                    other => other.to_char(),
                };
                result.push_str(&format!(" {} ", c));
            }
            result.push('\n');
        }

        result
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

/// Every square in row-major order.
pub fn all_positions() -> impl Iterator<Item = Position> {
    (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Position::new(row, col)))
}

pub fn parse_grid<S: AsRef<str>>(rows: &[S]) -> Result<Grid, GameError> {
    if rows.len() != BOARD_SIZE {
        return Err(GameError::BadBoardFormat(format!(
            "expected {} rows, found {}",
            BOARD_SIZE,
            rows.len()
        )));
    }

    let mut grid = [[Square::Empty; BOARD_SIZE]; BOARD_SIZE];
    for (r, line) in rows.iter().enumerate() {
        let line = line.as_ref().trim_end();
        let width = line.chars().count();
        if width != BOARD_SIZE {
            return Err(GameError::BadBoardFormat(format!(
                "row {} has {} columns, expected {}",
                r, width, BOARD_SIZE
            )));
        }
        for (c, ch) in line.chars().enumerate() {
            grid[r][c] = Square::from_char(ch).ok_or_else(|| {
                GameError::BadBoardFormat(format!("unknown square '{}' at ({}, {})", ch, r, c))
            })?;
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to place a piece on the board
    fn set_piece(state: &mut BoardState, pos: Position, square: Square) {
        state.grid[pos.row][pos.col] = square;
        if square == Square::King {
            state.king = pos;
        }
    }

    /// Helper to clear the board, leaving the king on the throne
    fn clear_board(state: &mut BoardState) {
        state.grid = [[Square::Empty; BOARD_SIZE]; BOARD_SIZE];
        set_piece(state, Position::new(CENTER, CENTER), Square::King);
    }

    fn move_king(state: &mut BoardState, to: Position) {
        let king = state.king;
        state.grid[king.row][king.col] = Square::Empty;
        set_piece(state, to, Square::King);
    }

    fn play(state: &mut BoardState, from: (usize, usize), to: (usize, usize)) -> bool {
        state.select(from.0, from.1) && state.move_to(to.0, to.1)
    }

    #[test]
    fn test_initial_setup() {
        let game = BoardState::new();

        assert_eq!(game.square(0, 0), Ok(Square::Empty));
        assert_eq!(game.square(5, 5), Ok(Square::King));
        assert_eq!(game.square(5, 1), Ok(Square::Attacker));
        assert_eq!(game.square(3, 5), Ok(Square::Defender));

        assert_eq!(game.count(Square::Attacker), 24);
        assert_eq!(game.count(Square::Defender), 12);
        assert_eq!(game.count(Square::King), 1);
        assert!(game.is_attacker_turn());
        assert!(!game.is_game_over());
    }

    #[test]
    fn test_square_out_of_bounds() {
        let game = BoardState::new();

        assert_eq!(game.square(11, 0), Err(GameError::OutOfBounds { row: 11, col: 0 }));
        assert_eq!(game.square_or_empty(-1, 4), Square::Empty);
        assert_eq!(game.square_or_empty(0, 11), Square::Empty);
        assert_eq!(game.square_or_empty(0, 4), Square::Attacker);
    }

    #[test]
    fn test_special_squares() {
        assert!(Position::new(0, 0).is_corner());
        assert!(Position::new(0, 10).is_corner());
        assert!(Position::new(10, 0).is_corner());
        assert!(Position::new(10, 10).is_corner());
        assert!(!Position::new(0, 5).is_corner());

        assert!(Position::new(5, 5).is_throne());
        assert!(!Position::new(4, 5).is_throne());
        assert!(Position::new(5, 5).is_special());
    }

    #[test]
    fn test_select_only_own_pieces() {
        let mut game = BoardState::new();

        // Defender square on the attackers' turn
        assert!(!game.select(3, 5));
        assert_eq!(game.selection(), None);

        assert!(game.select(0, 3));
        assert_eq!(game.selection(), Some(Position::new(0, 3)));

        // Empty square keeps the previous selection
        assert!(!game.select(2, 2));
        assert_eq!(game.selection(), Some(Position::new(0, 3)));
    }

    #[test]
    fn test_move_requires_selection() {
        let mut game = BoardState::new();
        assert!(!game.move_to(2, 3));
    }

    #[test]
    fn test_diagonal_and_null_moves_rejected() {
        let mut game = BoardState::new();
        assert!(game.select(0, 3));
        assert!(!game.move_to(1, 2));
        assert!(!game.move_to(0, 3));
        assert!(game.is_attacker_turn());
    }

    #[test]
    fn test_pieces_cannot_jump_over_others() {
        let mut game = BoardState::new();

        // (0,5) is blocked downwards by the attacker on (1,5)
        assert!(game.select(0, 5));
        assert!(!game.move_to(2, 5));

        // (0,3) cannot slide along row 0 through (0,4)
        assert!(game.select(0, 3));
        assert!(!game.move_to(0, 8));
    }

    #[test]
    fn test_only_king_can_enter_special_squares() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        move_king(&mut game, Position::new(8, 8));

        set_piece(&mut game, Position::new(0, 2), Square::Attacker);
        assert!(!play(&mut game, (0, 2), (0, 0)));

        set_piece(&mut game, Position::new(5, 2), Square::Attacker);
        assert!(!play(&mut game, (5, 2), (5, 5)));

        // Passing over the empty throne is fine
        assert!(play(&mut game, (5, 2), (5, 8)));
    }

    #[test]
    fn test_king_can_enter_corner() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        move_king(&mut game, Position::new(0, 1));
        set_piece(&mut game, Position::new(6, 6), Square::Attacker);
        set_piece(&mut game, Position::new(7, 7), Square::Attacker);
        set_piece(&mut game, Position::new(8, 8), Square::Attacker);
        game.turn = Player::Defenders;

        assert!(play(&mut game, (0, 1), (0, 0)));
        assert_eq!(game.result(), Some(GameResult::DefendersWin));
        assert!(!game.is_attacker_turn());
    }

    #[test]
    fn test_side_without_moves_loses() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        for (r, c) in [(1, 0), (1, 1), (3, 0), (3, 1), (2, 5)] {
            set_piece(&mut game, Position::new(r, c), Square::Defender);
        }
        set_piece(&mut game, Position::new(2, 0), Square::Attacker);
        set_piece(&mut game, Position::new(2, 1), Square::Attacker);
        game.turn = Player::Defenders;

        // (2,2) seals the last empty square next to either attacker
        assert!(play(&mut game, (2, 5), (2, 2)));
        assert_eq!(game.square(2, 1), Ok(Square::Attacker));
        assert_eq!(game.result(), Some(GameResult::DefendersWin));
        assert!(!game.is_attacker_turn());
    }

    fn edge_fort(game: &mut BoardState, sealed: bool) {
        clear_board(game);
        move_king(game, Position::new(9, 5));
        let mut walls = vec![(8, 4), (8, 5), (8, 6), (9, 4), (9, 6), (10, 4)];
        if sealed {
            walls.push((10, 6));
        }
        for (r, c) in walls {
            set_piece(game, Position::new(r, c), Square::Defender);
        }
        for (r, c) in [(0, 3), (0, 7), (2, 0)] {
            set_piece(game, Position::new(r, c), Square::Attacker);
        }
        game.turn = Player::Defenders;
    }

    #[test]
    fn test_king_on_edge_inside_fort_wins() {
        let mut game = BoardState::new();
        edge_fort(&mut game, true);

        assert!(play(&mut game, (9, 5), (10, 5)));
        assert!(terminal::is_king_guarded(&game));
        assert_eq!(game.result(), Some(GameResult::DefendersWin));
        assert!(!game.is_attacker_turn());
    }

    #[test]
    fn test_king_on_edge_with_open_fort_plays_on() {
        let mut game = BoardState::new();
        edge_fort(&mut game, false);

        assert!(play(&mut game, (9, 5), (10, 5)));
        assert!(!terminal::is_king_guarded(&game));
        assert_eq!(game.result(), None);
        assert!(game.is_attacker_turn());
    }

    #[test]
    fn test_move_updates_turn_and_history() {
        let mut game = BoardState::new();

        assert!(play(&mut game, (0, 3), (2, 3)));
        assert_eq!(game.square(0, 3), Ok(Square::Empty));
        assert_eq!(game.square(2, 3), Ok(Square::Attacker));
        assert_eq!(game.selection(), None);
        assert!(!game.is_attacker_turn());
        assert_eq!(game.attacker_history(), &[Position::new(2, 3)]);
        assert_eq!(game.moves_without_capture(), 1);

        assert!(play(&mut game, (3, 5), (3, 8)));
        assert!(game.is_attacker_turn());
        assert_eq!(game.defender_history(), &[Position::new(3, 8)]);
        assert_eq!(game.move_count(), 2);
    }

    #[test]
    fn test_defender_captured_between_attackers() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        set_piece(&mut game, Position::new(3, 4), Square::Attacker);
        set_piece(&mut game, Position::new(3, 5), Square::Defender);
        set_piece(&mut game, Position::new(1, 6), Square::Attacker);

        assert!(play(&mut game, (1, 6), (3, 6)));
        assert_eq!(game.square(3, 5), Ok(Square::Empty));
        assert_eq!(game.moves_without_capture(), 0);
    }

    #[test]
    fn test_attacker_captured_by_defender_and_king() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        move_king(&mut game, Position::new(2, 2));
        set_piece(&mut game, Position::new(2, 3), Square::Attacker);
        set_piece(&mut game, Position::new(7, 4), Square::Defender);
        set_piece(&mut game, Position::new(9, 9), Square::Attacker);
        game.turn = Player::Defenders;

        assert!(play(&mut game, (7, 4), (2, 4)));
        assert_eq!(game.square(2, 3), Ok(Square::Empty));
    }

    #[test]
    fn test_king_is_not_custodian_captured() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        move_king(&mut game, Position::new(3, 3));
        set_piece(&mut game, Position::new(3, 2), Square::Attacker);
        set_piece(&mut game, Position::new(7, 4), Square::Attacker);

        assert!(play(&mut game, (7, 4), (3, 4)));
        assert_eq!(game.square(3, 3), Ok(Square::King));
        assert!(!game.is_game_over());
    }

    #[test]
    fn test_no_capture_by_own_or_mixed_flank() {
        let mut game = BoardState::new();
        clear_board(&mut game);

        // A A . A: nothing happens to the middle attacker
        set_piece(&mut game, Position::new(2, 0), Square::Attacker);
        set_piece(&mut game, Position::new(2, 1), Square::Attacker);
        set_piece(&mut game, Position::new(2, 3), Square::Attacker);
        assert!(play(&mut game, (2, 3), (2, 2)));
        assert_eq!(game.square(2, 1), Ok(Square::Attacker));

        // D moves next to D with an attacker beyond: no capture
        set_piece(&mut game, Position::new(8, 1), Square::Attacker);
        set_piece(&mut game, Position::new(8, 2), Square::Defender);
        set_piece(&mut game, Position::new(8, 5), Square::Defender);
        assert!(play(&mut game, (8, 5), (8, 3)));
        assert_eq!(game.square(8, 2), Ok(Square::Defender));
    }

    #[test]
    fn test_board_edge_never_captures() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        set_piece(&mut game, Position::new(0, 2), Square::Defender);
        set_piece(&mut game, Position::new(3, 2), Square::Attacker);

        assert!(play(&mut game, (3, 2), (1, 2)));
        assert_eq!(game.square(0, 2), Ok(Square::Defender));
    }

    #[test]
    fn test_perpendicular_move_does_not_capture() {
        let mut game = BoardState::new();
        clear_board(&mut game);

        // Defender already sits between two attackers vertically
        set_piece(&mut game, Position::new(2, 3), Square::Attacker);
        set_piece(&mut game, Position::new(3, 3), Square::Defender);
        set_piece(&mut game, Position::new(4, 3), Square::Attacker);
        set_piece(&mut game, Position::new(8, 2), Square::Attacker);

        assert!(play(&mut game, (8, 2), (3, 2)));
        assert_eq!(game.square(3, 3), Ok(Square::Defender));
    }

    #[test]
    fn test_multiple_captures_in_one_move() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        set_piece(&mut game, Position::new(2, 2), Square::Attacker);
        set_piece(&mut game, Position::new(2, 3), Square::Defender);
        set_piece(&mut game, Position::new(3, 4), Square::Defender);
        set_piece(&mut game, Position::new(4, 4), Square::Attacker);
        set_piece(&mut game, Position::new(2, 8), Square::Attacker);

        assert!(play(&mut game, (2, 8), (2, 4)));
        assert_eq!(game.square(2, 3), Ok(Square::Empty));
        assert_eq!(game.square(3, 4), Ok(Square::Empty));
    }

    #[test]
    fn test_capture_clears_defensive_positions() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        set_piece(&mut game, Position::new(3, 4), Square::Attacker);
        set_piece(&mut game, Position::new(3, 5), Square::Defender);
        set_piece(&mut game, Position::new(1, 0), Square::Attacker);
        set_piece(&mut game, Position::new(7, 1), Square::Defender);

        assert!(play(&mut game, (1, 0), (1, 6)));
        let before = terminal::defensive_fingerprint(&game);
        assert_eq!(game.defensive_position_count(before), 1);

        assert!(play(&mut game, (7, 1), (7, 2)));
        let after = terminal::defensive_fingerprint(&game);
        assert_eq!(game.defensive_position_count(after), 1);
        assert_eq!(game.moves_without_capture(), 2);

        assert!(play(&mut game, (1, 6), (3, 6)));
        assert_eq!(game.square(3, 5), Ok(Square::Empty));
        assert_eq!(game.moves_without_capture(), 0);
        assert_eq!(game.defensive_position_count(before), 0);
        assert_eq!(game.defensive_position_count(after), 0);
    }

    #[test]
    fn test_make_move_reports_errors() {
        let mut game = BoardState::new();

        let illegal = Move::new(Position::new(0, 3), Position::new(1, 2));
        assert!(matches!(
            game.make_move(illegal),
            Err(GameError::InvalidMove(_))
        ));
        assert_eq!(game.selection(), None);

        let wrong_side = Move::new(Position::new(3, 5), Position::new(3, 8));
        assert!(matches!(
            game.make_move(wrong_side),
            Err(GameError::InvalidMove(_))
        ));

        game.make_move(Move::new(Position::new(0, 3), Position::new(2, 3)))
            .unwrap();
        assert!(!game.is_attacker_turn());
    }

    #[test]
    fn test_cannot_move_after_game_over() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        move_king(&mut game, Position::new(0, 1));
        set_piece(&mut game, Position::new(6, 6), Square::Attacker);
        set_piece(&mut game, Position::new(7, 7), Square::Attacker);
        set_piece(&mut game, Position::new(8, 8), Square::Attacker);
        game.turn = Player::Defenders;

        game.make_move(Move::new(Position::new(0, 1), Position::new(0, 0)))
            .unwrap();
        assert!(game.is_game_over());

        let result = game.make_move(Move::new(Position::new(6, 6), Position::new(6, 2)));
        assert_eq!(result, Err(GameError::GameOver));
        assert!(!play(&mut game, (0, 0), (1, 0)));
    }

    #[test]
    fn test_from_rows_validates_shape() {
        let short = ["EEEEEEEEEEE"; 10];
        assert!(matches!(
            BoardState::from_rows(&short, Player::Attackers),
            Err(GameError::BadBoardFormat(_))
        ));

        let mut rows = ["..........."; 11];
        rows[5] = ".....K....";
        assert!(matches!(
            BoardState::from_rows(&rows, Player::Attackers),
            Err(GameError::BadBoardFormat(_))
        ));

        rows[5] = ".....K.....";
        let board = BoardState::from_rows(&rows, Player::Defenders).unwrap();
        assert_eq!(board.king_position(), Position::new(5, 5));
        assert!(!board.is_attacker_turn());

        rows[5] = "...........";
        assert!(matches!(
            BoardState::from_rows(&rows, Player::Attackers),
            Err(GameError::BadBoardFormat(_))
        ));
    }

    #[test]
    fn test_display_board_marks_special_squares() {
        let mut game = BoardState::new();
        clear_board(&mut game);
        move_king(&mut game, Position::new(2, 2));

        let text = game.display_board();
        assert!(text.contains(" X "));
        assert!(text.contains(" T "));
        assert!(text.contains(" K "));
    }
}
