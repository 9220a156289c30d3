//! Line-oriented record of a game in progress.
//!
//! ```text
//! <moves without capture>
//! <attackers to move: true|false>
//! <attacker move count>
//! <defender move count>
//! <tag><row:2><col:2>      one line per recorded move, tag is A or D
//! <king row>
//! <king col>
//! <11 grid rows of A, D, K, E>
//! ```

use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

use crate::config::RulesConfig;
use crate::game::{BOARD_SIZE, BoardState, GameError, Player, Position, parse_grid};

#[derive(Debug, Error)]
pub enum NotationError {
    #[error("record ended before {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {source}")]
    Number {
        field: &'static str,
        source: ParseIntError,
    },
    #[error("invalid side to move: {0:?}")]
    Turn(String),
    #[error("invalid history entry: {0:?}")]
    History(String),
    #[error("expected {expected} {side} history entries, found {found}")]
    HistoryCount {
        side: Player,
        expected: usize,
        found: usize,
    },
    #[error("king recorded at {recorded} but the grid has it at {actual}")]
    KingMismatch {
        recorded: Position,
        actual: Position,
    },
    #[error(transparent)]
    Board(#[from] GameError),
}

impl BoardState {
    /// Emit the persisted record for this position.
    pub fn to_record(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.moves_without_capture()));
        out.push_str(&format!("{}\n", self.is_attacker_turn()));
        out.push_str(&format!("{}\n", self.attacker_history().len()));
        out.push_str(&format!("{}\n", self.defender_history().len()));
        for pos in self.attacker_history() {
            out.push_str(&format!("A{:02}{:02}\n", pos.row, pos.col));
        }
        for pos in self.defender_history() {
            out.push_str(&format!("D{:02}{:02}\n", pos.row, pos.col));
        }
        let king = self.king_position();
        out.push_str(&format!("{}\n{}\n", king.row, king.col));
        for row in self.grid() {
            out.extend(row.iter().map(|square| square.to_char()));
            out.push('\n');
        }
        out
    }

    pub fn from_record(text: &str) -> Result<Self, NotationError> {
        Self::from_record_with_rules(text, RulesConfig::default())
    }

    pub fn from_record_with_rules(text: &str, rules: RulesConfig) -> Result<Self, NotationError> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let moves_without_capture: u32 = number(&mut lines, "moves without capture")?;
        let turn = match next(&mut lines, "side to move")? {
            "true" | "1" => Player::Attackers,
            "false" | "0" => Player::Defenders,
            other => return Err(NotationError::Turn(other.to_string())),
        };
        let attacker_count: usize = number(&mut lines, "attacker move count")?;
        let defender_count: usize = number(&mut lines, "defender move count")?;

        let mut attacker_history = Vec::with_capacity(attacker_count);
        let mut defender_history = Vec::with_capacity(defender_count);
        for _ in 0..attacker_count + defender_count {
            let (side, pos) = history_entry(next(&mut lines, "move history")?)?;
            match side {
                Player::Attackers => attacker_history.push(pos),
                Player::Defenders => defender_history.push(pos),
            }
        }
        for (side, expected, found) in [
            (Player::Attackers, attacker_count, attacker_history.len()),
            (Player::Defenders, defender_count, defender_history.len()),
        ] {
            if expected != found {
                return Err(NotationError::HistoryCount {
                    side,
                    expected,
                    found,
                });
            }
        }

        let king_row: usize = number(&mut lines, "king row")?;
        let king_col: usize = number(&mut lines, "king column")?;

        let rows: Vec<&str> = lines.collect();
        let grid = parse_grid(&rows)?;
        let board = BoardState::from_parts(
            grid,
            turn,
            moves_without_capture,
            attacker_history,
            defender_history,
            rules,
        )?;

        let recorded = Position::new(king_row, king_col);
        if board.king_position() != recorded {
            return Err(NotationError::KingMismatch {
                recorded,
                actual: board.king_position(),
            });
        }

        Ok(board)
    }
}

fn next<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<&'a str, NotationError> {
    lines.next().ok_or(NotationError::Missing(field))
}

fn number<'a, T>(
    lines: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<T, NotationError>
where
    T: FromStr<Err = ParseIntError>,
{
    next(lines, field)?
        .parse()
        .map_err(|source| NotationError::Number { field, source })
}

fn history_entry(line: &str) -> Result<(Player, Position), NotationError> {
    let bad = || NotationError::History(line.to_string());

    let side = match line.chars().next() {
        Some('A') => Player::Attackers,
        Some('D') => Player::Defenders,
        _ => return Err(bad()),
    };
    let digits = line.get(1..).ok_or_else(bad)?;
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let row: usize = digits[..2].parse().map_err(|_| bad())?;
    let col: usize = digits[2..].parse().map_err(|_| bad())?;
    if row >= BOARD_SIZE || col >= BOARD_SIZE {
        return Err(bad());
    }

    Ok((side, Position::new(row, col)))
}
