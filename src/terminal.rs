//! Terminal-state checks: king capture, encirclement, exit forts and repetition.
//!
//! The flood fills run on an explicit worklist with a visited table, so their stack use
//! does not grow with the size of the filled region.

use crate::game::{BOARD_SIZE, BoardState, DIRECTIONS, Position, Square, all_positions};

type Visited = [[bool; BOARD_SIZE]; BOARD_SIZE];

/// The king is off the edge and all four neighbours are attackers.
pub fn king_capture(board: &BoardState) -> bool {
    let king = board.king_position();
    if king.is_edge() {
        return false;
    }

    DIRECTIONS.iter().all(|&(dr, dc)| {
        king.step(dr, dc)
            .is_some_and(|pos| board.grid()[pos.row][pos.col].is_attacking())
    })
}

/// Attackers have sealed every defending piece into one region with no path to the edge.
pub fn is_surrounded(board: &BoardState) -> bool {
    let mut visited: Visited = [[false; BOARD_SIZE]; BOARD_SIZE];
    let king = board.king_position();
    let mut worklist = vec![king];
    visited[king.row][king.col] = true;

    while let Some(pos) = worklist.pop() {
        for &(dr, dc) in &DIRECTIONS {
            // Reaching the edge means the ring is open
            let Some(next) = pos.step(dr, dc) else {
                return false;
            };
            if visited[next.row][next.col] || board.grid()[next.row][next.col].is_attacking() {
                continue;
            }
            visited[next.row][next.col] = true;
            worklist.push(next);
        }
    }

    all_positions()
        .filter(|pos| board.grid()[pos.row][pos.col].is_defending())
        .all(|pos| visited[pos.row][pos.col])
}

/// A defender with no orthogonal neighbours (board edge counts as empty) does not hold a wall.
fn is_capturable(board: &BoardState, pos: Position) -> bool {
    DIRECTIONS.iter().all(|&(dr, dc)| {
        board
            .square_or_empty(pos.row as isize + dr, pos.col as isize + dc)
            .is_empty()
    })
}

/// No attacker can reach the king through its wall of defenders, or too few attackers remain
/// to ever break one.
pub fn is_king_guarded(board: &BoardState) -> bool {
    if board.count(Square::Attacker) <= board.rules().fort_attacker_floor {
        return true;
    }

    let mut visited: Visited = [[false; BOARD_SIZE]; BOARD_SIZE];
    let king = board.king_position();
    let mut worklist = vec![king];
    visited[king.row][king.col] = true;

    while let Some(pos) = worklist.pop() {
        for &(dr, dc) in &DIRECTIONS {
            let Some(next) = pos.step(dr, dc) else {
                continue;
            };
            if visited[next.row][next.col] {
                continue;
            }
            match board.grid()[next.row][next.col] {
                Square::Attacker => return false,
                Square::Defender if !is_capturable(board, next) => continue,
                _ => {}
            }
            visited[next.row][next.col] = true;
            worklist.push(next);
        }
    }

    true
}

/// The king reached a corner, or stands on the edge inside a guarded fort.
pub fn king_escaped(board: &BoardState) -> bool {
    let king = board.king_position();
    king.is_corner() || (king.is_edge() && is_king_guarded(board))
}

/// The last `window` destinations alternate strictly between exactly two squares.
pub fn is_repetition(history: &[Position], window: usize) -> bool {
    if window < 2 || history.len() < window {
        return false;
    }

    let recent = &history[history.len() - window..];
    recent[0] != recent[1]
        && recent
            .iter()
            .enumerate()
            .all(|(i, pos)| *pos == recent[i % 2])
}

/// One bit per square, row-major, set where a defender or the king stands.
pub fn defensive_fingerprint(board: &BoardState) -> u128 {
    all_positions()
        .filter(|pos| board.grid()[pos.row][pos.col].is_defending())
        .fold(0u128, |bits, pos| bits | 1u128 << (pos.row * BOARD_SIZE + pos.col))
}
