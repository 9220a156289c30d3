use crate::game::{BOARD_SIZE, BoardState, CENTER, Square};

/// Utility reported for a finished game.
pub const TERMINAL_UTILITY: f64 = 100.0;

/// Distance from the throne to any corner.
pub const CORNER_REACH: f64 = 7.071;

/// Heuristic value of a position. Low values favour the attackers, high values the defenders.
pub fn utility(board: &BoardState) -> f64 {
    if board.is_game_over() {
        return if board.is_attacker_turn() {
            -TERMINAL_UTILITY
        } else {
            TERMINAL_UTILITY
        };
    }

    let defenders = (board.count(Square::Defender) + board.count(Square::King)) as f64;
    let attackers = board.count(Square::Attacker) as f64;

    (defenders - attackers) + (CORNER_REACH - king_corner_distance(board))
}

/// Euclidean distance from the king to the corner of its quadrant.
pub fn king_corner_distance(board: &BoardState) -> f64 {
    let king = board.king_position();
    let corner_row = if king.row <= CENTER { 0 } else { BOARD_SIZE - 1 };
    let corner_col = if king.col <= CENTER { 0 } else { BOARD_SIZE - 1 };

    let dr = king.row.abs_diff(corner_row) as f64;
    let dc = king.col.abs_diff(corner_col) as f64;
    (dr * dr + dc * dc).sqrt()
}
