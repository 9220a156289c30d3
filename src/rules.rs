//! Movement legality over a [`BoardState`].

use crate::game::{BOARD_SIZE, BoardState, DIRECTIONS, Move, Position, Square};

/// True iff every square between `from` and `to`, excluding `from` itself, is empty.
pub fn is_path_clear(board: &BoardState, to: Position, from: Position) -> bool {
    let (row_lo, row_hi) = (to.row.min(from.row), to.row.max(from.row));
    let (col_lo, col_hi) = (to.col.min(from.col), to.col.max(from.col));

    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            if row == from.row && col == from.col {
                continue;
            }
            match board.square(row, col) {
                Ok(square) if square.is_empty() => {}
                _ => return false,
            }
        }
    }

    true
}

/// Special-square restriction plus a clear path.
pub fn is_valid_move(board: &BoardState, to: Position, from: Position) -> bool {
    let Ok(piece) = board.square_at(from) else {
        return false;
    };
    if to.is_special() && piece != Square::King {
        return false;
    }
    is_path_clear(board, to, from)
}

/// True iff some piece of the side to move has an empty orthogonal neighbour.
pub fn are_moves_available(board: &BoardState) -> bool {
    board.pieces(board.current_player()).any(|pos| {
        DIRECTIONS.iter().any(|&(dr, dc)| {
            pos.step(dr, dc)
                .is_some_and(|next| board.grid()[next.row][next.col].is_empty())
        })
    })
}

/// Every destination along each piece's row and then its column, pieces scanned row-major.
/// Unfiltered; the origin itself is skipped.
pub fn candidate_moves(board: &BoardState) -> Vec<Move> {
    let mut moves = Vec::new();

    for from in board.pieces(board.current_player()) {
        for col in 0..BOARD_SIZE {
            if col != from.col {
                moves.push(Move::new(from, Position::new(from.row, col)));
            }
        }
        for row in 0..BOARD_SIZE {
            if row != from.row {
                moves.push(Move::new(from, Position::new(row, from.col)));
            }
        }
    }

    moves
}

/// Legal moves for the side to move, in search order.
pub fn legal_moves(board: &BoardState) -> Vec<Move> {
    if board.is_game_over() {
        return Vec::new();
    }

    candidate_moves(board)
        .into_iter()
        .filter(|mv| is_valid_move(board, mv.to, mv.from))
        .collect()
}
