use crate::game::{BoardState, Move, Player};
use crate::rules;
use crate::search;
use std::time::Duration;
use tracing::debug;

/// A player driven by the arena.
pub trait Bot: Send {
    fn name(&self) -> &str;

    /// Pick a move for the side to move. The arena measures the time spent;
    /// `time_left` is what remains on this side's clock.
    fn get_move(&mut self, state: &BoardState, time_left: Duration) -> Option<Move>;

    fn game_start(&mut self, _player: Player) {}

    fn notify_move(&mut self, _mv: Move) {}

    fn game_end(&mut self) {}
}

/// Plays the first move in generation order.
pub struct FirstMoveBot {
    name: String,
}

impl FirstMoveBot {
    pub fn new(name: impl Into<String>) -> Self {
        FirstMoveBot { name: name.into() }
    }
}

impl Bot for FirstMoveBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, state: &BoardState, _time_left: Duration) -> Option<Move> {
        rules::legal_moves(state).into_iter().next()
    }
}

/// Fixed-depth alpha-beta search.
pub struct AlphaBetaBot {
    name: String,
    depth: usize,
    side: Option<Player>,
}

impl AlphaBetaBot {
    pub fn new(name: impl Into<String>, depth: usize) -> Self {
        AlphaBetaBot {
            name: name.into(),
            depth,
            side: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Bot for AlphaBetaBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, state: &BoardState, _time_left: Duration) -> Option<Move> {
        let outcome = search::best_move(state, self.depth)?;
        debug!(
            bot = %self.name,
            side = ?self.side,
            mv = %outcome.mv,
            utility = outcome.utility,
            "bot chose move"
        );
        Some(outcome.mv)
    }

    fn game_start(&mut self, player: Player) {
        self.side = Some(player);
    }

    fn game_end(&mut self) {
        self.side = None;
    }
}
