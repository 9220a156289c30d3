pub mod arena;
pub mod bot;
pub mod config;
pub mod eval;
pub mod game;
pub mod notation;
pub mod rules;
pub mod search;
pub mod terminal;

pub use arena::*;
pub use bot::*;
pub use config::*;
pub use game::*;
pub use notation::NotationError;
pub use search::{SearchError, SearchOutcome, best_move};
