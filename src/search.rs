//! Depth-limited alpha-beta minimax driven by an explicit stack of frames.
//!
//! Defenders maximise [`utility`], attackers minimise it. Every node below the root carries
//! the root move that opened its line, so the value that bubbles back to the root names the
//! opening move directly. Ties never replace an earlier best, which makes the chosen move a
//! fixed function of the generation order in [`rules::candidate_moves`].

use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, error};

use crate::eval::utility;
use crate::game::{BoardState, GameError, Move};
use crate::rules;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search inconsistency: {0}")]
    Inconsistency(#[from] GameError),
}

/// A utility paired with the root move of the line that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub utility: f64,
    pub mv: Option<Move>,
}

pub const POSITIVE_INFINITY: Scored = Scored {
    utility: f64::INFINITY,
    mv: None,
};

pub const NEGATIVE_INFINITY: Scored = Scored {
    utility: f64::NEG_INFINITY,
    mv: None,
};

#[derive(Debug, Clone)]
pub struct Node {
    pub board: BoardState,
    /// First move of the line, inherited unchanged by every descendant.
    pub root_move: Option<Move>,
}

impl Node {
    pub fn root(board: BoardState) -> Self {
        Node {
            board,
            root_move: None,
        }
    }

    pub fn score(&self) -> Scored {
        Scored {
            utility: utility(&self.board),
            mv: self.root_move,
        }
    }
}

/// Source of candidate moves for expansion, in generation order.
type MoveSource = fn(&BoardState) -> Vec<Move>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Pending,
    Expanding,
    Pruned,
    Exhausted,
    Completed,
}

/// One simulated recursive call.
#[derive(Debug)]
pub struct Frame {
    pub node: Node,
    pub children: VecDeque<Node>,
    pub maximizing: bool,
    pub alpha: f64,
    pub beta: f64,
    pub vee: Scored,
    pub phase: FramePhase,
    absorbed: usize,
}

impl Frame {
    /// Children are generated only while `depth` is within `max_depth` (zero means no limit).
    fn open(
        node: Node,
        maximizing: bool,
        alpha: f64,
        beta: f64,
        depth: usize,
        max_depth: usize,
        moves: MoveSource,
    ) -> Result<Self, SearchError> {
        let children = if max_depth == 0 || depth <= max_depth {
            expand_with(&node, moves)?.into()
        } else {
            VecDeque::new()
        };

        Ok(Frame {
            node,
            children,
            maximizing,
            alpha,
            beta,
            vee: if maximizing {
                NEGATIVE_INFINITY
            } else {
                POSITIVE_INFINITY
            },
            phase: FramePhase::Pending,
            absorbed: 0,
        })
    }

    fn prune(&mut self) {
        let vee = self.vee.utility;
        if self.maximizing {
            if vee >= self.beta {
                self.cut();
            }
            if vee > self.alpha {
                self.alpha = vee;
            }
        } else {
            if vee <= self.alpha {
                self.cut();
            }
            if vee < self.beta {
                self.beta = vee;
            }
        }
    }

    fn cut(&mut self) {
        if !self.children.is_empty() {
            self.children.clear();
            self.phase = FramePhase::Pruned;
        }
    }

    fn next_child(&mut self) -> Option<Node> {
        let child = self.children.pop_front()?;
        self.phase = FramePhase::Expanding;
        Some(child)
    }

    /// Fold a completed child's value in. Strict comparisons keep the first of equal values.
    fn absorb(&mut self, value: Scored) {
        self.absorbed += 1;
        let better = if self.maximizing {
            self.vee.utility < value.utility
        } else {
            self.vee.utility > value.utility
        };
        if better {
            self.vee = value;
        }
        if self.children.is_empty() && self.phase != FramePhase::Pruned {
            self.phase = FramePhase::Exhausted;
        }
    }

    /// A frame that never absorbed a child is a leaf and reports its own node.
    fn complete(&mut self) -> Scored {
        self.phase = FramePhase::Completed;
        if self.absorbed == 0 {
            self.node.score()
        } else {
            self.vee
        }
    }
}

/// Children of `node` in generation order. Each child owns its own copy of the board.
pub fn expand(node: &Node) -> Result<Vec<Node>, SearchError> {
    expand_with(node, rules::candidate_moves)
}

/// Candidates naming a square off the board abort the whole search.
fn expand_with(node: &Node, moves: MoveSource) -> Result<Vec<Node>, SearchError> {
    let board = &node.board;
    let mut children = Vec::new();
    if board.is_game_over() {
        return Ok(children);
    }

    for mv in moves(board) {
        board.square_at(mv.from)?;
        board.square_at(mv.to)?;
        if !rules::is_valid_move(board, mv.to, mv.from) {
            continue;
        }

        let mut next = board.clone();
        if !(next.select(mv.from.row, mv.from.col) && next.move_to(mv.to.row, mv.to.col)) {
            continue;
        }

        children.push(Node {
            board: next,
            root_move: node.root_move.or(Some(mv)),
        });
    }

    Ok(children)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub mv: Move,
    pub utility: f64,
    /// Frames pushed during the walk, root included.
    pub frames: usize,
}

/// Best opening move for the side to move, searching `max_depth` plies (zero for no limit).
/// `None` when no move is available or the search hit an inconsistency.
pub fn best_move(board: &BoardState, max_depth: usize) -> Option<SearchOutcome> {
    search_with(board, max_depth, rules::candidate_moves)
}

fn search_with(board: &BoardState, max_depth: usize, moves: MoveSource) -> Option<SearchOutcome> {
    match run(board, max_depth, moves) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(%err, "search aborted");
            None
        }
    }
}

fn run(
    board: &BoardState,
    max_depth: usize,
    moves: MoveSource,
) -> Result<Option<SearchOutcome>, SearchError> {
    let maximizing = !board.is_attacker_turn();
    let root = Frame::open(
        Node::root(board.clone()),
        maximizing,
        f64::NEG_INFINITY,
        f64::INFINITY,
        1,
        max_depth,
        moves,
    )?;
    let mut stack = vec![root];
    let mut frames = 1;
    let mut answer = None;

    while let Some(frame) = stack.last_mut() {
        frame.prune();

        if let Some(child) = frame.next_child() {
            let (maximizing, alpha, beta) = (!frame.maximizing, frame.alpha, frame.beta);
            let depth = stack.len() + 1;
            stack.push(Frame::open(child, maximizing, alpha, beta, depth, max_depth, moves)?);
            frames += 1;
            continue;
        }

        let Some(mut done) = stack.pop() else {
            break;
        };
        let value = done.complete();
        match stack.last_mut() {
            Some(parent) => parent.absorb(value),
            None => answer = Some(value),
        }
    }

    let outcome = answer.and_then(|value| {
        value.mv.map(|mv| SearchOutcome {
            mv,
            utility: value.utility,
            frames,
        })
    });

    match &outcome {
        Some(found) => debug!(mv = %found.mv, utility = found.utility, frames, "search finished"),
        None => debug!(frames, "search found no move"),
    }

    Ok(outcome)
}
