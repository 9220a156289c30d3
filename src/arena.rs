use crate::bot::Bot;
use crate::config::EngineConfig;
use crate::game::{BoardState, GameResult, Move, Player};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Per-side thinking time. Lives outside the board so search never sees it.
#[derive(Debug, Clone)]
pub struct Clock {
    attackers: Duration,
    defenders: Duration,
    running: Option<(Player, Instant)>,
}

impl Clock {
    pub fn new(time_per_side: Duration) -> Self {
        Clock {
            attackers: time_per_side,
            defenders: time_per_side,
            running: None,
        }
    }

    /// Start timing `player`, stopping whichever side was running.
    pub fn start(&mut self, player: Player) {
        self.stop();
        self.running = Some((player, Instant::now()));
    }

    /// Stop the running side and charge it the elapsed time.
    pub fn stop(&mut self) -> Duration {
        let Some((player, started)) = self.running.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        let remaining = self.slot(player);
        *remaining = remaining.saturating_sub(elapsed);
        elapsed
    }

    pub fn remaining(&self, player: Player) -> Duration {
        match player {
            Player::Attackers => self.attackers,
            Player::Defenders => self.defenders,
        }
    }

    pub fn is_flagged(&self, player: Player) -> bool {
        self.remaining(player).is_zero()
    }

    pub fn running(&self) -> Option<Player> {
        self.running.map(|(player, _)| player)
    }

    fn slot(&mut self, player: Player) -> &mut Duration {
        match player {
            Player::Attackers => &mut self.attackers,
            Player::Defenders => &mut self.defenders,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    pub time_per_side: Duration,
    pub max_moves: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for MatchConfig {
    fn from(config: &EngineConfig) -> Self {
        MatchConfig {
            time_per_side: config.time_per_side(),
            max_moves: config.max_moves,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    AttackersWin { winner_name: String, moves: usize },
    DefendersWin { winner_name: String, moves: usize },
    Draw { moves: usize },
    Timeout { violator: String, winner: String },
    IllegalMove { violator: String, winner: String },
}

impl MatchResult {
    pub fn winner(&self) -> Option<&str> {
        match self {
            MatchResult::AttackersWin { winner_name, .. } => Some(winner_name),
            MatchResult::DefendersWin { winner_name, .. } => Some(winner_name),
            MatchResult::Timeout { winner, .. } => Some(winner),
            MatchResult::IllegalMove { winner, .. } => Some(winner),
            MatchResult::Draw { .. } => None,
        }
    }
}

pub struct Match {
    config: MatchConfig,
    state: BoardState,
    clock: Clock,
    attacker_bot: Box<dyn Bot>,
    defender_bot: Box<dyn Bot>,
}

impl Match {
    pub fn new(
        attacker_bot: Box<dyn Bot>,
        defender_bot: Box<dyn Bot>,
        config: MatchConfig,
    ) -> Self {
        Self::with_state(attacker_bot, defender_bot, config, BoardState::new())
    }

    /// Resume from an arbitrary position, e.g. one loaded from a record.
    pub fn with_state(
        attacker_bot: Box<dyn Bot>,
        defender_bot: Box<dyn Bot>,
        config: MatchConfig,
        state: BoardState,
    ) -> Self {
        Match {
            clock: Clock::new(config.time_per_side),
            config,
            state,
            attacker_bot,
            defender_bot,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn play(&mut self) -> MatchResult {
        self.attacker_bot.game_start(Player::Attackers);
        self.defender_bot.game_start(Player::Defenders);

        info!(
            attackers = self.attacker_bot.name(),
            defenders = self.defender_bot.name(),
            "match starting"
        );

        while !self.state.is_game_over() && self.state.move_count() < self.config.max_moves {
            if let Some(result) = self.play_turn(self.state.current_player()) {
                self.finish();
                return result;
            }
        }

        self.finish();
        let moves = self.state.move_count();

        match self.state.result() {
            Some(GameResult::AttackersWin) => {
                info!(winner = self.attacker_bot.name(), moves, "attackers win");
                MatchResult::AttackersWin {
                    winner_name: self.attacker_bot.name().to_string(),
                    moves,
                }
            }
            Some(GameResult::DefendersWin) => {
                info!(winner = self.defender_bot.name(), moves, "defenders win");
                MatchResult::DefendersWin {
                    winner_name: self.defender_bot.name().to_string(),
                    moves,
                }
            }
            Some(GameResult::Draw) => {
                info!(moves, "game drawn");
                MatchResult::Draw { moves }
            }
            None => {
                info!(max_moves = self.config.max_moves, "move cap reached");
                MatchResult::Draw { moves }
            }
        }
    }

    fn play_turn(&mut self, current_player: Player) -> Option<MatchResult> {
        let time_left = self.clock.remaining(current_player);
        self.clock.start(current_player);
        let bot = match current_player {
            Player::Attackers => &mut self.attacker_bot,
            Player::Defenders => &mut self.defender_bot,
        };
        let mv = bot.get_move(&self.state, time_left);
        let elapsed = self.clock.stop();

        self.handle_move_result(mv, elapsed, current_player)
    }

    fn handle_move_result(
        &mut self,
        mv: Option<Move>,
        elapsed: Duration,
        current_player: Player,
    ) -> Option<MatchResult> {
        let (bot_name, opponent_name) = match current_player {
            Player::Attackers => (self.attacker_bot.name(), self.defender_bot.name()),
            Player::Defenders => (self.defender_bot.name(), self.attacker_bot.name()),
        };

        if self.clock.is_flagged(current_player) {
            warn!(bot = bot_name, ?elapsed, "flag fell");
            return Some(MatchResult::Timeout {
                violator: bot_name.to_string(),
                winner: opponent_name.to_string(),
            });
        }

        let Some(mv) = mv else {
            warn!(bot = bot_name, "no move returned");
            return Some(MatchResult::Draw {
                moves: self.state.move_count(),
            });
        };

        if let Err(err) = self.state.make_move(mv) {
            warn!(bot = bot_name, %mv, %err, "illegal move");
            return Some(MatchResult::IllegalMove {
                violator: bot_name.to_string(),
                winner: opponent_name.to_string(),
            });
        }

        info!(
            ply = self.state.move_count(),
            bot = bot_name,
            %mv,
            ?elapsed,
            "move played"
        );

        self.attacker_bot.notify_move(mv);
        self.defender_bot.notify_move(mv);

        None
    }

    fn finish(&mut self) {
        self.clock.stop();
        self.attacker_bot.game_end();
        self.defender_bot.game_end();
    }
}
