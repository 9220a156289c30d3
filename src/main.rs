use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tafl_engine::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Hnefatafl rules engine and alpha-beta player
#[derive(Parser, Debug)]
#[command(name = "tafl-engine")]
#[command(about = "11x11 Hnefatafl engine with an alpha-beta bot", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON engine config; missing fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play the engine against itself from the opening position
    Play {
        /// Search depth for the attackers (0 = unlimited)
        #[arg(long)]
        attacker_depth: Option<usize>,

        /// Search depth for the defenders (0 = unlimited)
        #[arg(long)]
        defender_depth: Option<usize>,

        /// Stop after this many half-moves
        #[arg(long)]
        max_moves: Option<usize>,

        /// Seconds on each side's clock
        #[arg(long)]
        time_per_side: Option<u64>,

        /// Resume from a saved record instead of the opening
        #[arg(long)]
        record: Option<PathBuf>,

        /// Write the final position as a record
        #[arg(long)]
        record_out: Option<PathBuf>,
    },

    /// Load a saved record and print the best move for the side to move
    Analyse {
        /// Record file to load
        record: PathBuf,

        /// Search depth (0 = unlimited)
        #[arg(short, long, default_value = "2")]
        depth: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Play {
            attacker_depth,
            defender_depth,
            max_moves,
            time_per_side,
            record,
            record_out,
        } => {
            if let Some(depth) = attacker_depth {
                config.attacker_depth = depth;
            }
            if let Some(depth) = defender_depth {
                config.defender_depth = depth;
            }
            if let Some(moves) = max_moves {
                config.max_moves = moves;
            }
            if let Some(secs) = time_per_side {
                config.time_per_side_secs = secs;
            }
            play(&config, record, record_out)
        }
        Command::Analyse { record, depth } => analyse(&config, &record, depth),
    }
}

fn load_record(config: &EngineConfig, path: &Path) -> Result<BoardState> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading record {}", path.display()))?;
    BoardState::from_record_with_rules(&text, config.rules)
        .with_context(|| format!("parsing record {}", path.display()))
}

fn play(config: &EngineConfig, record: Option<PathBuf>, record_out: Option<PathBuf>) -> Result<()> {
    let state = match &record {
        Some(path) => load_record(config, path)?,
        None => BoardState::with_rules(config.rules),
    };

    let attackers = AlphaBetaBot::new(
        format!("alphabeta-d{}", config.attacker_depth),
        config.attacker_depth,
    );
    let defenders = AlphaBetaBot::new(
        format!("alphabeta-d{}", config.defender_depth),
        config.defender_depth,
    );
    info!(
        attacker_depth = config.attacker_depth,
        defender_depth = config.defender_depth,
        max_moves = config.max_moves,
        time_per_side = ?Duration::from_secs(config.time_per_side_secs),
        "self-play"
    );

    let mut game = Match::with_state(
        Box::new(attackers),
        Box::new(defenders),
        MatchConfig::from(config),
        state,
    );
    let result = game.play();

    println!("{}", game.state().display_board());
    match result {
        MatchResult::AttackersWin { winner_name, moves } => {
            println!("{} wins as Attackers in {} moves", winner_name, moves);
        }
        MatchResult::DefendersWin { winner_name, moves } => {
            println!("{} wins as Defenders in {} moves", winner_name, moves);
        }
        MatchResult::Draw { moves } => {
            println!("Draw after {} moves", moves);
        }
        MatchResult::Timeout { violator, winner } => {
            println!("{} wins on time (opponent: {})", winner, violator);
        }
        MatchResult::IllegalMove { violator, winner } => {
            println!("{} wins by illegal move (opponent: {})", winner, violator);
        }
    }

    if let Some(path) = record_out {
        std::fs::write(&path, game.state().to_record())
            .with_context(|| format!("writing record {}", path.display()))?;
        info!(path = %path.display(), "record saved");
    }

    Ok(())
}

fn analyse(config: &EngineConfig, path: &Path, depth: usize) -> Result<()> {
    let state = load_record(config, path)?;
    println!("{}", state.display_board());

    let Some(outcome) = best_move(&state, depth) else {
        bail!("no move found for {}", state.current_player());
    };

    println!("{} to move", state.current_player());
    println!("best move: {}", outcome.mv);
    println!("utility:   {:.3}", outcome.utility);
    println!("frames:    {}", outcome.frames);
    Ok(())
}
