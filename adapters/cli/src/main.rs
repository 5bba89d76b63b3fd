#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays tile-merge sessions in the terminal.

mod board_code;
mod file_store;
mod render;

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    str::FromStr,
    sync::mpsc::Receiver,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tile_merge_core::{Direction, GameConfig};
use tile_merge_session::{GameStore, ScoreStore, Session, SessionConfig, StateChange};
use tile_merge_system_powerups::{GameMode, Powerup};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::file_store::JsonFileStore;

const HELP: &str = "\
moves:    w/a/s/d or up/down/left/right
undo:     z or undo
powerups: shuffle, remove, bonus
game:     n (new), c (continue after win), export, stats, reset-stats
other:    help, q (quit)";

/// Command-line arguments accepted by the tile-merge binary.
#[derive(Debug, Parser)]
#[command(name = "tile-merge", about = "Slide and merge numbered tiles")]
struct Args {
    /// TOML file holding a session configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Side length of the grid.
    #[arg(long)]
    size: Option<u32>,
    /// Number of undo snapshots to retain; zero disables undo.
    #[arg(long)]
    history: Option<usize>,
    /// Rule set: classic, standard or plus.
    #[arg(long)]
    mode: Option<GameMode>,
    /// Seed for tile spawns and powerups; random when neither this nor the config sets one.
    #[arg(long)]
    seed: Option<u64>,
    /// Directory holding the saved game, best score and statistics.
    #[arg(long, default_value = "tile-merge-save")]
    save_dir: PathBuf,
    /// Ignore any saved game and start fresh.
    #[arg(long)]
    new: bool,
    /// Start from a board code printed by `export`, replacing any saved game.
    #[arg(long, conflicts_with = "new")]
    import: Option<String>,
    /// Tracing filter used when `RUST_LOG` is unset, e.g. "info", "debug".
    #[arg(long, default_value = "warn")]
    log: String,
}

/// Session settings as written in a TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    game: GameConfig,
    mode: GameMode,
    seed: Option<u64>,
}

/// Line commands understood by the interactive loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Input {
    Move(Direction),
    Undo,
    Powerup(Powerup),
    NewGame,
    Continue,
    Export,
    Statistics,
    ResetStatistics,
    Help,
    Quit,
}

impl FromStr for Input {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let command = line.trim().to_ascii_lowercase();
        let input = match command.as_str() {
            "w" => Self::Move(Direction::Up),
            "a" => Self::Move(Direction::Left),
            "s" => Self::Move(Direction::Down),
            "d" => Self::Move(Direction::Right),
            "z" | "undo" => Self::Undo,
            "shuffle" => Self::Powerup(Powerup::Shuffle),
            "remove" => Self::Powerup(Powerup::Remove),
            "bonus" => Self::Powerup(Powerup::Undo),
            "n" | "new" => Self::NewGame,
            "c" | "continue" => Self::Continue,
            "export" => Self::Export,
            "stats" => Self::Statistics,
            "reset-stats" => Self::ResetStatistics,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            other => Self::Move(Direction::from_str(other).map_err(|error| error.to_string())?),
        };
        Ok(input)
    }
}

/// Entry point for the tile-merge command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    install_tracing(&args.log);

    let config = session_config(&args)?;
    let game_store = JsonFileStore::new(&args.save_dir);
    let score_store = JsonFileStore::new(&args.save_dir);
    info!(directory = %game_store.directory().display(), seed = config.seed, "opening session");

    let mut session =
        Session::new(config, game_store, score_store).context("invalid session configuration")?;
    let changes = session.subscribe();
    if let Some(code) = &args.import {
        let snapshot = board_code::decode(code).context("failed to read board code")?;
        session
            .import_game(snapshot)
            .context("imported board does not fit the configured grid")?;
    } else if args.new {
        session.new_game();
    } else {
        let _ = session.load_game();
    }

    let mut stdout = io::stdout().lock();
    present(&mut stdout, &changes, &session)?;
    writeln!(stdout, "type `help` for commands")?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let input = match line.parse::<Input>() {
            Ok(input) => input,
            Err(error) => {
                writeln!(stdout, "{error}")?;
                continue;
            }
        };

        let accepted = match input {
            Input::Move(direction) => session.move_tiles(direction),
            Input::Undo => session.undo(),
            Input::Powerup(powerup) => session.use_powerup(powerup),
            Input::NewGame => {
                session.new_game();
                true
            }
            Input::Continue => session.continue_after_win(),
            Input::Export => {
                let code = board_code::encode(&session.state())
                    .context("failed to encode board")?;
                writeln!(stdout, "{code}")?;
                true
            }
            Input::Statistics => {
                let statistics = session.statistics();
                writeln!(
                    stdout,
                    "played {}  won {}  highest tile {}  total score {}",
                    statistics.games_played,
                    statistics.games_won,
                    statistics.highest_tile,
                    statistics.total_score
                )?;
                true
            }
            Input::ResetStatistics => {
                session.reset_statistics();
                true
            }
            Input::Help => {
                writeln!(stdout, "{HELP}")?;
                true
            }
            Input::Quit => break,
        };

        if !accepted {
            writeln!(stdout, "nothing happened")?;
        }
        present(&mut stdout, &changes, &session)?;
    }

    session.save_game();
    Ok(())
}

fn install_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Builds the session configuration from the optional TOML file and flags.
fn session_config(args: &Args) -> Result<SessionConfig> {
    let file = match &args.config {
        Some(path) => read_config(path)?,
        None => FileConfig::default(),
    };
    let mut config = SessionConfig {
        game: file.game,
        mode: file.mode,
        seed: args.seed.or(file.seed).unwrap_or_else(rand::random),
    };
    if let Some(size) = args.size {
        config.game.size = size;
    }
    if let Some(history) = args.history {
        config.game.history_capacity = history;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    config
        .game
        .validate()
        .context("invalid game configuration")?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse session config toml contents")
}

/// Prints the board once if any state change arrived since the last call.
fn present<G, S>(
    out: &mut impl Write,
    changes: &Receiver<StateChange>,
    session: &Session<G, S>,
) -> Result<()>
where
    G: GameStore,
    S: ScoreStore,
{
    let Some(change) = changes.try_iter().last() else {
        return Ok(());
    };
    write!(out, "{}", render::board(&change.snapshot))?;
    if session.config().mode != GameMode::Classic {
        writeln!(out, "{}", render::inventory(session.inventory()))?;
    }
    if let Some(status) = render::status(&change.snapshot) {
        writeln!(out, "{status}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_words() {
        assert_eq!("w".parse::<Input>(), Ok(Input::Move(Direction::Up)));
        assert_eq!(" Left ".parse::<Input>(), Ok(Input::Move(Direction::Left)));
        assert_eq!("z".parse::<Input>(), Ok(Input::Undo));
        assert_eq!("bonus".parse::<Input>(), Ok(Input::Powerup(Powerup::Undo)));
        assert_eq!("Q".parse::<Input>(), Ok(Input::Quit));
        assert!("jump".parse::<Input>().is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let directory = std::env::temp_dir().join(format!("tile-merge-cli-{}", std::process::id()));
        fs::create_dir_all(&directory).expect("temp dir");
        let path = directory.join("session.toml");
        fs::write(
            &path,
            "mode = \"plus\"\nseed = 9\n\n[game]\nsize = 5\nhistory_capacity = 3\n",
        )
        .expect("temp file");

        let args = Args::parse_from([
            "tile-merge",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--size",
            "6",
        ]);
        let config = session_config(&args).expect("valid config");

        assert_eq!(config.game.size, 6);
        assert_eq!(config.game.history_capacity, 3);
        assert_eq!(config.mode, GameMode::Plus);
        assert_eq!(config.seed, 9);
        let _ = fs::remove_dir_all(directory);
    }

    #[test]
    fn config_file_without_seed_draws_a_fresh_one() {
        let directory =
            std::env::temp_dir().join(format!("tile-merge-cli-seed-{}", std::process::id()));
        fs::create_dir_all(&directory).expect("temp dir");
        let path = directory.join("session.toml");
        fs::write(&path, "mode = \"classic\"\n").expect("temp file");
        let args = Args::parse_from([
            "tile-merge",
            "--config",
            path.to_str().expect("utf-8 path"),
        ]);

        let first = session_config(&args).expect("valid config");
        let second = session_config(&args).expect("valid config");

        assert_eq!(first.mode, GameMode::Classic);
        assert_ne!(first.seed, second.seed);
        let _ = fs::remove_dir_all(directory);
    }

    #[test]
    fn import_conflicts_with_new() {
        let parsed =
            Args::try_parse_from(["tile-merge", "--new", "--import", "tile-merge:v1:4x4:e30="]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_out_of_range_size() {
        let args = Args::parse_from(["tile-merge", "--size", "1"]);
        assert!(session_config(&args).is_err());
    }
}
