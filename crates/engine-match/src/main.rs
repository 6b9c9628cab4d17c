use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine_match::{EngineConfig, Match, MatchConfig, Player, ProcessEngine};
use std::io::BufReader;
use std::path::PathBuf;
use std::process::{ChildStdin, ChildStdout};

type ProcessPlayer = Player<BufReader<ChildStdout>, ChildStdin>;

#[derive(Parser)]
#[command(name = "engine-match")]
#[command(about = "Play two UCI engines against each other")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game between two engines
    Play {
        /// First player: a name from the config file or an engine path
        a: String,
        /// Second player: a name from the config file or an engine path
        b: String,
        /// TOML file with match settings and named players
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Ply ceiling, overriding the config file
        #[arg(short, long)]
        max_moves: Option<usize>,
        /// Search depth for both players, overriding the config file
        #[arg(short, long)]
        depth: Option<u32>,
        /// Print the match report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play {
            a,
            b,
            config,
            max_moves,
            depth,
            json,
        } => {
            let config = match config {
                Some(path) => MatchConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => MatchConfig::default(),
            };

            let first = launch(&config, &a, depth)?;
            let second = launch(&config, &b, depth)?;
            let max_moves = max_moves.unwrap_or(config.max_moves);

            let mut game =
                Match::new(first, second, max_moves)?.with_opening(config.opening.clone())?;
            let winner = game.run()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&game.report())?);
            } else {
                let state = game.state();
                println!("Moves: {}", state.moves().join(" "));
                match winner {
                    Some(id) => println!("Winner: {}", id),
                    None => println!("No winner ({:?})", state.termination()),
                }
            }
        }
    }

    Ok(())
}

/// Resolves `name` against the config's players, falling back to treating it
/// as an executable path, and launches the engine.
fn launch(config: &MatchConfig, name: &str, depth: Option<u32>) -> Result<ProcessPlayer> {
    let mut engine_config = config
        .player(name)
        .cloned()
        .unwrap_or_else(|_| EngineConfig::new(name));
    if let Some(depth) = depth {
        engine_config.depth = depth;
    }

    let engine = ProcessEngine::launch_with(&engine_config)
        .with_context(|| format!("Failed to launch {}", name))?;
    tracing::info!(player = name, engine = engine.name(), "Engine ready");
    Ok(Player::new(name, engine))
}
