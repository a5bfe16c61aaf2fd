// src/main.rs
// Entry point for the Kineplan grid visualizer: loads a built-in map and
// drives it with line commands read from stdin.

// Imports dependencies and Kineplan modules.
// - clap: command line parsing
// - env_logger: logging for debugging (RUST_LOG=info)
// - kineplan::grid: the scene and its interactive session
use clap::Parser;
use kineplan::KineplanConfig;
use kineplan::grid::{Algorithm, Command, GridSession, MapKind, Reply};
use log::{error, info};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Visualize grid search algorithms on built-in maps.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Search algorithm (astar or rrt)
    #[arg(long, default_value = "astar")]
    algorithm: Algorithm,

    /// Map to start from (empty, misc, narrow1, narrow2, three_section)
    #[arg(long, default_value = "empty")]
    map: MapKind,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for RRT sampling
    #[arg(short, long)]
    seed: Option<u64>,
}

/// Accept single-dash long flags (`-algorithm rrt`) as well as `--algorithm rrt`
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let single_dash_word = arg.len() > 2
                && arg.starts_with('-')
                && !arg.starts_with("--")
                && arg[1..].starts_with(|c: char| c.is_ascii_alphabetic());
            if i > 0 && single_dash_word { format!("-{}", arg) } else { arg }
        })
        .collect()
}

const HELP: &str = "commands: place <row> <col> | erase <row> <col> | end | run | reset | clear | save [path] | load <path> | show | quit";

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging for debugging
    env_logger::init();

    let cli = Cli::parse_from(normalize_args(std::env::args()));
    let mut config = match &cli.config {
        Some(path) => KineplanConfig::load(path)?,
        None => KineplanConfig::default(),
    };
    if cli.seed.is_some() {
        config.rrt.seed = cli.seed;
        config.shortcut.seed = cli.seed;
    }

    info!("Starting Kineplan with {} on map '{}'", cli.algorithm, cli.map);
    let mut session = GridSession::new(cli.map, cli.algorithm, config);
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{} ({})", e, HELP);
                continue;
            }
        };
        match session.handle(command) {
            Ok(Reply::Message(message)) => println!("{}", message),
            Ok(Reply::Quit) => break,
            Err(e) => error!("{}", e),
        }
        stdout.flush()?;
    }

    info!("Kineplan session finished");
    Ok(())
}
