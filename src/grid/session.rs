// grid/session.rs

// Interactive session over a grid scene. Mouse clicks and key presses are
// modeled as text commands so the binary can drive a scene from stdin:
//
//   place <row> <col>   left click
//   erase <row> <col>   right click
//   end                 pick a new end with the next placement
//   run                 plan from start to end
//   reset               reload the current map
//   clear               wipe the board, start and end included
//   save [path]         write JSON (default map.json)
//   load <path>         read JSON
//   show                print the board
//   quit

use super::{Algorithm, GridScene, MapKind, SearchReport};
use crate::{KineplanConfig, KineplanError, Result};
use log::info;
use std::path::PathBuf;
use std::str::FromStr;

/// Default file for `save`
pub const DEFAULT_SCENE_FILE: &str = "map.json";

/// One session command
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Place start, end or a barrier
    Place(usize, usize),
    /// Clear a cell
    Erase(usize, usize),
    /// Forget the end
    ClearEnd,
    /// Run the selected algorithm
    Run,
    /// Reload the map
    Reset,
    /// Clear everything
    Clear,
    /// Save the scene
    Save(Option<PathBuf>),
    /// Load a scene
    Load(PathBuf),
    /// Render the board
    Show,
    /// Leave the session
    Quit,
}

fn parse_cell<'a>(name: &str, mut args: impl Iterator<Item = &'a str>) -> Result<(usize, usize)> {
    let mut coordinate = |axis: &str| -> Result<usize> {
        let value = args
            .next()
            .ok_or_else(|| KineplanError::Parse(format!("{} needs a {}", name, axis)))?;
        value
            .parse()
            .map_err(|_| KineplanError::Parse(format!("{} is not a valid {}", value, axis)))
    };
    let row = coordinate("row")?;
    let col = coordinate("col")?;
    Ok((row, col))
}

impl FromStr for Command {
    type Err = KineplanError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Err(KineplanError::Parse("empty command".to_string()));
        };
        match keyword.to_ascii_lowercase().as_str() {
            "place" => parse_cell("place", words).map(|(r, c)| Command::Place(r, c)),
            "erase" => parse_cell("erase", words).map(|(r, c)| Command::Erase(r, c)),
            "end" => Ok(Command::ClearEnd),
            "run" => Ok(Command::Run),
            "reset" => Ok(Command::Reset),
            "clear" => Ok(Command::Clear),
            "save" => Ok(Command::Save(words.next().map(PathBuf::from))),
            "load" => words
                .next()
                .map(|path| Command::Load(PathBuf::from(path)))
                .ok_or_else(|| KineplanError::Parse("load needs a path".to_string())),
            "show" => Ok(Command::Show),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(KineplanError::Parse(format!("unknown command '{}'", other))),
        }
    }
}

/// Response to a command
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Text to show the user
    Message(String),
    /// Session is over
    Quit,
}

/// A scene plus the algorithm and map it was started with
pub struct GridSession {
    scene: GridScene,
    map: MapKind,
    algorithm: Algorithm,
    config: KineplanConfig,
    last_report: Option<SearchReport>,
}

impl GridSession {
    /// Start a session on a built-in map
    pub fn new(map: MapKind, algorithm: Algorithm, config: KineplanConfig) -> Self {
        let scene = GridScene::from_map(map, &config.scene);
        GridSession {
            scene,
            map,
            algorithm,
            config,
            last_report: None,
        }
    }

    /// The scene being edited
    pub fn scene(&self) -> &GridScene {
        &self.scene
    }

    /// Report of the most recent run
    pub fn last_report(&self) -> Option<&SearchReport> {
        self.last_report.as_ref()
    }

    /// Apply one command
    pub fn handle(&mut self, command: Command) -> Result<Reply> {
        let message = match command {
            Command::Place(row, col) => {
                let state = self.scene.place(row, col)?;
                format!("({}, {}) is now {:?}", row, col, state)
            }
            Command::Erase(row, col) => {
                self.scene.erase(row, col)?;
                format!("({}, {}) cleared", row, col)
            }
            Command::ClearEnd => {
                self.scene.clear_end();
                "Place a new end".to_string()
            }
            Command::Run => {
                let report = self.scene.run(self.algorithm, &self.config)?;
                let message = format!(
                    "Status: {:?} | Path Length: {:.1} | Visited Nodes: {} | Queue Size: {}",
                    report.status, report.path_length, report.visited, report.queue_size
                );
                self.last_report = Some(report);
                message
            }
            Command::Reset => {
                self.scene = GridScene::from_map(self.map, &self.config.scene);
                self.last_report = None;
                "Canvas Reset".to_string()
            }
            Command::Clear => {
                self.scene.clear_all();
                self.last_report = None;
                "Create your own map".to_string()
            }
            Command::Save(path) => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_SCENE_FILE));
                self.scene.save(&path)?;
                format!("Saved to {}", path.display())
            }
            Command::Load(path) => {
                self.scene = GridScene::load(&path)?;
                self.last_report = None;
                format!("Loaded {}", path.display())
            }
            Command::Show => self.scene.render(),
            Command::Quit => {
                info!("Session closed");
                return Ok(Reply::Quit);
            }
        };
        Ok(Reply::Message(message))
    }
}
