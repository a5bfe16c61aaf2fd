//! Kineplan - kinematics and motion planning for articulated mobile robots
//!
//! This library computes forward kinematics over a tree-structured linkage,
//! checks robot configurations against static world obstacles, and searches
//! for collision-free paths with a lattice A* planner (mobile base) or an
//! RRT-Connect planner (full configuration vector).

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod collision;
pub mod grid;
pub mod kinematics;
pub mod planning;
pub mod robots;
pub mod world;

// Re-export commonly used items for easier access
pub use collision::{CollisionChecker, RobotCollisionChecker, is_colliding};
pub use grid::{Algorithm, GridScene, MapKind};
pub use kinematics::{
    Joint, JointId, JointSpec, JointType, Link, LinkGeometry, LinkId, LinkSpec, Robot,
    RobotBuilder, RobotConfiguration, RobotDescription,
};
pub use planning::astar::{Connectivity, GridAStar, LatticeConfig, MAX_HEADING_STEPS, SearchStatus};
pub use planning::rrt::{RrtConfig, RrtConnect, RrtStatus, TreeId};
pub use planning::shortcut::ShortcutConfig;
pub use planning::{Path, PlanOutcome};
pub use world::{Bounds, Obstacle, World};

use serde::{Deserialize, Serialize};

/// Main configuration structure for Kineplan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KineplanConfig {
    /// Lattice A* discretization
    pub lattice: LatticeConfig,
    /// RRT-Connect parameters
    pub rrt: RrtConfig,
    /// Shortcutting parameters
    pub shortcut: ShortcutConfig,
    /// Grid visualizer parameters
    pub scene: grid::SceneConfig,
}

impl KineplanConfig {
    /// Load a configuration from a YAML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: KineplanConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Check every planner section
    pub fn validate(&self) -> Result<()> {
        self.lattice.validate()?;
        self.rrt.validate()?;
        self.scene.validate()
    }

    /// Save the configuration to a YAML file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_yaml::to_writer(file, self)?;
        log::info!("Saved configuration to {}", path.as_ref().display());
        Ok(())
    }
}

/// Kineplan error types
#[derive(Debug)]
pub enum KineplanError {
    /// Configuration vector has the wrong dimension
    InvalidConfiguration {
        /// Expected vector length (3 + joint count)
        expected: usize,
        /// Supplied vector length
        actual: usize,
    },
    /// Tree selector was neither "A" nor "B"
    InvalidTree(String),
    /// Robot description failed validation
    InvalidRobot(String),
    /// Grid scene document is malformed
    InvalidScene(String),
    /// Planner parameter out of range
    InvalidParameter(String),
    /// File system error
    Io(String),
    /// YAML or JSON parse error
    Parse(String),
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, KineplanError>;

impl std::fmt::Display for KineplanError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            KineplanError::InvalidConfiguration { expected, actual } => write!(
                f,
                "Invalid configuration: expected a vector of length {}, got {}",
                expected, actual
            ),
            KineplanError::InvalidTree(tree) => {
                write!(f, "Invalid tree '{}': must be either 'A' or 'B'", tree)
            }
            KineplanError::InvalidRobot(msg) => write!(f, "Invalid robot: {}", msg),
            KineplanError::InvalidScene(msg) => write!(f, "Invalid scene: {}", msg),
            KineplanError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            KineplanError::Io(msg) => write!(f, "I/O error: {}", msg),
            KineplanError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for KineplanError {}

impl From<std::io::Error> for KineplanError {
    fn from(err: std::io::Error) -> Self {
        KineplanError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for KineplanError {
    fn from(err: serde_yaml::Error) -> Self {
        KineplanError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for KineplanError {
    fn from(err: serde_json::Error) -> Self {
        KineplanError::Parse(err.to_string())
    }
}
