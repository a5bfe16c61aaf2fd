//! Motion planning for Kineplan
//!
//! Planners search the configuration space for a collision-free sequence of
//! configurations from a start to a goal. They see the environment only
//! through a [`CollisionChecker`](crate::CollisionChecker) and never touch
//! the robot's live state.

pub mod astar;
pub mod execute;
pub mod rrt;
pub mod shortcut;

use crate::collision::RobotCollisionChecker;
use crate::kinematics::{Robot, RobotConfiguration};
use crate::world::World;
use crate::{KineplanConfig, KineplanError, Result};
use log::info;

/// Ordered waypoints from start to goal
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    waypoints: Vec<RobotConfiguration>,
}

impl Path {
    /// Wrap a waypoint list
    pub fn new(waypoints: Vec<RobotConfiguration>) -> Self {
        Path { waypoints }
    }

    /// Waypoints in order
    pub fn waypoints(&self) -> &[RobotConfiguration] {
        &self.waypoints
    }

    /// Consume the path
    pub fn into_waypoints(self) -> Vec<RobotConfiguration> {
        self.waypoints
    }

    /// Number of waypoints
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the path has no waypoints
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// First waypoint
    pub fn first(&self) -> Option<&RobotConfiguration> {
        self.waypoints.first()
    }

    /// Last waypoint
    pub fn last(&self) -> Option<&RobotConfiguration> {
        self.waypoints.last()
    }

    /// Iterate over waypoints
    pub fn iter(&self) -> std::slice::Iter<'_, RobotConfiguration> {
        self.waypoints.iter()
    }

    /// Sum of plain Euclidean segment lengths
    pub fn length(&self) -> f64 {
        self.waypoints.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    /// Sum of segment lengths with angles taken along the shorter arc
    /// (the lattice search cost)
    pub fn wrapped_length(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|w| w[0].wrapped_distance(&w[1]))
            .sum()
    }
}

impl From<Vec<RobotConfiguration>> for Path {
    fn from(waypoints: Vec<RobotConfiguration>) -> Self {
        Path::new(waypoints)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a RobotConfiguration;
    type IntoIter = std::slice::Iter<'a, RobotConfiguration>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

/// Reject a step or resolution that is not finite and strictly positive
pub(crate) fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KineplanError::InvalidParameter(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

/// Result of a finished planning run
#[derive(Clone, Debug, PartialEq)]
pub enum PlanOutcome {
    /// A path from start to goal
    Found(Path),
    /// Start already satisfies the goal; single waypoint, zero cost
    AlreadyAtGoal(Path),
    /// Search space or iteration budget exhausted
    NoPath,
    /// Caller stopped the search
    Cancelled,
}

impl PlanOutcome {
    /// The path, when one exists
    pub fn path(&self) -> Option<&Path> {
        match self {
            PlanOutcome::Found(path) | PlanOutcome::AlreadyAtGoal(path) => Some(path),
            PlanOutcome::NoPath | PlanOutcome::Cancelled => None,
        }
    }

    /// Consume into the path, when one exists
    pub fn into_path(self) -> Option<Path> {
        match self {
            PlanOutcome::Found(path) | PlanOutcome::AlreadyAtGoal(path) => Some(path),
            PlanOutcome::NoPath | PlanOutcome::Cancelled => None,
        }
    }

    /// Whether a path was produced
    pub fn is_success(&self) -> bool {
        self.path().is_some()
    }
}

/// Plan the mobile base with lattice A*; joints keep the start's values
pub fn plan_base_astar(
    robot: &Robot,
    world: &World,
    start: &RobotConfiguration,
    goal: &RobotConfiguration,
    config: &KineplanConfig,
) -> Result<PlanOutcome> {
    let checker = RobotCollisionChecker::new(robot, world);
    let mut planner = astar::GridAStar::new(&checker, start.clone(), goal.clone(), config.lattice.clone())?;
    let outcome = planner.plan();
    info!(
        "Lattice A* for '{}' in '{}' finished after {} expansions",
        robot.name(),
        world.name,
        planner.visited_count()
    );
    Ok(outcome)
}

/// Plan the full configuration with RRT-Connect, then shortcut the result
pub fn plan_with_rrt(
    robot: &Robot,
    world: &World,
    start: &RobotConfiguration,
    goal: &RobotConfiguration,
    config: &KineplanConfig,
) -> Result<PlanOutcome> {
    let checker = RobotCollisionChecker::new(robot, world);
    let mut planner = rrt::RrtConnect::new(&checker, world.bounds, start.clone(), goal.clone(), config.rrt.clone())?;
    match planner.plan() {
        PlanOutcome::Found(path) => {
            let before = path.len();
            let mut rng = config.shortcut.rng();
            let path = shortcut::shortcut(
                path,
                config.shortcut.iterations,
                &checker,
                config.shortcut.resolution,
                &mut rng,
            );
            info!("Shortcutting reduced the path from {} to {} waypoints", before, path.len());
            Ok(PlanOutcome::Found(path))
        }
        other => Ok(other),
    }
}
