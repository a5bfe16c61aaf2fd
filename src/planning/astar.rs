// planning/astar.rs

// Lattice A* over the mobile base (x, y, heading). Joint values are carried
// unchanged from the start configuration. Nodes are identified by their
// coordinates quantized to five decimals, so revisiting a pose through a
// different sequence of float additions still lands on the same node.

// Dependencies
// - CollisionChecker: drops colliding neighbors
// - BinaryHeap/HashMap/HashSet: OPEN queue, node index, OPEN/CLOSED membership
use super::{Path, PlanOutcome, require_positive};
use crate::collision::CollisionChecker;
use crate::kinematics::{RobotConfiguration, angle_difference, wrap_angle};
use crate::{KineplanError, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::f64::consts::{FRAC_PI_2, PI};

const QUANTUM: f64 = 1e5;

/// Planar neighbor stencil
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// ±Δx, ±Δy, ±Δheading
    Four,
    /// The eight planar moves plus every heading multiple of Δheading
    #[default]
    Eight,
}

/// Lattice discretization and search limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Step along x
    pub delta_x: f64,
    /// Step along y
    pub delta_y: f64,
    /// Heading step; `None` keeps the start heading and ignores it at the goal
    pub delta_heading: Option<f64>,
    /// Neighbor stencil
    pub connectivity: Connectivity,
    /// Per-field tolerance for reaching the goal
    pub goal_tolerance: f64,
    /// Give up after this many expansions
    pub max_expansions: Option<usize>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        LatticeConfig {
            delta_x: 0.1,
            delta_y: 0.1,
            delta_heading: Some(FRAC_PI_2),
            connectivity: Connectivity::Eight,
            goal_tolerance: 1e-5,
            max_expansions: None,
        }
    }
}

/// Finest heading discretization the 8-connected stencil will enumerate
pub const MAX_HEADING_STEPS: usize = 360;

impl LatticeConfig {
    /// Check that the lattice steps describe a finite stencil
    pub fn validate(&self) -> Result<()> {
        require_positive("delta_x", self.delta_x)?;
        require_positive("delta_y", self.delta_y)?;
        if let Some(dtheta) = self.delta_heading {
            require_positive("delta_heading", dtheta)?;
            if (2.0 * PI / dtheta).round() > MAX_HEADING_STEPS as f64 {
                return Err(KineplanError::InvalidParameter(format!(
                    "delta_heading {} splits a turn into more than {} steps",
                    dtheta, MAX_HEADING_STEPS
                )));
            }
        }
        if !(self.goal_tolerance.is_finite() && self.goal_tolerance >= 0.0) {
            return Err(KineplanError::InvalidParameter(format!(
                "goal_tolerance must be finite and non-negative, got {}",
                self.goal_tolerance
            )));
        }
        Ok(())
    }
}

/// Search state reported by [`GridAStar::step`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    /// OPEN is not empty and the goal has not been popped
    Iterating,
    /// Goal popped, path available
    Success,
    /// OPEN exhausted or expansion budget spent
    Failure,
    /// Stopped by the caller
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LatticeKey([i64; 3]);

impl LatticeKey {
    fn of(configuration: &RobotConfiguration) -> Self {
        let [x, y] = configuration.base_position();
        let half_turn = (PI * QUANTUM).round() as i64;
        let mut heading = (wrap_angle(configuration.base_heading()) * QUANTUM).round() as i64;
        // -π and π are the same heading
        if heading <= -half_turn {
            heading += 2 * half_turn;
        }
        LatticeKey([(x * QUANTUM).round() as i64, (y * QUANTUM).round() as i64, heading])
    }
}

#[derive(Clone, Debug)]
struct SearchNode {
    configuration: RobotConfiguration,
    g: f64,
    parent: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    f: f64,
    order: u64,
    node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // reversed so the max-heap pops the lowest f, then the oldest insertion
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Resumable lattice A* search
pub struct GridAStar<'a, C: CollisionChecker + ?Sized> {
    checker: &'a C,
    config: LatticeConfig,
    start: RobotConfiguration,
    goal: RobotConfiguration,
    nodes: Vec<SearchNode>,
    index: HashMap<LatticeKey, usize>,
    open: BinaryHeap<OpenEntry>,
    open_set: HashSet<usize>,
    closed_set: HashSet<usize>,
    insertions: u64,
    status: SearchStatus,
    path: Option<Path>,
    cost: Option<f64>,
}

impl<'a, C: CollisionChecker + ?Sized> GridAStar<'a, C> {
    /// Prepare a search from `start` to `goal`
    ///
    /// A colliding start or goal leaves the search in `Failure` immediately. Lattice
    /// steps that are not finite and positive are rejected.
    pub fn new(
        checker: &'a C,
        start: RobotConfiguration,
        goal: RobotConfiguration,
        config: LatticeConfig,
    ) -> Result<Self> {
        config.validate()?;
        if start.len() != goal.len() {
            return Err(KineplanError::InvalidConfiguration {
                expected: start.len(),
                actual: goal.len(),
            });
        }

        let mut search = GridAStar {
            checker,
            config,
            start: start.clone(),
            goal,
            nodes: Vec::new(),
            index: HashMap::new(),
            open: BinaryHeap::new(),
            open_set: HashSet::new(),
            closed_set: HashSet::new(),
            insertions: 0,
            status: SearchStatus::Iterating,
            path: None,
            cost: None,
        };

        if checker.is_colliding(&search.start) {
            warn!("A* start configuration is in collision");
            search.status = SearchStatus::Failure;
            return Ok(search);
        }
        if checker.is_colliding(&search.goal) {
            warn!("A* goal configuration is in collision");
            search.status = SearchStatus::Failure;
            return Ok(search);
        }

        let root = search.node_for(start);
        search.nodes[root].g = 0.0;
        search.push_open(root);
        info!(
            "A* search started ({:?}, dx={}, dy={}, dheading={:?})",
            search.config.connectivity, search.config.delta_x, search.config.delta_y, search.config.delta_heading
        );
        Ok(search)
    }

    /// Current status
    pub fn status(&self) -> SearchStatus {
        self.status
    }

    /// Search parameters
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    /// Path found so far (only after `Success`)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Cost of the found path
    pub fn cost(&self) -> Option<f64> {
        self.cost
    }

    /// Number of expanded (closed) nodes
    pub fn visited_count(&self) -> usize {
        self.closed_set.len()
    }

    /// Number of nodes currently in OPEN
    pub fn queue_size(&self) -> usize {
        self.open_set.len()
    }

    /// Configurations currently in OPEN
    pub fn open_configurations(&self) -> impl Iterator<Item = &RobotConfiguration> + '_ {
        self.open_set.iter().map(move |&i| &self.nodes[i].configuration)
    }

    /// Configurations already expanded
    pub fn closed_configurations(&self) -> impl Iterator<Item = &RobotConfiguration> + '_ {
        self.closed_set.iter().map(move |&i| &self.nodes[i].configuration)
    }

    /// Stop the search; later steps are no-ops
    pub fn cancel(&mut self) {
        if self.status == SearchStatus::Iterating {
            info!("A* search cancelled after {} expansions", self.closed_set.len());
            self.status = SearchStatus::Cancelled;
        }
    }

    /// Final outcome, or `None` while still iterating
    pub fn outcome(&self) -> Option<PlanOutcome> {
        match self.status {
            SearchStatus::Iterating => None,
            SearchStatus::Success => self.path.clone().map(|path| {
                if path.len() == 1 {
                    PlanOutcome::AlreadyAtGoal(path)
                } else {
                    PlanOutcome::Found(path)
                }
            }),
            SearchStatus::Failure => Some(PlanOutcome::NoPath),
            SearchStatus::Cancelled => Some(PlanOutcome::Cancelled),
        }
    }

    /// Run until the search finishes
    pub fn plan(&mut self) -> PlanOutcome {
        while self.step() == SearchStatus::Iterating {}
        self.outcome().unwrap_or(PlanOutcome::NoPath)
    }

    /// Pop and expand one node
    pub fn step(&mut self) -> SearchStatus {
        if self.status != SearchStatus::Iterating {
            return self.status;
        }

        let Some(entry) = self.open.pop() else {
            info!("A* exhausted OPEN after {} expansions, no path", self.closed_set.len());
            self.status = SearchStatus::Failure;
            return self.status;
        };
        let current = entry.node;
        if self.closed_set.contains(&current) {
            // superseded entry for a node that was re-pushed with a lower f
            return self.status;
        }
        self.open_set.remove(&current);

        if self.is_goal(&self.nodes[current].configuration) {
            self.finish(current);
            return self.status;
        }
        self.closed_set.insert(current);

        if let Some(budget) = self.config.max_expansions {
            if self.closed_set.len() >= budget {
                warn!("A* expansion budget of {} spent", budget);
                self.status = SearchStatus::Failure;
                return self.status;
            }
        }

        let current_g = self.nodes[current].g;
        for neighbor in self.stencil(&self.nodes[current].configuration) {
            let key = LatticeKey::of(&neighbor);
            if let Some(index) = self.index.get(&key) {
                if self.closed_set.contains(index) {
                    continue;
                }
            }
            if self.checker.is_colliding(&neighbor) {
                continue;
            }
            let tentative = current_g + self.edge_cost(&self.nodes[current].configuration, &neighbor);
            let index = self.node_for(neighbor);
            if tentative < self.nodes[index].g {
                self.nodes[index].g = tentative;
                self.nodes[index].parent = Some(current);
                self.push_open(index);
            }
        }
        debug!(
            "A* expanded node {} (g={:.4}), open={}, closed={}",
            current,
            current_g,
            self.open_set.len(),
            self.closed_set.len()
        );
        self.status
    }

    fn node_for(&mut self, configuration: RobotConfiguration) -> usize {
        let key = LatticeKey::of(&configuration);
        if let Some(&index) = self.index.get(&key) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(SearchNode {
            configuration,
            g: f64::INFINITY,
            parent: None,
        });
        self.index.insert(key, index);
        index
    }

    fn push_open(&mut self, index: usize) {
        let f = self.nodes[index].g + self.heuristic(&self.nodes[index].configuration);
        self.open.push(OpenEntry {
            f,
            order: self.insertions,
            node: index,
        });
        self.insertions += 1;
        self.open_set.insert(index);
    }

    fn is_goal(&self, configuration: &RobotConfiguration) -> bool {
        let tolerance = self.config.goal_tolerance;
        let [x, y] = configuration.base_position();
        let [gx, gy] = self.goal.base_position();
        let heading_ok = self.config.delta_heading.is_none()
            || angle_difference(configuration.base_heading(), self.goal.base_heading()).abs() <= tolerance;
        (x - gx).abs() <= tolerance && (y - gy).abs() <= tolerance && heading_ok
    }

    fn finish(&mut self, goal_index: usize) {
        let mut waypoints = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(index) = cursor {
            waypoints.push(self.nodes[index].configuration.clone());
            cursor = self.nodes[index].parent;
        }
        waypoints.reverse();
        let cost = self.nodes[goal_index].g;
        info!(
            "A* reached the goal: {} waypoints, cost {:.4}, {} expansions",
            waypoints.len(),
            cost,
            self.closed_set.len()
        );
        self.path = Some(Path::new(waypoints));
        self.cost = Some(cost);
        self.status = SearchStatus::Success;
    }

    fn planar_metric(&self, a: &RobotConfiguration, b: &RobotConfiguration) -> f64 {
        let [ax, ay] = a.base_position();
        let [bx, by] = b.base_position();
        let dtheta = if self.config.delta_heading.is_some() {
            angle_difference(a.base_heading(), b.base_heading())
        } else {
            0.0
        };
        ((ax - bx).powi(2) + (ay - by).powi(2) + dtheta.powi(2)).sqrt()
    }

    fn edge_cost(&self, from: &RobotConfiguration, to: &RobotConfiguration) -> f64 {
        self.planar_metric(from, to)
    }

    fn heuristic(&self, configuration: &RobotConfiguration) -> f64 {
        self.planar_metric(configuration, &self.goal)
    }

    fn stencil(&self, node: &RobotConfiguration) -> Vec<RobotConfiguration> {
        let [x, y] = node.base_position();
        let heading = node.base_heading();
        let (dx, dy) = (self.config.delta_x, self.config.delta_y);
        let mut neighbors = Vec::with_capacity(12);

        match self.config.connectivity {
            Connectivity::Four => {
                for (mx, my) in [(dx, 0.0), (-dx, 0.0), (0.0, dy), (0.0, -dy)] {
                    neighbors.push(node.with_base(x + mx, y + my, heading));
                }
                if let Some(dtheta) = self.config.delta_heading {
                    neighbors.push(node.with_base(x, y, wrap_angle(heading - dtheta)));
                    neighbors.push(node.with_base(x, y, wrap_angle(heading + dtheta)));
                }
            }
            Connectivity::Eight => {
                for (mx, my) in [
                    (dx, 0.0),
                    (-dx, 0.0),
                    (0.0, dy),
                    (0.0, -dy),
                    (dx, dy),
                    (dx, -dy),
                    (-dx, dy),
                    (-dx, -dy),
                ] {
                    neighbors.push(node.with_base(x + mx, y + my, heading));
                }
                if let Some(dtheta) = self.config.delta_heading {
                    let turns = (2.0 * PI / dtheta).round() as usize;
                    for i in 1..turns {
                        neighbors.push(node.with_base(x, y, wrap_angle(heading + i as f64 * dtheta)));
                    }
                }
            }
        }
        neighbors
    }
}
