// planning/rrt.rs

// RRT-Connect over the full configuration vector. Tree A is rooted at the
// start and tree B at the goal; each step grows one tree toward a random
// sample and then greedily connects the other tree to the new node. The
// trees swap roles every step through an index flag, never by moving data.
//
// Nearest neighbors use the plain Euclidean distance over the whole vector.
// Angles are not wrapped there, matching how the step toward a sample is
// taken (straight-line interpolation in vector space).

// Dependencies
// - CollisionChecker: validates every inserted node
// - StdRng: explicit, optionally seeded sampling source
use super::shortcut::segment_is_free;
use super::{Path, PlanOutcome, require_positive};
use crate::collision::CollisionChecker;
use crate::kinematics::RobotConfiguration;
use crate::world::Bounds;
use crate::{KineplanError, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// RRT-Connect parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrtConfig {
    /// Maximum distance covered by one extension
    pub step_size: f64,
    /// Step budget before giving up
    pub max_iterations: usize,
    /// Probability of sampling the other tree's root; in [0, 1]
    pub goal_bias: f64,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Also check the edge to a new node at this resolution
    pub edge_resolution: Option<f64>,
    /// Sample the base heading; when false it stays at the start heading
    pub sample_heading: bool,
}

impl Default for RrtConfig {
    fn default() -> Self {
        RrtConfig {
            step_size: 0.5,
            max_iterations: 10_000,
            goal_bias: 0.05,
            seed: None,
            edge_resolution: None,
            sample_heading: true,
        }
    }
}

impl RrtConfig {
    /// Check the extension length, goal bias and edge resolution
    pub fn validate(&self) -> Result<()> {
        require_positive("step_size", self.step_size)?;
        if !(0.0..=1.0).contains(&self.goal_bias) {
            return Err(KineplanError::InvalidParameter(format!(
                "goal_bias must lie in [0, 1], got {}",
                self.goal_bias
            )));
        }
        if let Some(resolution) = self.edge_resolution {
            require_positive("edge_resolution", resolution)?;
        }
        Ok(())
    }
}

/// Planner and extension status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RrtStatus {
    /// Constructed, no step taken yet
    Waiting,
    /// Running under [`RrtConnect::plan`]
    Iterating,
    /// Trees connected (or an extension reached its target)
    Reached,
    /// New node would collide
    Trapped,
    /// Tree grew by one step
    Advanced,
    /// Iteration budget spent
    Exhausted,
    /// Stopped through [`RrtConnect::cancel`]
    Cancelled,
}

/// Tree selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeId {
    /// Rooted at the start configuration
    A,
    /// Rooted at the goal configuration
    B,
}

impl TreeId {
    fn index(self) -> usize {
        match self {
            TreeId::A => 0,
            TreeId::B => 1,
        }
    }

    fn from_index(index: usize) -> Self {
        if index == 0 { TreeId::A } else { TreeId::B }
    }
}

impl FromStr for TreeId {
    type Err = KineplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(TreeId::A),
            "B" => Ok(TreeId::B),
            other => Err(KineplanError::InvalidTree(other.to_string())),
        }
    }
}

/// A tree vertex: configuration plus parent index
#[derive(Clone, Debug, PartialEq)]
pub struct RrtNode {
    /// Configuration snapshot
    pub configuration: RobotConfiguration,
    /// Parent index in the same tree; `None` for the root
    pub parent: Option<usize>,
}

/// One search tree
#[derive(Clone, Debug, PartialEq)]
pub struct RrtTree {
    nodes: Vec<RrtNode>,
}

impl RrtTree {
    /// Tree holding only `root`
    pub fn new(root: RobotConfiguration) -> Self {
        RrtTree {
            nodes: vec![RrtNode {
                configuration: root,
                parent: None,
            }],
        }
    }

    /// Root configuration
    pub fn root(&self) -> &RobotConfiguration {
        &self.nodes[0].configuration
    }

    /// All nodes, root first
    pub fn nodes(&self) -> &[RrtNode] {
        &self.nodes
    }

    /// Node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true; a tree always has its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the node closest to `target`
    pub fn nearest(&self, target: &RobotConfiguration) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.configuration
                    .distance(target)
                    .total_cmp(&b.configuration.distance(target))
            })
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// Append a node and return its index
    pub fn add(&mut self, configuration: RobotConfiguration, parent: Option<usize>) -> usize {
        self.nodes.push(RrtNode { configuration, parent });
        self.nodes.len() - 1
    }

    /// Configurations from `index` back to the root
    pub fn branch_to_root(&self, index: usize) -> Vec<RobotConfiguration> {
        let mut branch = Vec::new();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            branch.push(self.nodes[i].configuration.clone());
            cursor = self.nodes[i].parent;
        }
        branch
    }
}

/// Resumable RRT-Connect planner
pub struct RrtConnect<'a, C: CollisionChecker + ?Sized> {
    checker: &'a C,
    bounds: Bounds,
    config: RrtConfig,
    trees: [RrtTree; 2],
    active: usize,
    iterations: usize,
    status: RrtStatus,
    path: Option<Path>,
    rng: StdRng,
}

impl<'a, C: CollisionChecker + ?Sized> RrtConnect<'a, C> {
    /// Set up both trees; base samples are drawn inside `bounds`
    ///
    /// A colliding start or goal leaves the planner `Exhausted`.
    pub fn new(
        checker: &'a C,
        bounds: Bounds,
        start: RobotConfiguration,
        goal: RobotConfiguration,
        config: RrtConfig,
    ) -> Result<Self> {
        config.validate()?;
        if start.len() != goal.len() {
            return Err(KineplanError::InvalidConfiguration {
                expected: start.len(),
                actual: goal.len(),
            });
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut planner = RrtConnect {
            checker,
            bounds,
            config,
            trees: [RrtTree::new(start), RrtTree::new(goal)],
            active: 0,
            iterations: 0,
            status: RrtStatus::Waiting,
            path: None,
            rng,
        };

        if checker.is_colliding(planner.trees[0].root()) || checker.is_colliding(planner.trees[1].root()) {
            warn!("RRT start or goal configuration is in collision");
            planner.status = RrtStatus::Exhausted;
        } else if planner.trees[0].root() == planner.trees[1].root() {
            planner.path = Some(Path::new(vec![planner.trees[0].root().clone()]));
            planner.status = RrtStatus::Reached;
        }
        Ok(planner)
    }

    /// Current status
    pub fn status(&self) -> RrtStatus {
        self.status
    }

    /// Steps taken so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Planner parameters
    pub fn config(&self) -> &RrtConfig {
        &self.config
    }

    /// A tree by id
    pub fn tree(&self, id: TreeId) -> &RrtTree {
        &self.trees[id.index()]
    }

    /// Tree that the next step grows toward a random sample
    pub fn active_tree(&self) -> TreeId {
        TreeId::from_index(self.active)
    }

    /// Start-to-goal path once `Reached`
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Insert `configuration` into a tree, attached to its nearest node
    ///
    /// Returns `None` and leaves the tree untouched when the configuration
    /// collides.
    pub fn add_vertex(&mut self, configuration: RobotConfiguration, tree: TreeId) -> Option<usize> {
        if configuration.len() != self.trees[0].root().len() || self.checker.is_colliding(&configuration) {
            debug!("Rejected vertex for tree {:?}", tree);
            return None;
        }
        let tree = &mut self.trees[tree.index()];
        let parent = tree.nearest(&configuration);
        Some(tree.add(configuration, Some(parent)))
    }

    /// Stop planning; later steps are no-ops
    pub fn cancel(&mut self) {
        if !Self::is_finished(self.status) {
            info!("RRT-Connect cancelled after {} iterations", self.iterations);
            self.status = RrtStatus::Cancelled;
        }
    }

    fn is_finished(status: RrtStatus) -> bool {
        matches!(status, RrtStatus::Reached | RrtStatus::Exhausted | RrtStatus::Cancelled)
    }

    /// Final outcome, or `None` while the planner can still step
    pub fn outcome(&self) -> Option<PlanOutcome> {
        match self.status {
            RrtStatus::Reached => self.path.clone().map(|path| {
                if path.len() == 1 {
                    PlanOutcome::AlreadyAtGoal(path)
                } else {
                    PlanOutcome::Found(path)
                }
            }),
            RrtStatus::Exhausted => Some(PlanOutcome::NoPath),
            RrtStatus::Cancelled => Some(PlanOutcome::Cancelled),
            _ => None,
        }
    }

    /// Step until the trees connect or the budget runs out
    pub fn plan(&mut self) -> PlanOutcome {
        info!(
            "RRT-Connect started (step {}, budget {}, goal bias {})",
            self.config.step_size, self.config.max_iterations, self.config.goal_bias
        );
        if self.status == RrtStatus::Waiting {
            self.status = RrtStatus::Iterating;
        }
        while !Self::is_finished(self.step()) {}
        self.outcome().unwrap_or(PlanOutcome::NoPath)
    }

    /// One RRT-Connect iteration
    pub fn step(&mut self) -> RrtStatus {
        if Self::is_finished(self.status) {
            return self.status;
        }
        if self.iterations >= self.config.max_iterations {
            info!(
                "RRT-Connect exhausted {} iterations ({} + {} nodes)",
                self.iterations,
                self.trees[0].len(),
                self.trees[1].len()
            );
            self.status = RrtStatus::Exhausted;
            return self.status;
        }

        let grow = self.active;
        let other = 1 - grow;
        let sample = self.sample(other);

        let (extended, new_index) = extend(&mut self.trees[grow], &sample, self.checker, &self.config);
        self.status = match new_index {
            Some(grown_index) if extended != RrtStatus::Trapped => {
                let target = self.trees[grow].nodes[grown_index].configuration.clone();
                match connect(&mut self.trees[other], &target, self.checker, &self.config) {
                    (RrtStatus::Reached, Some(other_index)) => {
                        let (start_index, goal_index) = if grow == 0 {
                            (grown_index, other_index)
                        } else {
                            (other_index, grown_index)
                        };
                        self.build_path(start_index, goal_index);
                        RrtStatus::Reached
                    }
                    _ => RrtStatus::Advanced,
                }
            }
            _ => RrtStatus::Trapped,
        };

        debug!(
            "RRT step {}: grew tree {:?} -> {:?}",
            self.iterations,
            TreeId::from_index(grow),
            self.status
        );
        self.active = other;
        self.iterations += 1;
        self.status
    }

    fn sample(&mut self, other: usize) -> RobotConfiguration {
        if self.rng.gen_bool(self.config.goal_bias) {
            return self.trees[other].root().clone();
        }

        let start = self.trees[0].root();
        let heading = start.base_heading();
        let mut sample = start.clone();
        let values = sample.as_mut_slice();
        values[0] = self.rng.gen_range(self.bounds.x[0]..=self.bounds.x[1]);
        values[1] = self.rng.gen_range(self.bounds.y[0]..=self.bounds.y[1]);
        values[2] = if self.config.sample_heading {
            self.rng.gen_range(-PI..=PI)
        } else {
            heading
        };
        for value in &mut values[3..] {
            *value = self.rng.gen_range(-PI..=PI);
        }
        sample
    }

    fn build_path(&mut self, start_index: usize, goal_index: usize) {
        let mut waypoints = self.trees[0].branch_to_root(start_index);
        waypoints.reverse();
        // the meeting configuration ends the start branch
        waypoints.extend(self.trees[1].branch_to_root(goal_index).into_iter().skip(1));
        info!(
            "RRT-Connect reached the goal after {} iterations: {} waypoints",
            self.iterations + 1,
            waypoints.len()
        );
        self.path = Some(Path::new(waypoints));
    }
}

fn edge_collides<C: CollisionChecker + ?Sized>(
    from: &RobotConfiguration,
    to: &RobotConfiguration,
    checker: &C,
    config: &RrtConfig,
) -> bool {
    if checker.is_colliding(to) {
        return true;
    }
    match config.edge_resolution {
        Some(resolution) => !segment_is_free(from, to, checker, resolution),
        None => false,
    }
}

/// Grow `tree` one step toward `target`
fn extend<C: CollisionChecker + ?Sized>(
    tree: &mut RrtTree,
    target: &RobotConfiguration,
    checker: &C,
    config: &RrtConfig,
) -> (RrtStatus, Option<usize>) {
    let nearest = tree.nearest(target);
    let from = &tree.nodes[nearest].configuration;
    let distance = from.distance(target);
    if distance == 0.0 {
        return (RrtStatus::Reached, Some(nearest));
    }

    let next = from.step_toward(target, config.step_size);
    if edge_collides(from, &next, checker, config) {
        return (RrtStatus::Trapped, None);
    }
    let index = tree.add(next, Some(nearest));
    if distance <= config.step_size {
        (RrtStatus::Reached, Some(index))
    } else {
        (RrtStatus::Advanced, Some(index))
    }
}

/// Extend `tree` toward `target` until it stops advancing
fn connect<C: CollisionChecker + ?Sized>(
    tree: &mut RrtTree,
    target: &RobotConfiguration,
    checker: &C,
    config: &RrtConfig,
) -> (RrtStatus, Option<usize>) {
    loop {
        let result = extend(tree, target, checker, config);
        if result.0 != RrtStatus::Advanced {
            return result;
        }
    }
}
