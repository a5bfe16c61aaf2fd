// planning/shortcut.rs

// Randomized shortcutting: repeatedly pick two non-adjacent waypoints and,
// if the straight segment between them is collision-free, drop everything
// in between. The waypoint count and the path length never grow.

use super::Path;
use crate::collision::CollisionChecker;
use crate::kinematics::RobotConfiguration;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shortcutting parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutConfig {
    /// Number of shortcut attempts
    pub iterations: usize,
    /// Sampling resolution along a candidate segment
    pub resolution: f64,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        ShortcutConfig {
            iterations: 150,
            resolution: 0.05,
            seed: None,
        }
    }
}

impl ShortcutConfig {
    /// RNG for this configuration
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Whether the straight segment `from -> to`, sampled every `resolution`
/// (both endpoints included), is collision-free
pub fn segment_is_free<C: CollisionChecker + ?Sized>(
    from: &RobotConfiguration,
    to: &RobotConfiguration,
    checker: &C,
    resolution: f64,
) -> bool {
    let distance = from.distance(to);
    let steps = if resolution > 0.0 {
        (distance / resolution).ceil().max(1.0) as usize
    } else {
        1
    };
    (0..=steps).all(|i| {
        let t = i as f64 / steps as f64;
        !checker.is_colliding(&from.interpolate(to, t))
    })
}

/// Whether every segment of `path` is free at `resolution`
pub fn path_is_free<C: CollisionChecker + ?Sized>(path: &Path, checker: &C, resolution: f64) -> bool {
    match path.waypoints() {
        [] => true,
        [only] => !checker.is_colliding(only),
        waypoints => waypoints
            .windows(2)
            .all(|w| segment_is_free(&w[0], &w[1], checker, resolution)),
    }
}

/// Shortcut `path` with `iterations` random attempts
pub fn shortcut<C: CollisionChecker + ?Sized>(
    path: Path,
    iterations: usize,
    checker: &C,
    resolution: f64,
    rng: &mut StdRng,
) -> Path {
    let mut waypoints = path.into_waypoints();
    let mut removed = 0;

    for _ in 0..iterations {
        if waypoints.len() < 3 {
            break;
        }
        let i = rng.gen_range(0..waypoints.len() - 2);
        let j = rng.gen_range(i + 2..waypoints.len());
        if segment_is_free(&waypoints[i], &waypoints[j], checker, resolution) {
            removed += j - i - 1;
            waypoints.drain(i + 1..j);
        }
    }

    debug!("Shortcutting removed {} waypoints, {} remain", removed, waypoints.len());
    Path::new(waypoints)
}
