// world/mod.rs

// Static environment for collision queries: axis-aligned world bounds and a
// list of sphere or box obstacles. Worlds are read-only while a planner runs.

pub mod catalog;

pub use catalog::{basic, random};

use crate::Result;
use log::info;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Axis-aligned (x, y) bounds of the world
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// `[min, max]` along x
    pub x: [f64; 2],
    /// `[min, max]` along y
    pub y: [f64; 2],
}

impl Bounds {
    /// Bounds of a `size_x` by `size_y` world centered at the origin
    pub fn centered(size_x: f64, size_y: f64) -> Self {
        Bounds {
            x: [-size_x / 2.0, size_x / 2.0],
            y: [-size_y / 2.0, size_y / 2.0],
        }
    }

    /// Whether (x, y) lies inside the bounds (edges included)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x[0] && x <= self.x[1] && y >= self.y[0] && y <= self.y[1]
    }

    /// Extent along x
    pub fn width(&self) -> f64 {
        self.x[1] - self.x[0]
    }

    /// Extent along y
    pub fn height(&self) -> f64 {
        self.y[1] - self.y[0]
    }
}

/// A static obstacle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Obstacle {
    /// Sphere
    Sphere {
        /// Center in world coordinates
        center: [f64; 3],
        /// Radius
        radius: f64,
    },
    /// Axis-aligned box
    Box {
        /// Center in world coordinates
        center: [f64; 3],
        /// Half side lengths
        half_extents: [f64; 3],
    },
}

impl Obstacle {
    /// Sphere obstacle
    pub fn sphere(center: [f64; 3], radius: f64) -> Self {
        Obstacle::Sphere { center, radius }
    }

    /// Box obstacle
    pub fn cuboid(center: [f64; 3], half_extents: [f64; 3]) -> Self {
        Obstacle::Box { center, half_extents }
    }

    /// Center in world coordinates
    pub fn center(&self) -> Point3<f64> {
        match self {
            Obstacle::Sphere { center, .. } | Obstacle::Box { center, .. } => Point3::from(*center),
        }
    }

    /// Collision radius: the sphere radius, or the half diagonal of a box
    pub fn radius(&self) -> f64 {
        match self {
            Obstacle::Sphere { radius, .. } => *radius,
            Obstacle::Box { half_extents, .. } => half_extents.iter().map(|h| h * h).sum::<f64>().sqrt(),
        }
    }
}

/// World holding the bounds and obstacles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// World name
    pub name: String,
    /// (x, y) bounds
    pub bounds: Bounds,
    /// Static obstacles
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl World {
    /// Empty world of `size` centered at the origin
    pub fn new(name: impl Into<String>, size: [f64; 2]) -> Self {
        World {
            name: name.into(),
            bounds: Bounds::centered(size[0], size[1]),
            obstacles: Vec::new(),
        }
    }

    /// Replace the obstacle list
    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Add one obstacle
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// Load a world from a YAML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let world: World = serde_yaml::from_reader(file)?;
        info!(
            "Loaded world '{}' with {} obstacles from {}",
            world.name,
            world.obstacles.len(),
            path.as_ref().display()
        );
        Ok(world)
    }
}
