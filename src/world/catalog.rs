// world/catalog.rs

// Built-in worlds used by demos and tests.

use super::{Obstacle, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Three unit spheres around the origin in a 25 x 25 world
pub fn basic() -> World {
    World::new("basic", [25.0, 25.0]).with_obstacles(vec![
        Obstacle::sphere([0.0, -2.0, 0.5], 1.0),
        Obstacle::sphere([2.0, 0.0, 0.5], 1.0),
        Obstacle::sphere([-2.0, 0.0, 0.5], 1.0),
    ])
}

/// One hundred random spheres in a 50 x 50 world, kept clear of the center
pub fn random(seed: u64) -> World {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut obstacles = Vec::with_capacity(100);
    for _ in 0..100 {
        let radius = rng.gen_range(0.0..3.0) + 0.5;
        let mut xy = [0.0; 2];
        for value in &mut xy {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            *value = sign * (rng.gen_range(0.0..1.0) * (24.0 - radius) + radius + 1.0);
        }
        let z = rng.gen_range(0.0..3.0) - 0.6;
        obstacles.push(Obstacle::sphere([xy[0], xy[1], z], radius));
    }
    World::new("random", [50.0, 50.0]).with_obstacles(obstacles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_world_is_reproducible_and_clear_of_center() {
        let a = random(7);
        let b = random(7);
        assert_eq!(a, b);
        for obstacle in &a.obstacles {
            let center = obstacle.center();
            // each coordinate is at least radius + 1 away from the axis
            assert!(center.x.abs() >= obstacle.radius() + 1.0 - 1e-9);
            assert!(center.y.abs() >= obstacle.radius() + 1.0 - 1e-9);
        }
    }
}
