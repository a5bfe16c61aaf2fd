//! Collision checking for Kineplan
//!
//! Decides whether a robot configuration is valid: the base must lie inside
//! the world bounds and no link may touch an obstacle. Self collision is not
//! checked. Planners only see the [`CollisionChecker`] trait.

use crate::kinematics::{
    JointId, LinkGeometry, LinkId, Robot, RobotConfiguration, apply_joint_limits, compute_transforms, forward,
};
use crate::world::{Obstacle, World};
use crate::{KineplanError, Result};
use log::{trace, warn};
use nalgebra::Matrix4;

/// Boolean collision predicate over configurations
#[cfg_attr(test, mockall::automock)]
pub trait CollisionChecker {
    /// Whether `configuration` is invalid (in collision or out of bounds)
    fn is_colliding(&self, configuration: &RobotConfiguration) -> bool;
}

impl<F> CollisionChecker for F
where
    F: Fn(&RobotConfiguration) -> bool,
{
    fn is_colliding(&self, configuration: &RobotConfiguration) -> bool {
        self(configuration)
    }
}

/// Collision oracle for a robot in a world
#[derive(Clone, Copy, Debug)]
pub struct RobotCollisionChecker<'a> {
    robot: &'a Robot,
    world: &'a World,
}

impl<'a> RobotCollisionChecker<'a> {
    /// Bind a robot and a world
    pub fn new(robot: &'a Robot, world: &'a World) -> Self {
        RobotCollisionChecker { robot, world }
    }

    /// The robot being checked
    pub fn robot(&self) -> &'a Robot {
        self.robot
    }

    /// The world being checked against
    pub fn world(&self) -> &'a World {
        self.world
    }
}

impl CollisionChecker for RobotCollisionChecker<'_> {
    fn is_colliding(&self, configuration: &RobotConfiguration) -> bool {
        match is_colliding(self.robot, configuration, self.world) {
            Ok(colliding) => colliding,
            Err(e) => {
                // a malformed configuration is never a valid state
                warn!("Treating configuration as colliding: {}", e);
                true
            }
        }
    }
}

/// Whether `robot` placed at `configuration` collides with `world`
///
/// The robot's live state is not modified.
pub fn is_colliding(robot: &Robot, configuration: &RobotConfiguration, world: &World) -> Result<bool> {
    if configuration.len() != robot.dof() {
        return Err(KineplanError::InvalidConfiguration {
            expected: robot.dof(),
            actual: configuration.len(),
        });
    }

    let [x, y] = configuration.base_position();
    if !world.bounds.contains(x, y) {
        trace!("Base ({:.3}, {:.3}) outside world '{}'", x, y, world.name);
        return Ok(true);
    }

    let root = forward::base_transform(robot, configuration);
    Ok(link_subtree_collides(
        robot,
        robot.base(),
        &root,
        configuration.joint_values(),
        world,
    ))
}

/// Whether the robot's live state collides with `world`
pub fn is_robot_colliding(robot: &Robot, world: &World) -> bool {
    let configuration = RobotConfiguration::from_robot(robot);
    // from_robot always has the right length
    is_colliding(robot, &configuration, world).unwrap_or(true)
}

/// Every link touching an obstacle at `configuration`
///
/// Unlike [`is_colliding`] this does not short-circuit, so rendering
/// collaborators can highlight all offending links. A base outside the
/// world bounds reports the base link.
pub fn colliding_links(robot: &Robot, configuration: &RobotConfiguration, world: &World) -> Result<Vec<LinkId>> {
    let transforms = compute_transforms(robot, configuration)?;
    let [x, y] = configuration.base_position();
    if !world.bounds.contains(x, y) {
        return Ok(vec![robot.base()]);
    }
    Ok((0..robot.links().len())
        .map(LinkId)
        .filter(|&id| link_collides(robot.link(id).geometry(), transforms.link(id), &world.obstacles))
        .collect())
}

/// Whether a link with `geometry` posed at `link_transform` touches any obstacle
pub fn link_collides(geometry: &LinkGeometry, link_transform: &Matrix4<f64>, obstacles: &[Obstacle]) -> bool {
    let Some(inverse) = link_transform.try_inverse() else {
        warn!("Singular link transform, treating link as colliding");
        return true;
    };
    obstacles.iter().any(|obstacle| {
        let center_local = inverse.transform_point(&obstacle.center());
        geometry.touches_sphere(&center_local, obstacle.radius())
    })
}

fn link_subtree_collides(
    robot: &Robot,
    link: LinkId,
    mstack: &Matrix4<f64>,
    thetas: &[f64],
    world: &World,
) -> bool {
    let current = robot.link(link);
    if link_collides(current.geometry(), mstack, &world.obstacles) {
        trace!("Link '{}' in collision", current.name());
        return true;
    }
    current
        .children()
        .iter()
        .any(|&joint| joint_subtree_collides(robot, joint, mstack, thetas, world))
}

fn joint_subtree_collides(
    robot: &Robot,
    id: JointId,
    mstack: &Matrix4<f64>,
    thetas: &[f64],
    world: &World,
) -> bool {
    let joint = robot.joint(id);
    let theta = apply_joint_limits(joint.joint_type(), joint.limits(), thetas[id.0]);
    let transform = mstack * forward::joint_local_transform(joint, theta);
    link_subtree_collides(robot, joint.child(), &transform, thetas, world)
}
