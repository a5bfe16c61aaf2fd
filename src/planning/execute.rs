// planning/execute.rs

// Execution helpers that act on the robot's live state: drive the base,
// nudge a selected joint, walk the joint selection through the kinematic
// tree, and replay a planned path a little at a time.

use super::Path;
use crate::Result;
use crate::kinematics::{JointId, JointType, Robot, RobotConfiguration};
use log::debug;
use nalgebra::Vector3;

/// Translate the base by `speed` along `direction` = (forward, lateral),
/// relative to where the robot faces
pub fn move_robot(robot: &mut Robot, direction: [f64; 2], speed: f64) {
    let facing = robot.facing();
    let lateral = Vector3::z().cross(&facing);
    let delta = facing * (direction[0] * speed) + lateral * (direction[1] * speed);
    robot.translate_base(&delta);
}

/// Turn the base; positive `direction` is clockwise
pub fn turn_robot(robot: &mut Robot, direction: f64, speed: f64) {
    let [x, y] = robot.base_position();
    let heading = robot.base_heading() - direction * speed;
    robot.set_base_pose(x, y, heading);
}

/// Move a joint by `direction * speed`; fixed joints ignore the command and
/// limited joints stay within their limits
pub fn apply_control(robot: &mut Robot, joint: JointId, direction: f64, speed: f64) {
    if robot.joint(joint).joint_type() == JointType::Fixed {
        return;
    }
    let theta = robot.joint_theta(joint) + direction * speed;
    robot.set_joint_theta(joint, theta);
}

/// Selected joint for manual control, moved through the kinematic tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JointCursor {
    selected: JointId,
}

impl JointCursor {
    /// First joint of the base link, if the robot has any joints
    pub fn new(robot: &Robot) -> Option<Self> {
        robot
            .link(robot.base())
            .children()
            .first()
            .map(|&selected| JointCursor { selected })
    }

    /// Currently selected joint
    pub fn selected(&self) -> JointId {
        self.selected
    }

    /// Select the first joint of the child link
    pub fn up(&mut self, robot: &Robot) {
        let child = robot.joint(self.selected).child();
        if let Some(&next) = robot.link(child).children().first() {
            self.selected = next;
        }
    }

    /// Select the joint above the parent link
    pub fn down(&mut self, robot: &Robot) {
        let parent = robot.joint(self.selected).parent();
        if let Some(previous) = robot.link(parent).parent() {
            self.selected = previous;
        }
    }

    /// Select the next sibling joint, wrapping around
    pub fn adjacent(&mut self, robot: &Robot) {
        let siblings = robot.link(robot.joint(self.selected).parent()).children();
        if siblings.len() <= 1 {
            return;
        }
        if let Some(position) = siblings.iter().position(|&j| j == self.selected) {
            self.selected = siblings[(position + 1) % siblings.len()];
        }
    }
}

/// Moves the live robot along a path, one call per tick
#[derive(Clone, Debug, PartialEq)]
pub struct PathFollower {
    target: usize,
    speed: f64,
}

impl PathFollower {
    /// Follower heading for the second waypoint at `speed` per tick
    pub fn new(speed: f64) -> Self {
        PathFollower { target: 1, speed }
    }

    /// Index of the waypoint being approached
    pub fn target(&self) -> usize {
        self.target
    }

    /// Advance one tick and return the next target index
    ///
    /// Paths of two or fewer waypoints are not replayed and return 0. After
    /// the goal the robot is put back at the start.
    pub fn step(&mut self, robot: &mut Robot, path: &Path) -> Result<usize> {
        let waypoints = path.waypoints();
        if waypoints.len() <= 2 {
            self.target = 0;
            return Ok(0);
        }

        if self.target == 0 || self.target >= waypoints.len() {
            waypoints[0].apply_to(robot)?;
            self.target = 1;
            debug!("Path replay restarted from the start");
            return Ok(self.target);
        }

        let current = RobotConfiguration::from_robot(robot);
        let goal = &waypoints[self.target];
        if current.distance(goal) > self.speed {
            current.step_toward(goal, self.speed).apply_to(robot)?;
        } else {
            goal.apply_to(robot)?;
            self.target += 1;
        }
        Ok(self.target)
    }
}
