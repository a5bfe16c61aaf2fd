// kinematics/forward.rs

// Forward kinematics: walks the link tree from the base, composing 4x4
// homogeneous transforms parent-then-local (world = world_parent · local).
// Joint values are clamped to their limits before they are composed.

use super::{Joint, JointId, JointType, LinkId, Robot, RobotConfiguration};
use crate::{KineplanError, Result};
use nalgebra::{Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};

/// World transforms of the base, every joint and every link
#[derive(Clone, Debug, PartialEq)]
pub struct Transforms {
    root: Matrix4<f64>,
    joints: Vec<Matrix4<f64>>,
    links: Vec<Matrix4<f64>>,
}

impl Transforms {
    /// Base transform
    pub fn root(&self) -> &Matrix4<f64> {
        &self.root
    }

    /// World transform of a joint
    pub fn joint(&self, id: JointId) -> &Matrix4<f64> {
        &self.joints[id.0]
    }

    /// World transform of a link (equal to its parent joint's transform)
    pub fn link(&self, id: LinkId) -> &Matrix4<f64> {
        &self.links[id.0]
    }

    /// Joint transforms in declaration order
    pub fn joints(&self) -> &[Matrix4<f64>] {
        &self.joints
    }

    /// Link transforms in declaration order
    pub fn links(&self) -> &[Matrix4<f64>] {
        &self.links
    }
}

/// Clamp `theta` into `limits`; fixed joints always hold zero
pub fn apply_joint_limits(joint_type: JointType, limits: Option<(f64, f64)>, theta: f64) -> f64 {
    if joint_type == JointType::Fixed {
        return 0.0;
    }
    match limits {
        Some((lower, upper)) => theta.clamp(lower, upper),
        None => theta,
    }
}

/// Rotation from intrinsic XYZ Euler angles (R = Rx · Ry · Rz)
pub fn rotation_xyz(rpy: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), rpy.x)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), rpy.y)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), rpy.z)
}

/// Root transform: base translation plus the robot's static roll/pitch and
/// the configuration's heading
pub fn base_transform(robot: &Robot, configuration: &RobotConfiguration) -> Matrix4<f64> {
    let [x, y] = configuration.base_position();
    let rpy = Vector3::new(robot.rpy().x, robot.rpy().y, configuration.base_heading());
    let mut transform = rotation_xyz(&rpy).to_homogeneous();
    transform[(0, 3)] = x;
    transform[(1, 3)] = y;
    transform[(2, 3)] = robot.xyz().z;
    transform
}

/// Local transform of a joint at value `theta`: static offset, then the
/// motion about (revolute/continuous) or along (prismatic) the axis
pub fn joint_local_transform(joint: &Joint, theta: f64) -> Matrix4<f64> {
    let mut local = rotation_xyz(joint.origin_rpy()).to_homogeneous();
    let xyz = joint.origin_xyz();
    local[(0, 3)] = xyz.x;
    local[(1, 3)] = xyz.y;
    local[(2, 3)] = xyz.z;

    let motion = match joint.joint_type() {
        JointType::Continuous | JointType::Revolute => {
            UnitQuaternion::from_axis_angle(joint.axis(), theta).to_homogeneous()
        }
        JointType::Prismatic => Translation3::from(joint.axis().into_inner() * theta).to_homogeneous(),
        JointType::Fixed => Matrix4::identity(),
    };
    local * motion
}

/// Compute world transforms for `configuration` without touching the robot
pub fn compute_transforms(robot: &Robot, configuration: &RobotConfiguration) -> Result<Transforms> {
    if configuration.len() != robot.dof() {
        return Err(KineplanError::InvalidConfiguration {
            expected: robot.dof(),
            actual: configuration.len(),
        });
    }
    let root = base_transform(robot, configuration);
    Ok(traverse(robot, root, configuration.joint_values()))
}

pub(crate) fn traverse(robot: &Robot, root: Matrix4<f64>, thetas: &[f64]) -> Transforms {
    let mut transforms = Transforms {
        root,
        joints: vec![Matrix4::identity(); robot.joint_count()],
        links: vec![Matrix4::identity(); robot.links().len()],
    };
    transforms.links[robot.base().0] = root;
    traverse_link(robot, robot.base(), &root, thetas, &mut transforms);
    transforms
}

fn traverse_link(robot: &Robot, link: LinkId, mstack: &Matrix4<f64>, thetas: &[f64], out: &mut Transforms) {
    for &joint in robot.link(link).children() {
        traverse_joint(robot, joint, mstack, thetas, out);
    }
}

fn traverse_joint(robot: &Robot, id: JointId, mstack: &Matrix4<f64>, thetas: &[f64], out: &mut Transforms) {
    let joint = robot.joint(id);
    let theta = apply_joint_limits(joint.joint_type(), joint.limits(), thetas[id.0]);
    let world = mstack * joint_local_transform(joint, theta);
    out.joints[id.0] = world;
    out.links[joint.child().0] = world;
    traverse_link(robot, joint.child(), &world, thetas, out);
}
