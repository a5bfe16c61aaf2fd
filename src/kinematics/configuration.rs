// kinematics/configuration.rs

// Flat configuration vectors: [base_x, base_y, base_heading, θ_1 … θ_n] with
// joints in declaration order. Each configuration carries a mask of its
// angular fields so closeness checks can wrap angles without a robot at hand.

use super::{JointId, Robot};
use crate::{KineplanError, Result};
use std::f64::consts::PI;
use std::sync::Arc;

/// Wrap an angle into (-π, π]
pub fn wrap_angle(theta: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let wrapped = (theta + PI).rem_euclid(two_pi) - PI;
    if wrapped <= -PI { wrapped + two_pi } else { wrapped }
}

/// Signed minimal-magnitude difference `a - b` between two angles
pub fn angle_difference(a: f64, b: f64) -> f64 {
    wrap_angle(a - b)
}

/// A point in the robot's configuration space
#[derive(Clone, Debug, PartialEq)]
pub struct RobotConfiguration {
    values: Vec<f64>,
    angular: Arc<[bool]>,
}

impl RobotConfiguration {
    /// Read the robot's live base pose and joint values
    pub fn from_robot(robot: &Robot) -> Self {
        let [x, y] = robot.base_position();
        let mut values = Vec::with_capacity(robot.dof());
        values.extend([x, y, robot.base_heading()]);
        values.extend(robot.joints().iter().map(|joint| joint.theta()));
        RobotConfiguration {
            values,
            angular: Self::angular_mask(robot),
        }
    }

    /// Build a configuration for `robot` from a raw vector
    pub fn from_vec(robot: &Robot, values: Vec<f64>) -> Result<Self> {
        if values.len() != robot.dof() {
            return Err(KineplanError::InvalidConfiguration {
                expected: robot.dof(),
                actual: values.len(),
            });
        }
        Ok(RobotConfiguration {
            values,
            angular: Self::angular_mask(robot),
        })
    }

    /// Base-only configuration (x, y, heading)
    pub fn planar(x: f64, y: f64, heading: f64) -> Self {
        RobotConfiguration {
            values: vec![x, y, heading],
            angular: Arc::from([false, false, true]),
        }
    }

    /// New configuration of the same shape with different values
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(KineplanError::InvalidConfiguration {
                expected: self.values.len(),
                actual: values.len(),
            });
        }
        Ok(RobotConfiguration {
            values,
            angular: Arc::clone(&self.angular),
        })
    }

    /// Same joint values with the base moved to (x, y, heading)
    pub fn with_base(&self, x: f64, y: f64, heading: f64) -> Self {
        let mut values = self.values.clone();
        values[..3].copy_from_slice(&[x, y, heading]);
        RobotConfiguration {
            values,
            angular: Arc::clone(&self.angular),
        }
    }

    fn angular_mask(robot: &Robot) -> Arc<[bool]> {
        [false, false, true]
            .into_iter()
            .chain(robot.joints().iter().map(|joint| joint.joint_type().is_angular()))
            .collect()
    }

    /// Vector length (3 + joint count)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a well-formed configuration
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Mutable raw values; the length is fixed
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Raw values, owned
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// Whether field `index` is an angle
    pub fn is_angular(&self, index: usize) -> bool {
        self.angular.get(index).copied().unwrap_or(false)
    }

    /// Base (x, y)
    pub fn base_position(&self) -> [f64; 2] {
        [self.values[0], self.values[1]]
    }

    /// Base heading
    pub fn base_heading(&self) -> f64 {
        self.values[2]
    }

    /// Joint values in declaration order
    pub fn joint_values(&self) -> &[f64] {
        &self.values[3..]
    }

    /// Write this configuration into the robot's live state
    pub fn apply_to(&self, robot: &mut Robot) -> Result<()> {
        if self.values.len() != robot.dof() {
            return Err(KineplanError::InvalidConfiguration {
                expected: robot.dof(),
                actual: self.values.len(),
            });
        }
        robot.set_base_pose(self.values[0], self.values[1], self.values[2]);
        for (index, theta) in self.joint_values().iter().enumerate() {
            robot.set_joint_theta(JointId(index), *theta);
        }
        Ok(())
    }

    /// Plain Euclidean distance over the full vector (no angle wrapping)
    pub fn distance(&self, other: &RobotConfiguration) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Per-field difference `self - other`, angular fields wrapped
    pub fn wrapped_difference(&self, other: &RobotConfiguration) -> Vec<f64> {
        self.values
            .iter()
            .zip(&other.values)
            .enumerate()
            .map(|(index, (a, b))| {
                if self.is_angular(index) { angle_difference(*a, *b) } else { a - b }
            })
            .collect()
    }

    /// Euclidean distance with angular fields taken along the shorter arc
    pub fn wrapped_distance(&self, other: &RobotConfiguration) -> f64 {
        self.wrapped_difference(other)
            .iter()
            .map(|d| d * d)
            .sum::<f64>()
            .sqrt()
    }

    /// Per-field closeness within `tolerance`, angular fields wrapped
    pub fn is_close(&self, other: &RobotConfiguration, tolerance: f64) -> bool {
        self.values.len() == other.values.len()
            && self
                .wrapped_difference(other)
                .iter()
                .all(|d| d.abs() <= tolerance)
    }

    /// Straight-line interpolation in vector space, `t` in [0, 1]
    pub fn interpolate(&self, other: &RobotConfiguration, t: f64) -> RobotConfiguration {
        RobotConfiguration {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a + (b - a) * t)
                .collect(),
            angular: Arc::clone(&self.angular),
        }
    }

    /// Move at most `step` toward `target`; returns `target` itself when it
    /// is within reach
    pub fn step_toward(&self, target: &RobotConfiguration, step: f64) -> RobotConfiguration {
        let distance = self.distance(target);
        if distance <= step {
            target.clone()
        } else {
            self.interpolate(target, step / distance)
        }
    }
}
