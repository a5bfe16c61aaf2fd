//! Kinematic model for Kineplan
//!
//! A [`Robot`] owns flat arenas of [`Link`]s and [`Joint`]s. Parent and
//! child relations are stored as [`LinkId`] / [`JointId`] handles, so the
//! linkage is a tree without ownership cycles. Robots are assembled through
//! [`RobotBuilder`] or deserialized from a [`RobotDescription`] and are
//! validated once, at construction time.

pub mod configuration;
pub mod forward;

pub use configuration::{RobotConfiguration, angle_difference, wrap_angle};
pub use forward::{Transforms, apply_joint_limits, compute_transforms, rotation_xyz};

use crate::{KineplanError, Result};
use log::{debug, info};
use nalgebra::{Matrix4, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Handle of a link inside its robot's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

/// Handle of a joint inside its robot's arena (declaration order)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub usize);

/// Joint motion type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    /// Rotates around the axis, no limits
    #[default]
    Continuous,
    /// Rotates around the axis, limited
    Revolute,
    /// Slides along the axis, limited
    Prismatic,
    /// No motion
    Fixed,
}

impl JointType {
    /// Whether θ is an angle (and therefore wraps around)
    pub fn is_angular(self) -> bool {
        matches!(self, JointType::Continuous | JointType::Revolute)
    }

    /// Whether the joint type must declare `[min, max]` limits
    pub fn requires_limits(self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }
}

/// Collision bounds of a link, expressed in the link frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum LinkGeometry {
    /// Axis-aligned box
    Box {
        /// Lower corner
        min: [f64; 3],
        /// Upper corner
        max: [f64; 3],
    },
    /// Sphere
    Sphere {
        /// Sphere center
        center: [f64; 3],
        /// Sphere radius
        radius: f64,
    },
}

impl LinkGeometry {
    /// Box with side lengths `shape`, centered at `offset`
    pub fn cuboid(shape: [f64; 3], offset: [f64; 3]) -> Self {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for axis in 0..3 {
            min[axis] = offset[axis] - shape[axis] / 2.0;
            max[axis] = offset[axis] + shape[axis] / 2.0;
        }
        LinkGeometry::Box { min, max }
    }

    /// Sphere of `radius` centered at `center`
    pub fn sphere(center: [f64; 3], radius: f64) -> Self {
        LinkGeometry::Sphere { center, radius }
    }

    /// Point of the bounds closest to `point` (both in the link frame)
    pub fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        match self {
            LinkGeometry::Box { min, max } => Point3::new(
                point.x.clamp(min[0], max[0]),
                point.y.clamp(min[1], max[1]),
                point.z.clamp(min[2], max[2]),
            ),
            LinkGeometry::Sphere { center, radius } => {
                let center = Point3::from(*center);
                let offset = point - center;
                let distance = offset.norm();
                if distance <= *radius {
                    *point
                } else {
                    center + offset * (*radius / distance)
                }
            }
        }
    }

    /// Whether a sphere centered at `center` (link frame) touches the bounds
    pub fn touches_sphere(&self, center: &Point3<f64>, radius: f64) -> bool {
        let closest = self.closest_point(center);
        (closest - center).norm() <= radius
    }

    fn validate(&self, link: &str) -> Result<()> {
        match self {
            LinkGeometry::Box { min, max } => {
                if min.iter().zip(max).any(|(lo, hi)| !(lo <= hi)) {
                    return Err(KineplanError::InvalidRobot(format!(
                        "link '{}' has a box with min > max",
                        link
                    )));
                }
            }
            LinkGeometry::Sphere { radius, .. } => {
                if !(*radius >= 0.0) || !radius.is_finite() {
                    return Err(KineplanError::InvalidRobot(format!(
                        "link '{}' has an invalid sphere radius {}",
                        link, radius
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A rigid link of the robot
#[derive(Clone, Debug)]
pub struct Link {
    name: String,
    parent: Option<JointId>,
    children: Vec<JointId>,
    geometry: LinkGeometry,
    transform: Matrix4<f64>,
}

impl Link {
    /// Link name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent joint (None for the base link)
    pub fn parent(&self) -> Option<JointId> {
        self.parent
    }

    /// Child joints in declaration order
    pub fn children(&self) -> &[JointId] {
        &self.children
    }

    /// Local collision bounds
    pub fn geometry(&self) -> &LinkGeometry {
        &self.geometry
    }

    /// World pose computed by the last [`Robot::update_transforms`]
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }
}

/// A joint connecting a parent link to a child link
#[derive(Clone, Debug)]
pub struct Joint {
    name: String,
    parent: LinkId,
    child: LinkId,
    joint_type: JointType,
    xyz: Vector3<f64>,
    rpy: Vector3<f64>,
    axis: Unit<Vector3<f64>>,
    limits: Option<(f64, f64)>,
    theta: f64,
    transform: Matrix4<f64>,
}

impl Joint {
    /// Joint name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent link
    pub fn parent(&self) -> LinkId {
        self.parent
    }

    /// Child link
    pub fn child(&self) -> LinkId {
        self.child
    }

    /// Motion type
    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    /// Static translation from the parent link frame
    pub fn origin_xyz(&self) -> &Vector3<f64> {
        &self.xyz
    }

    /// Static rotation (intrinsic XYZ Euler angles) from the parent link frame
    pub fn origin_rpy(&self) -> &Vector3<f64> {
        &self.rpy
    }

    /// Unit motion axis
    pub fn axis(&self) -> &Unit<Vector3<f64>> {
        &self.axis
    }

    /// `[min, max]` limits, if any
    pub fn limits(&self) -> Option<(f64, f64)> {
        self.limits
    }

    /// Current joint value (radians or meters)
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Set the joint value, clamped to the joint limits
    pub fn set_theta(&mut self, theta: f64) {
        self.theta = apply_joint_limits(self.joint_type, self.limits, theta);
    }

    /// Clamp the current value into the joint limits
    pub fn apply_joint_limits(&mut self) {
        self.theta = apply_joint_limits(self.joint_type, self.limits, self.theta);
    }

    /// World transform computed by the last [`Robot::update_transforms`]
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }
}

/// An articulated robot with a planar mobile base
#[derive(Clone, Debug)]
pub struct Robot {
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
    base: LinkId,
    end_effector: Option<LinkId>,
    xyz: Vector3<f64>,
    rpy: Vector3<f64>,
    transform: Matrix4<f64>,
}

impl Robot {
    /// Robot name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root link
    pub fn base(&self) -> LinkId {
        self.base
    }

    /// End effector link, if declared
    pub fn end_effector(&self) -> Option<LinkId> {
        self.end_effector
    }

    /// All links
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// All joints in declaration order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Link by handle
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// Joint by handle
    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.0]
    }

    /// Look up a link handle by name
    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.links.iter().position(|link| link.name == name).map(LinkId)
    }

    /// Look up a joint handle by name
    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.joints.iter().position(|joint| joint.name == name).map(JointId)
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Length of a configuration vector for this robot (3 + joint count)
    pub fn dof(&self) -> usize {
        3 + self.joints.len()
    }

    /// Base position
    pub fn xyz(&self) -> &Vector3<f64> {
        &self.xyz
    }

    /// Base rotation (intrinsic XYZ Euler angles)
    pub fn rpy(&self) -> &Vector3<f64> {
        &self.rpy
    }

    /// Base (x, y)
    pub fn base_position(&self) -> [f64; 2] {
        [self.xyz.x, self.xyz.y]
    }

    /// Base rotation about z
    pub fn base_heading(&self) -> f64 {
        self.rpy.z
    }

    /// Place the base at (x, y) facing `heading`
    pub fn set_base_pose(&mut self, x: f64, y: f64, heading: f64) {
        self.xyz.x = x;
        self.xyz.y = y;
        self.rpy.z = heading;
    }

    /// Move the base by `delta`
    pub fn translate_base(&mut self, delta: &Vector3<f64>) {
        self.xyz += delta;
    }

    /// Unit vector of the robot's forward direction
    pub fn facing(&self) -> Vector3<f64> {
        rotation_xyz(&self.rpy) * Vector3::x()
    }

    /// Set a joint value (clamped to its limits)
    pub fn set_joint_theta(&mut self, id: JointId, theta: f64) {
        self.joints[id.0].set_theta(theta);
    }

    /// Current value of a joint
    pub fn joint_theta(&self, id: JointId) -> f64 {
        self.joints[id.0].theta
    }

    /// Base transform computed by the last [`Robot::update_transforms`]
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// Run forward kinematics on the live state and cache the resulting
    /// transforms on the robot, every joint and every link
    pub fn update_transforms(&mut self) {
        for joint in &mut self.joints {
            joint.apply_joint_limits();
        }
        let configuration = RobotConfiguration::from_robot(self);
        let root = forward::base_transform(self, &configuration);
        let transforms = forward::traverse(self, root, configuration.joint_values());
        self.store_transforms(&transforms);
    }

    /// Cache externally computed transforms for rendering collaborators
    pub fn store_transforms(&mut self, transforms: &Transforms) {
        self.transform = *transforms.root();
        for (joint, transform) in self.joints.iter_mut().zip(transforms.joints()) {
            joint.transform = *transform;
        }
        for (link, transform) in self.links.iter_mut().zip(transforms.links()) {
            link.transform = *transform;
        }
    }
}

/// Link entry of a robot description
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Link name
    pub name: String,
    /// Collision bounds in the link frame
    pub geometry: LinkGeometry,
}

impl LinkSpec {
    /// Create a link spec
    pub fn new(name: impl Into<String>, geometry: LinkGeometry) -> Self {
        LinkSpec {
            name: name.into(),
            geometry,
        }
    }
}

fn default_axis() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

/// Joint entry of a robot description
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    /// Joint name
    pub name: String,
    /// Parent link name
    pub parent: String,
    /// Child link name
    pub child: String,
    /// Motion type
    #[serde(default, rename = "type")]
    pub joint_type: JointType,
    /// Static translation from the parent frame
    #[serde(default)]
    pub xyz: [f64; 3],
    /// Static rotation (intrinsic XYZ Euler) from the parent frame
    #[serde(default)]
    pub rpy: [f64; 3],
    /// Motion axis, normalized on build
    #[serde(default = "default_axis")]
    pub axis: [f64; 3],
    /// `[min, max]` limits
    #[serde(default)]
    pub limits: Option<[f64; 2]>,
}

impl JointSpec {
    /// Continuous joint about +x with no offset
    pub fn new(name: impl Into<String>, parent: impl Into<String>, child: impl Into<String>) -> Self {
        JointSpec {
            name: name.into(),
            parent: parent.into(),
            child: child.into(),
            joint_type: JointType::Continuous,
            xyz: [0.0; 3],
            rpy: [0.0; 3],
            axis: default_axis(),
            limits: None,
        }
    }

    /// Set the joint type
    pub fn with_type(mut self, joint_type: JointType) -> Self {
        self.joint_type = joint_type;
        self
    }

    /// Set the static offset
    pub fn with_origin(mut self, xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        self.xyz = xyz;
        self.rpy = rpy;
        self
    }

    /// Set the motion axis
    pub fn with_axis(mut self, axis: [f64; 3]) -> Self {
        self.axis = axis;
        self
    }

    /// Set `[min, max]` limits
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.limits = Some([min, max]);
        self
    }
}

/// Serializable description of a robot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    /// Robot name
    pub name: String,
    /// Name of the root link
    pub base: String,
    /// Name of the end effector link
    #[serde(default)]
    pub end_effector: Option<String>,
    /// Links
    pub links: Vec<LinkSpec>,
    /// Joints, in configuration order
    #[serde(default)]
    pub joints: Vec<JointSpec>,
    /// Initial base position
    #[serde(default)]
    pub xyz: [f64; 3],
    /// Initial base rotation
    #[serde(default)]
    pub rpy: [f64; 3],
}

impl RobotDescription {
    /// Load a robot description from a YAML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let description: RobotDescription = serde_yaml::from_reader(file)?;
        info!("Loaded robot description '{}' from {}", description.name, path.as_ref().display());
        Ok(description)
    }

    /// Validate the description and build the robot
    pub fn build(&self) -> Result<Robot> {
        let mut link_ids: HashMap<&str, LinkId> = HashMap::new();
        let mut links = Vec::with_capacity(self.links.len());
        for spec in &self.links {
            if link_ids.insert(spec.name.as_str(), LinkId(links.len())).is_some() {
                return Err(KineplanError::InvalidRobot(format!("duplicate link '{}'", spec.name)));
            }
            spec.geometry.validate(&spec.name)?;
            links.push(Link {
                name: spec.name.clone(),
                parent: None,
                children: Vec::new(),
                geometry: spec.geometry,
                transform: Matrix4::identity(),
            });
        }

        let lookup = |name: &str| {
            link_ids
                .get(name)
                .copied()
                .ok_or_else(|| KineplanError::InvalidRobot(format!("unknown link '{}'", name)))
        };
        let base = lookup(&self.base)?;

        let mut joint_names = HashSet::new();
        let mut joints = Vec::with_capacity(self.joints.len());
        for spec in &self.joints {
            if !joint_names.insert(spec.name.as_str()) {
                return Err(KineplanError::InvalidRobot(format!("duplicate joint '{}'", spec.name)));
            }
            let parent = lookup(&spec.parent)?;
            let child = lookup(&spec.child)?;
            if child == base {
                return Err(KineplanError::InvalidRobot(format!(
                    "joint '{}' uses the base link as its child",
                    spec.name
                )));
            }
            if parent == child {
                return Err(KineplanError::InvalidRobot(format!(
                    "joint '{}' connects link '{}' to itself",
                    spec.name, spec.parent
                )));
            }
            if links[child.0].parent.is_some() {
                return Err(KineplanError::InvalidRobot(format!(
                    "link '{}' has more than one parent joint",
                    spec.child
                )));
            }

            let axis = Unit::try_new(Vector3::from(spec.axis), 1e-9).ok_or_else(|| {
                KineplanError::InvalidRobot(format!("joint '{}' has a zero-length axis", spec.name))
            })?;

            let limits = match (spec.joint_type.requires_limits(), spec.limits) {
                (true, None) => {
                    return Err(KineplanError::InvalidRobot(format!(
                        "{:?} joint '{}' requires limits",
                        spec.joint_type, spec.name
                    )));
                }
                (true, Some([min, max])) if !(min <= max) => {
                    return Err(KineplanError::InvalidRobot(format!(
                        "joint '{}' has limits [{}, {}] with min > max",
                        spec.name, min, max
                    )));
                }
                (true, Some([min, max])) => Some((min, max)),
                (false, Some(_)) => {
                    return Err(KineplanError::InvalidRobot(format!(
                        "{:?} joint '{}' must not declare limits",
                        spec.joint_type, spec.name
                    )));
                }
                (false, None) => None,
            };

            let id = JointId(joints.len());
            links[child.0].parent = Some(id);
            links[parent.0].children.push(id);
            joints.push(Joint {
                name: spec.name.clone(),
                parent,
                child,
                joint_type: spec.joint_type,
                xyz: Vector3::from(spec.xyz),
                rpy: Vector3::from(spec.rpy),
                axis,
                limits,
                theta: apply_joint_limits(spec.joint_type, limits, 0.0),
                transform: Matrix4::identity(),
            });
        }

        // every link must hang off the base
        let mut reached = vec![false; links.len()];
        let mut stack = vec![base];
        while let Some(link) = stack.pop() {
            reached[link.0] = true;
            for joint in &links[link.0].children {
                stack.push(joints[joint.0].child);
            }
        }
        if let Some(index) = reached.iter().position(|r| !r) {
            return Err(KineplanError::InvalidRobot(format!(
                "link '{}' is not connected to base '{}'",
                links[index].name, self.base
            )));
        }

        let end_effector = self.end_effector.as_deref().map(lookup).transpose()?;

        let mut robot = Robot {
            name: self.name.clone(),
            links,
            joints,
            base,
            end_effector,
            xyz: Vector3::from(self.xyz),
            rpy: Vector3::from(self.rpy),
            transform: Matrix4::identity(),
        };
        robot.update_transforms();
        debug!(
            "Built robot '{}' with {} links and {} joints",
            robot.name,
            robot.links.len(),
            robot.joints.len()
        );
        Ok(robot)
    }
}

/// Fluent builder for robots
#[derive(Clone, Debug)]
pub struct RobotBuilder {
    description: RobotDescription,
}

impl RobotBuilder {
    /// Start a robot with its base link
    pub fn new(name: impl Into<String>, base: LinkSpec) -> Self {
        RobotBuilder {
            description: RobotDescription {
                name: name.into(),
                base: base.name.clone(),
                end_effector: None,
                links: vec![base],
                joints: Vec::new(),
                xyz: [0.0; 3],
                rpy: [0.0; 3],
            },
        }
    }

    /// Add a link
    pub fn link(mut self, link: LinkSpec) -> Self {
        self.description.links.push(link);
        self
    }

    /// Add a joint (configuration order follows insertion order)
    pub fn joint(mut self, joint: JointSpec) -> Self {
        self.description.joints.push(joint);
        self
    }

    /// Declare the end effector link
    pub fn end_effector(mut self, link: impl Into<String>) -> Self {
        self.description.end_effector = Some(link.into());
        self
    }

    /// Initial base pose
    pub fn pose(mut self, xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        self.description.xyz = xyz;
        self.description.rpy = rpy;
        self
    }

    /// The description assembled so far
    pub fn description(&self) -> &RobotDescription {
        &self.description
    }

    /// Validate and build the robot
    pub fn build(self) -> Result<Robot> {
        self.description.build()
    }
}

impl From<RobotDescription> for RobotBuilder {
    fn from(description: RobotDescription) -> Self {
        RobotBuilder { description }
    }
}
