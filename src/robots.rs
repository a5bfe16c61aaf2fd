// robots.rs

// Built-in robot descriptions used by the demos and tests. Link boxes are
// given as full side lengths centered at an offset in the link frame.

use crate::Result;
use crate::kinematics::{JointSpec, LinkGeometry, LinkSpec, Robot, RobotBuilder};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

fn block(name: impl Into<String>, shape: [f64; 3], offset: [f64; 3]) -> LinkSpec {
    LinkSpec::new(name, LinkGeometry::cuboid(shape, offset))
}

/// Eight-legged crawler: a flat body with three continuous joints per leg
/// (hip about z, knee and ankle about x)
pub fn crawler() -> Result<Robot> {
    let mut builder = RobotBuilder::new("crawler", block("base", [1.0, 2.3, 0.4], [0.0; 3]));

    for i in 0..8 {
        let leg = i + 1;
        let front_back = if i & 2 != 0 { -1.0 } else { 1.0 };
        let side = if i % 2 != 0 { -1.0 } else { 1.0 };
        let spread = if i < 4 { 0.9 } else { 0.3 };

        builder = builder
            .link(block(format!("leg{}_upper", leg), [0.3, 0.3, 0.3], [0.0, 0.15, 0.0]))
            .link(block(format!("leg{}_middle", leg), [0.3, 0.6, 0.3], [0.0, 0.3, 0.0]))
            .link(block(format!("leg{}_lower", leg), [0.3, 1.0, 0.3], [0.0, 0.5, 0.0]))
            .joint(
                JointSpec::new(format!("leg{}_hip", leg), "base", format!("leg{}_upper", leg))
                    .with_origin([front_back * -0.3, side * spread, 0.0], [0.0, 0.0, front_back * FRAC_PI_2])
                    .with_axis([0.0, 0.0, 1.0]),
            )
            .joint(
                JointSpec::new(
                    format!("leg{}_knee", leg),
                    format!("leg{}_upper", leg),
                    format!("leg{}_middle", leg),
                )
                .with_origin([0.0, 0.4, 0.0], [FRAC_PI_4, 0.0, 0.0])
                .with_axis([1.0, 0.0, 0.0]),
            )
            .joint(
                JointSpec::new(
                    format!("leg{}_ankle", leg),
                    format!("leg{}_middle", leg),
                    format!("leg{}_lower", leg),
                )
                .with_origin([0.0, 0.6, 0.0], [-FRAC_PI_2, 0.0, 0.0])
                .with_axis([1.0, 0.0, 0.0]),
            );
    }

    builder.end_effector("leg1_lower").build()
}

/// Two-armed torso: a four-joint right arm and a one-joint left clavicle
pub fn mr2() -> Result<Robot> {
    RobotBuilder::new("mr2", block("base", [1.0, 1.0, 0.4], [0.0, 0.0, 0.2]))
        .link(block("clavicle_right", [0.3, 1.0, 0.3], [0.0, 0.5, 0.0]))
        .link(block("clavicle_left", [0.3, 1.0, 0.3], [0.0, 0.5, 0.0]))
        .link(block("shoulder_right", [0.3, 0.7, 0.3], [0.0, 0.35, 0.0]))
        .link(block("upperarm_right", [0.3, 0.7, 0.3], [0.0, 0.35, 0.0]))
        .link(block("forearm_right", [0.3, 0.5, 0.3], [0.0, 0.25, 0.0]))
        .joint(
            JointSpec::new("clavicle_right_yaw", "base", "clavicle_right")
                .with_origin([0.3, 0.0, 0.4], [FRAC_PI_2, 0.0, 0.0])
                .with_axis([0.0, -1.0, 0.0]),
        )
        .joint(
            JointSpec::new("shoulder_right_yaw", "clavicle_right", "shoulder_right")
                .with_origin([0.0, 0.85, 0.15], [FRAC_PI_2, 0.0, 0.0])
                .with_axis([0.0, 0.707, -0.707]),
        )
        .joint(
            JointSpec::new("upperarm_right_pitch", "shoulder_right", "upperarm_right")
                .with_origin([0.0, 0.7, 0.0], [0.0; 3])
                .with_axis([0.0, 0.0, -1.0]),
        )
        .joint(
            JointSpec::new("forearm_right_yaw", "upperarm_right", "forearm_right")
                .with_origin([0.0, 0.7, 0.0], [0.0; 3])
                .with_axis([1.0, 0.0, 0.0]),
        )
        .joint(
            JointSpec::new("clavicle_left_roll", "base", "clavicle_left")
                .with_origin([-0.3, 0.0, 0.4], [FRAC_PI_2, 0.0, 0.0])
                .with_axis([0.0, 1.0, 0.0]),
        )
        .end_effector("forearm_right")
        .build()
}
