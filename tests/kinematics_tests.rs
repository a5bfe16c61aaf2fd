#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use kineplan::kinematics::{apply_joint_limits, compute_transforms};
    use kineplan::{
        JointId, JointSpec, JointType, KineplanError, LinkGeometry, LinkSpec, Robot, RobotBuilder,
        RobotConfiguration, RobotDescription, robots,
    };
    use rstest::{fixture, rstest};
    use std::f64::consts::{FRAC_PI_2, PI};
    use std::io::Write;

    #[fixture]
    fn limited_arm() -> Robot {
        RobotBuilder::new("arm", LinkSpec::new("base", LinkGeometry::cuboid([0.5; 3], [0.0; 3])))
            .link(LinkSpec::new("upper", LinkGeometry::cuboid([1.0, 0.2, 0.2], [0.5, 0.0, 0.0])))
            .link(LinkSpec::new("slider", LinkGeometry::cuboid([0.2; 3], [0.0; 3])))
            .joint(
                JointSpec::new("shoulder", "base", "upper")
                    .with_type(JointType::Revolute)
                    .with_axis([0.0, 0.0, 1.0])
                    .with_limits(-1.0, 1.0),
            )
            .joint(
                JointSpec::new("rail", "upper", "slider")
                    .with_type(JointType::Prismatic)
                    .with_origin([1.0, 0.0, 0.0], [0.0; 3])
                    .with_axis([0.0, 1.0, 0.0])
                    .with_limits(0.0, 2.0),
            )
            .end_effector("slider")
            .build()
            .unwrap()
    }

    // Limited joints are clamped, unlimited joints pass through
    #[rstest]
    #[case(JointType::Revolute, Some((-1.0, 1.0)), 3.0, 1.0)]
    #[case(JointType::Revolute, Some((-1.0, 1.0)), -3.0, -1.0)]
    #[case(JointType::Prismatic, Some((0.0, 2.0)), 0.5, 0.5)]
    #[case(JointType::Continuous, None, 12.0, 12.0)]
    #[case(JointType::Fixed, None, 0.7, 0.0)]
    fn test_apply_joint_limits(
        #[case] joint_type: JointType,
        #[case] limits: Option<(f64, f64)>,
        #[case] theta: f64,
        #[case] expected: f64,
    ) {
        let clamped = apply_joint_limits(joint_type, limits, theta);
        assert_eq!(clamped, expected);
        // idempotent
        assert_eq!(apply_joint_limits(joint_type, limits, clamped), clamped);
    }

    #[rstest]
    fn test_forward_kinematics_is_deterministic(limited_arm: Robot) {
        let configuration = RobotConfiguration::from_vec(&limited_arm, vec![1.0, -2.0, 0.3, 0.4, 1.1]).unwrap();
        let first = compute_transforms(&limited_arm, &configuration).unwrap();
        let second = compute_transforms(&limited_arm, &configuration).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_out_of_limit_values_are_clamped_before_composition(limited_arm: Robot) {
        let beyond = RobotConfiguration::from_vec(&limited_arm, vec![0.0, 0.0, 0.0, 2.5, 5.0]).unwrap();
        let at_limit = RobotConfiguration::from_vec(&limited_arm, vec![0.0, 0.0, 0.0, 1.0, 2.0]).unwrap();
        assert_eq!(
            compute_transforms(&limited_arm, &beyond).unwrap(),
            compute_transforms(&limited_arm, &at_limit).unwrap()
        );
    }

    #[rstest]
    fn test_prismatic_joint_slides_along_axis(limited_arm: Robot) {
        let configuration = RobotConfiguration::from_vec(&limited_arm, vec![0.0, 0.0, 0.0, 0.0, 1.5]).unwrap();
        let transforms = compute_transforms(&limited_arm, &configuration).unwrap();
        let slider = transforms.link(limited_arm.link_id("slider").unwrap());
        assert_relative_eq!(slider[(0, 3)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(slider[(1, 3)], 1.5, epsilon = 1e-12);
        assert_relative_eq!(slider[(2, 3)], 0.0, epsilon = 1e-12);
    }

    #[rstest]
    fn test_base_heading_rotates_the_chain(limited_arm: Robot) {
        let configuration = RobotConfiguration::from_vec(&limited_arm, vec![2.0, 3.0, FRAC_PI_2, 0.0, 0.0]).unwrap();
        let transforms = compute_transforms(&limited_arm, &configuration).unwrap();
        let rail = transforms.joint(JointId(1));
        // one meter along the rotated x axis
        assert_relative_eq!(rail[(0, 3)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(rail[(1, 3)], 4.0, epsilon = 1e-12);
    }

    #[rstest]
    fn test_update_transforms_caches_live_state(mut limited_arm: Robot) {
        limited_arm.set_base_pose(1.0, 1.0, 0.5);
        limited_arm.set_joint_theta(JointId(0), 0.25);
        limited_arm.set_joint_theta(JointId(1), 0.75);
        limited_arm.update_transforms();

        let expected = compute_transforms(&limited_arm, &RobotConfiguration::from_robot(&limited_arm)).unwrap();
        assert_eq!(limited_arm.transform(), expected.root());
        for (index, link) in limited_arm.links().iter().enumerate() {
            assert_eq!(link.transform(), &expected.links()[index]);
        }
        for (index, joint) in limited_arm.joints().iter().enumerate() {
            assert_eq!(joint.transform(), &expected.joints()[index]);
        }
    }

    #[test]
    fn test_configuration_round_trip_is_lossless() {
        let mut robot = robots::mr2().unwrap();
        robot.set_base_pose(0.5, -1.25, 0.3);
        for (index, theta) in [0.1, -0.2, 0.3, -0.4, 0.5].into_iter().enumerate() {
            robot.set_joint_theta(JointId(index), theta);
        }

        let read = RobotConfiguration::from_robot(&robot);
        assert_eq!(read.len(), robot.dof());

        let mut other = robots::mr2().unwrap();
        read.apply_to(&mut other).unwrap();
        assert_eq!(RobotConfiguration::from_robot(&other), read);
    }

    #[rstest]
    fn test_wrong_length_configuration_is_rejected(limited_arm: Robot) {
        let result = RobotConfiguration::from_vec(&limited_arm, vec![0.0; 4]);
        assert!(matches!(
            result,
            Err(KineplanError::InvalidConfiguration { expected: 5, actual: 4 })
        ));
    }

    #[rstest]
    fn test_closeness_wraps_angular_joints_only(limited_arm: Robot) {
        let a = RobotConfiguration::from_vec(&limited_arm, vec![0.0, 0.0, PI, 0.0, 0.0]).unwrap();
        let b = RobotConfiguration::from_vec(&limited_arm, vec![0.0, 0.0, -PI, 0.0, 0.0]).unwrap();
        assert!(a.is_close(&b, 1e-9));

        // the prismatic field is linear: 2π apart is far
        let c = RobotConfiguration::from_vec(&limited_arm, vec![0.0, 0.0, 0.0, 0.0, 2.0 * PI]).unwrap();
        let d = RobotConfiguration::from_vec(&limited_arm, vec![0.0; 5]).unwrap();
        assert!(!c.is_close(&d, 1e-9));
    }

    #[test]
    fn test_description_loads_from_yaml() {
        let yaml = r#"
name: pointer
base: body
end_effector: tip
links:
  - name: body
    geometry: { shape: box, min: [-0.5, -0.5, -0.5], max: [0.5, 0.5, 0.5] }
  - name: tip
    geometry: { shape: sphere, center: [0.0, 0.0, 0.0], radius: 0.1 }
joints:
  - name: wrist
    parent: body
    child: tip
    type: revolute
    xyz: [0.0, 0.0, 1.0]
    axis: [0.0, 1.0, 0.0]
    limits: [-1.5, 1.5]
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let description = RobotDescription::load(file.path()).unwrap();
        let robot = description.build().unwrap();
        assert_eq!(robot.name(), "pointer");
        assert_eq!(robot.dof(), 4);
        assert_eq!(robot.joint(JointId(0)).joint_type(), JointType::Revolute);
        assert_eq!(robot.joint(JointId(0)).limits(), Some((-1.5, 1.5)));
        assert_eq!(robot.end_effector(), robot.link_id("tip"));
    }

    // Structural mistakes are caught when the robot is built
    #[rstest]
    #[case::unknown_child(JointSpec::new("j", "base", "nowhere"))]
    #[case::base_as_child(JointSpec::new("j", "base", "base"))]
    #[case::zero_axis(JointSpec::new("j", "base", "leaf").with_axis([0.0; 3]))]
    #[case::prismatic_without_limits(JointSpec::new("j", "base", "leaf").with_type(JointType::Prismatic))]
    #[case::continuous_with_limits(JointSpec::new("j", "base", "leaf").with_limits(-1.0, 1.0))]
    #[case::inverted_limits(
        JointSpec::new("j", "base", "leaf")
            .with_type(JointType::Revolute)
            .with_limits(1.0, -1.0)
    )]
    fn test_invalid_robots_are_rejected(#[case] joint: JointSpec) {
        let result = RobotBuilder::new("bad", LinkSpec::new("base", LinkGeometry::sphere([0.0; 3], 0.5)))
            .link(LinkSpec::new("leaf", LinkGeometry::sphere([0.0; 3], 0.1)))
            .joint(joint)
            .build();
        assert!(matches!(result, Err(KineplanError::InvalidRobot(_))));
    }

    #[test]
    fn test_disconnected_link_is_rejected() {
        let result = RobotBuilder::new("bad", LinkSpec::new("base", LinkGeometry::sphere([0.0; 3], 0.5)))
            .link(LinkSpec::new("floating", LinkGeometry::sphere([0.0; 3], 0.1)))
            .build();
        assert!(matches!(result, Err(KineplanError::InvalidRobot(_))));
    }
}
