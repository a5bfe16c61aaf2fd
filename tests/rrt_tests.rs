#[cfg(test)]
mod tests {
    use kineplan::planning::plan_with_rrt;
    use kineplan::planning::shortcut::path_is_free;
    use kineplan::{
        Bounds, CollisionChecker, KineplanConfig, KineplanError, Obstacle, PlanOutcome, RobotCollisionChecker,
        RobotConfiguration, RrtConfig, RrtConnect, RrtStatus, TreeId, World, robots,
    };
    use mockall::mock;
    use rstest::rstest;

    mock! {
        pub Checker {}
        impl CollisionChecker for Checker {
            fn is_colliding(&self, configuration: &RobotConfiguration) -> bool;
        }
    }

    fn square() -> Bounds {
        Bounds::centered(10.0, 10.0)
    }

    /// Wall along x = 0 with a gap at y > 3
    fn wall(c: &RobotConfiguration) -> bool {
        let [x, y] = c.base_position();
        let outside = !square().contains(x, y);
        outside || (x.abs() < 0.5 && y < 3.0)
    }

    fn seeded(seed: u64) -> RrtConfig {
        RrtConfig {
            seed: Some(seed),
            sample_heading: false,
            ..RrtConfig::default()
        }
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(42)]
    fn test_path_goes_around_the_wall(#[case] seed: u64) {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start.clone(), goal.clone(), seeded(seed)).unwrap();

        let path = match planner.plan() {
            PlanOutcome::Found(path) => path,
            other => panic!("expected a path, got {:?}", other),
        };
        assert_eq!(planner.status(), RrtStatus::Reached);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));

        // every edge is at most one step, so sampling at the step resolution
        // only visits waypoints
        for pair in path.waypoints().windows(2) {
            assert!(pair[0].distance(&pair[1]) <= 0.5 + 1e-9);
        }
        assert!(path.iter().all(|c| !wall(c)));
        assert!(path.iter().any(|c| c.base_position()[1] >= 3.0));
    }

    #[test]
    fn test_every_tree_node_is_free() {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start, goal, seeded(3)).unwrap();
        for _ in 0..200 {
            if planner.step() == RrtStatus::Reached {
                break;
            }
        }
        for id in [TreeId::A, TreeId::B] {
            assert!(planner.tree(id).nodes().iter().all(|node| !wall(&node.configuration)));
        }
    }

    #[test]
    fn test_trees_swap_roles_each_step() {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start, goal, seeded(5)).unwrap();
        assert_eq!(planner.status(), RrtStatus::Waiting);
        assert_eq!(planner.active_tree(), TreeId::A);
        planner.step();
        if planner.status() != RrtStatus::Reached {
            assert_eq!(planner.active_tree(), TreeId::B);
            assert_eq!(planner.iterations(), 1);
        }
    }

    #[test]
    fn test_budget_exhaustion_is_no_path() {
        // a band one unit wide across the whole square; a half-unit step
        // can never jump it
        let sealed = |c: &RobotConfiguration| {
            let [x, y] = c.base_position();
            !square().contains(x, y) || (0.0 < x && x < 1.0)
        };
        let start = RobotConfiguration::planar(-3.0, 0.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, 0.0, 0.0);
        let config = RrtConfig {
            max_iterations: 50,
            ..seeded(9)
        };
        let mut planner = RrtConnect::new(&sealed, square(), start, goal, config).unwrap();
        assert_eq!(planner.plan(), PlanOutcome::NoPath);
        assert_eq!(planner.status(), RrtStatus::Exhausted);
        assert_eq!(planner.iterations(), 50);
    }

    #[test]
    fn test_colliding_goal_is_exhausted_without_sampling() {
        let mut checker = MockChecker::new();
        checker
            .expect_is_colliding()
            .returning(|c: &RobotConfiguration| c.base_position()[0] > 0.0);
        let start = RobotConfiguration::planar(-1.0, 0.0, 0.0);
        let goal = RobotConfiguration::planar(1.0, 0.0, 0.0);
        let planner = RrtConnect::new(&checker, square(), start, goal, seeded(1)).unwrap();
        assert_eq!(planner.status(), RrtStatus::Exhausted);
    }

    #[test]
    fn test_start_equal_to_goal() {
        let start = RobotConfiguration::planar(1.0, 1.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start.clone(), start, seeded(1)).unwrap();
        match planner.plan() {
            PlanOutcome::AlreadyAtGoal(path) => assert_eq!(path.len(), 1),
            other => panic!("expected AlreadyAtGoal, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_dimensions_are_rejected() {
        let robot = robots::mr2().unwrap();
        let start = RobotConfiguration::from_robot(&robot);
        let goal = RobotConfiguration::planar(0.0, 0.0, 0.0);
        let result = RrtConnect::new(&wall, square(), start, goal, seeded(1));
        assert!(matches!(result, Err(KineplanError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_add_vertex_attaches_to_nearest() {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start, goal, seeded(1)).unwrap();
        let tree: TreeId = "B".parse().unwrap();
        let index = planner
            .add_vertex(RobotConfiguration::planar(3.0, -2.5, 0.0), tree)
            .expect("free configuration is accepted");
        assert_eq!(planner.tree(TreeId::B).nodes()[index].parent, Some(0));
        assert!(matches!("Z".parse::<TreeId>(), Err(KineplanError::InvalidTree(_))));
    }

    #[test]
    fn test_add_vertex_rejects_colliding_configuration() {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start, goal, seeded(1)).unwrap();

        assert_eq!(planner.add_vertex(RobotConfiguration::planar(0.0, 0.0, 0.0), TreeId::A), None);
        assert_eq!(planner.add_vertex(RobotConfiguration::planar(20.0, 0.0, 0.0), TreeId::B), None);
        assert_eq!(planner.tree(TreeId::A).len(), 1);
        assert_eq!(planner.tree(TreeId::B).len(), 1);
    }

    #[rstest]
    #[case(RrtConfig { step_size: 0.0, max_iterations: 10, ..RrtConfig::default() })]
    #[case(RrtConfig { step_size: -0.5, ..RrtConfig::default() })]
    #[case(RrtConfig { step_size: f64::NAN, ..RrtConfig::default() })]
    #[case(RrtConfig { step_size: f64::INFINITY, ..RrtConfig::default() })]
    #[case(RrtConfig { goal_bias: f64::NAN, ..RrtConfig::default() })]
    #[case(RrtConfig { goal_bias: 1.5, ..RrtConfig::default() })]
    #[case(RrtConfig { goal_bias: -0.1, ..RrtConfig::default() })]
    #[case(RrtConfig { edge_resolution: Some(0.0), ..RrtConfig::default() })]
    fn test_bad_parameters_are_rejected(#[case] config: RrtConfig) {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let result = RrtConnect::new(&wall, square(), start, goal, config);
        assert!(matches!(result, Err(KineplanError::InvalidParameter(_))));
    }

    #[test]
    fn test_full_goal_bias_is_accepted() {
        let start = RobotConfiguration::planar(-1.0, 4.0, 0.0);
        let goal = RobotConfiguration::planar(1.0, 4.0, 0.0);
        let config = RrtConfig {
            goal_bias: 1.0,
            ..seeded(3)
        };
        let mut planner = RrtConnect::new(&wall, square(), start, goal, config).unwrap();
        assert!(planner.plan().is_success());
    }

    #[test]
    fn test_cancel_stops_planning() {
        let start = RobotConfiguration::planar(-3.0, -3.0, 0.0);
        let goal = RobotConfiguration::planar(3.0, -3.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start, goal, seeded(5)).unwrap();
        planner.step();
        let iterations = planner.iterations();
        let grown = planner.tree(TreeId::A).len() + planner.tree(TreeId::B).len();

        planner.cancel();
        assert_eq!(planner.status(), RrtStatus::Cancelled);
        assert_eq!(planner.step(), RrtStatus::Cancelled);
        assert_eq!(planner.plan(), PlanOutcome::Cancelled);
        assert_eq!(planner.outcome(), Some(PlanOutcome::Cancelled));
        assert_eq!(planner.iterations(), iterations);
        assert_eq!(planner.tree(TreeId::A).len() + planner.tree(TreeId::B).len(), grown);
    }

    #[test]
    fn test_cancel_keeps_a_finished_result() {
        let start = RobotConfiguration::planar(1.0, 1.0, 0.0);
        let mut planner = RrtConnect::new(&wall, square(), start.clone(), start, seeded(1)).unwrap();
        planner.cancel();
        assert_eq!(planner.status(), RrtStatus::Reached);
    }

    #[test]
    fn test_arm_planning_around_a_pillar() {
        let robot = robots::mr2().unwrap();
        let world = World::new("pillar", [12.0, 12.0]).with_obstacles(vec![Obstacle::sphere([0.0, 0.0, 0.5], 0.75)]);
        let start = RobotConfiguration::from_robot(&robot).with_base(-4.5, 0.0, 0.0);
        let goal = start.with_base(4.5, 0.0, 0.0);

        let mut config = KineplanConfig::default();
        config.rrt.seed = Some(11);
        config.rrt.edge_resolution = Some(config.shortcut.resolution);
        config.shortcut.seed = Some(11);
        let outcome = plan_with_rrt(&robot, &world, &start, &goal, &config).unwrap();
        let path = outcome.into_path().expect("mr2 should get around a single pillar");

        let checker = RobotCollisionChecker::new(&robot, &world);
        assert!(path.iter().all(|c| !checker.is_colliding(c)));
        assert!(path_is_free(&path, &checker, config.shortcut.resolution));
    }
}
