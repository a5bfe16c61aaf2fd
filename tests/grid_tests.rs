#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use kineplan::grid::{CellEntry, CellState, Command, GridSession, Reply, SceneConfig, SceneDocument};
    use kineplan::{Algorithm, GridScene, KineplanConfig, KineplanError, MapKind, SearchStatus};
    use rstest::rstest;

    fn seeded_config() -> KineplanConfig {
        let mut config = KineplanConfig::default();
        config.rrt.seed = Some(2024);
        config
    }

    #[rstest]
    #[case(MapKind::Empty)]
    #[case(MapKind::Misc)]
    #[case(MapKind::Narrow1)]
    #[case(MapKind::Narrow2)]
    #[case(MapKind::ThreeSection)]
    fn test_every_builtin_map_is_solvable_with_astar(#[case] kind: MapKind) {
        let mut scene = GridScene::from_map(kind, &SceneConfig::default());
        let report = scene.run(Algorithm::AStar, &KineplanConfig::default()).unwrap();
        assert_eq!(report.status, SearchStatus::Success);
        // never shorter than the Manhattan distance of 80 cells
        assert!(report.path_length >= 80.0 * scene.cell_size() - 1e-9);
        assert!(scene.count(CellState::Path) > 0);
        assert_eq!(scene.cell(5, 5), Some(CellState::Start));
        assert_eq!(scene.cell(45, 45), Some(CellState::End));
    }

    #[test]
    fn test_empty_map_path_is_manhattan() {
        let mut scene = GridScene::from_map(MapKind::Empty, &SceneConfig::default());
        let report = scene.run(Algorithm::AStar, &KineplanConfig::default()).unwrap();
        assert_relative_eq!(report.path_length, 80.0 * 14.0, epsilon = 1e-9);
        // 79 cells between start and end
        assert_eq!(scene.count(CellState::Path), 79);
    }

    #[rstest]
    #[case(MapKind::Empty)]
    #[case(MapKind::Misc)]
    fn test_rrt_runs_on_the_grid(#[case] kind: MapKind) {
        let mut scene = GridScene::from_map(kind, &SceneConfig::default());
        let report = scene.run(Algorithm::Rrt, &seeded_config()).unwrap();
        assert_eq!(report.status, SearchStatus::Success);
        assert_eq!(report.queue_size, 0);
        assert!(report.visited >= 2);
        assert!(report.path_length > 0.0);
        // barriers are never painted over
        let barriers = GridScene::from_map(kind, &SceneConfig::default()).count(CellState::Barrier);
        assert_eq!(scene.count(CellState::Barrier), barriers);
    }

    #[test]
    fn test_sealed_end_reports_failure() {
        let mut scene = GridScene::new(10, 100);
        scene.place(1, 1).unwrap();
        scene.place(8, 8).unwrap();
        for (row, col) in [(7, 7), (7, 8), (7, 9), (8, 7), (9, 7)] {
            scene.place(row, col).unwrap();
        }
        let report = scene.run(Algorithm::AStar, &KineplanConfig::default()).unwrap();
        assert_eq!(report.status, SearchStatus::Failure);
        assert_eq!(report.path_length, 0.0);
        assert_eq!(report.queue_size, 0);
        assert_eq!(scene.count(CellState::Path), 0);
    }

    #[test]
    fn test_second_run_starts_from_a_clean_board() {
        let mut scene = GridScene::from_map(MapKind::Misc, &SceneConfig::default());
        let first = scene.run(Algorithm::AStar, &KineplanConfig::default()).unwrap();
        let painted = scene.count(CellState::Path);
        let second = scene.run(Algorithm::AStar, &KineplanConfig::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(scene.count(CellState::Path), painted);
    }

    #[test]
    fn test_run_without_end_is_an_error() {
        let mut scene = GridScene::new(10, 100);
        scene.place(1, 1).unwrap();
        assert!(matches!(
            scene.run(Algorithm::AStar, &KineplanConfig::default()),
            Err(KineplanError::InvalidScene(_))
        ));
    }

    #[rstest]
    #[case(0.0, 2.0)]
    #[case(f64::NAN, 2.0)]
    #[case(0.25, 0.0)]
    #[case(0.25, -1.0)]
    fn test_degenerate_scene_parameters_are_rejected(#[case] edge_resolution: f64, #[case] rrt_step_size: f64) {
        let mut scene = GridScene::from_map(MapKind::Empty, &SceneConfig::default());
        let mut config = seeded_config();
        config.scene.edge_resolution = edge_resolution;
        config.scene.rrt_step_size = rrt_step_size;
        for algorithm in [Algorithm::AStar, Algorithm::Rrt] {
            assert!(matches!(
                scene.run(algorithm, &config),
                Err(KineplanError::InvalidParameter(_))
            ));
        }
        assert_eq!(scene.count(CellState::Path), 0);
    }

    #[test]
    fn test_place_and_erase() {
        let mut scene = GridScene::new(10, 100);
        assert_eq!(scene.place(2, 2).unwrap(), CellState::Start);
        // clicking the start again changes nothing
        assert_eq!(scene.place(2, 2).unwrap(), CellState::Start);
        assert_eq!(scene.place(3, 3).unwrap(), CellState::End);
        assert_eq!(scene.place(4, 4).unwrap(), CellState::Barrier);
        assert_eq!(scene.place(3, 3).unwrap(), CellState::End);

        scene.erase(2, 2).unwrap();
        assert_eq!(scene.start(), None);
        assert_eq!(scene.place(5, 5).unwrap(), CellState::Start);

        scene.clear_end();
        assert_eq!(scene.end(), None);
        assert_eq!(scene.cell(3, 3), Some(CellState::Free));
        assert!(matches!(scene.place(10, 0), Err(KineplanError::InvalidScene(_))));
    }

    #[test]
    fn test_neighbors_skip_barriers_and_edges() {
        let mut scene = GridScene::new(10, 100);
        scene.place(0, 1).unwrap();
        scene.place(9, 9).unwrap();
        scene.place(1, 0).unwrap();
        assert_eq!(scene.neighbors(0, 0), vec![(0, 1)]);
        assert_eq!(scene.neighbors(5, 5).len(), 4);
    }

    #[test]
    fn test_reset_variants() {
        let mut scene = GridScene::from_map(MapKind::Narrow1, &SceneConfig::default());
        let barriers = scene.count(CellState::Barrier);
        scene.run(Algorithm::AStar, &KineplanConfig::default()).unwrap();

        let mut kept = scene.clone();
        kept.reset_keep_start();
        assert_eq!(kept.start(), Some((5, 5)));
        assert_eq!(kept.end(), None);
        assert_eq!(kept.count(CellState::Barrier), barriers);
        assert_eq!(kept.count(CellState::Path) + kept.count(CellState::Closed), 0);

        scene.clear_all();
        assert_eq!(scene.count(CellState::Free), 50 * 50);
        assert_eq!(scene.start(), None);
    }

    #[test]
    fn test_scene_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");

        let scene = GridScene::from_map(MapKind::ThreeSection, &SceneConfig::default());
        scene.save(&path).unwrap();
        let loaded = GridScene::load(&path).unwrap();
        assert_eq!(loaded, scene);

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["rowcol"], 50);
        assert_eq!(raw["width"], 700);
        assert_eq!(raw["grid"].as_array().unwrap().len(), 2500);
        assert_eq!(raw["grid"][0]["position"], serde_json::json!([0, 0]));
    }

    #[rstest]
    #[case::zero_rows(SceneDocument { grid: vec![], width: 700, rowcol: 0 })]
    #[case::off_board(SceneDocument {
        grid: vec![CellEntry { color: [0, 0, 0], position: [3, 0] }],
        width: 30,
        rowcol: 3,
    })]
    #[case::unknown_color(SceneDocument {
        grid: vec![CellEntry { color: [1, 2, 3], position: [0, 0] }],
        width: 30,
        rowcol: 3,
    })]
    fn test_invalid_documents_are_rejected(#[case] document: SceneDocument) {
        assert!(matches!(
            GridScene::from_document(&document),
            Err(KineplanError::InvalidScene(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ \"grid\": [").unwrap();
        assert!(matches!(GridScene::load(&path), Err(KineplanError::Parse(_))));
        assert!(matches!(
            GridScene::load(dir.path().join("missing.json")),
            Err(KineplanError::Io(_))
        ));
    }

    #[test]
    fn test_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let mut session = GridSession::new(MapKind::Narrow2, Algorithm::AStar, KineplanConfig::default());

        let reply = session.handle("run".parse::<Command>().unwrap()).unwrap();
        match reply {
            Reply::Message(message) => {
                assert!(message.starts_with("Status: Success | Path Length: "));
                assert!(message.contains("Visited Nodes: "));
            }
            Reply::Quit => panic!("run should not end the session"),
        }
        assert!(session.last_report().is_some());

        session.handle(Command::Save(Some(path.clone()))).unwrap();
        session.handle(Command::Clear).unwrap();
        assert_eq!(session.scene().start(), None);
        session.handle(Command::Load(path)).unwrap();
        assert_eq!(session.scene().start(), Some((5, 5)));
        assert!(session.scene().count(CellState::Path) > 0);

        session.handle(Command::Reset).unwrap();
        assert_eq!(session.scene().count(CellState::Path), 0);
        assert_eq!(session.handle("exit".parse().unwrap()).unwrap(), Reply::Quit);
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("rrt".parse::<Algorithm>().unwrap(), Algorithm::Rrt);
        assert_eq!("three_section".parse::<MapKind>().unwrap(), MapKind::ThreeSection);
        assert!("dijkstra".parse::<Algorithm>().is_err());
        for kind in MapKind::ALL {
            assert_eq!(kind.to_string().parse::<MapKind>().unwrap(), kind);
        }
    }
}
