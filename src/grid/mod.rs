//! Grid scene for Kineplan
//!
//! A square board of cells with a start, an end and barriers, used to watch
//! the planners work in two dimensions. Cells carry the colors a renderer
//! would paint, and scenes round-trip through a small JSON document.
//! The scene is itself a [`CollisionChecker`]: a configuration's x is the
//! row and y the column.

pub mod session;

pub use session::{Command, GridSession, Reply};

use crate::collision::CollisionChecker;
use crate::kinematics::RobotConfiguration;
use crate::planning::{PlanOutcome, require_positive};
use crate::planning::astar::{Connectivity, GridAStar, LatticeConfig, SearchStatus};
use crate::planning::rrt::{RrtConfig, RrtConnect, TreeId};
use crate::world::Bounds;
use crate::{KineplanConfig, KineplanError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canvas size in pixels
pub const WIDTH: u32 = 700;
/// Cells per side
pub const ROWCOL: usize = 50;

/// Cell coordinates (row, col)
pub type Cell = (usize, usize);

/// What a cell currently shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Empty
    #[default]
    Free,
    /// Blocked
    Barrier,
    /// Search start
    Start,
    /// Search goal
    End,
    /// Waiting in the search frontier
    Open,
    /// Already expanded
    Closed,
    /// On the final path
    Path,
}

impl CellState {
    const ALL: [CellState; 7] = [
        CellState::Free,
        CellState::Barrier,
        CellState::Start,
        CellState::End,
        CellState::Open,
        CellState::Closed,
        CellState::Path,
    ];

    /// RGB color of the cell
    pub fn color(self) -> [u8; 3] {
        match self {
            CellState::Free => [255, 255, 255],
            CellState::Barrier => [0, 0, 0],
            CellState::Start => [255, 0, 0],
            CellState::End => [143, 201, 58],
            CellState::Open => [90, 90, 90],
            CellState::Closed => [192, 192, 192],
            CellState::Path => [0, 0, 255],
        }
    }

    /// State painted with `color`, if any
    pub fn from_color(color: [u8; 3]) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.color() == color)
    }

    /// Whether a search run painted this cell
    pub fn is_search_mark(self) -> bool {
        matches!(self, CellState::Open | CellState::Closed | CellState::Path)
    }

    fn glyph(self) -> char {
        match self {
            CellState::Free => '.',
            CellState::Barrier => '#',
            CellState::Start => 'S',
            CellState::End => 'E',
            CellState::Open => 'o',
            CellState::Closed => 'x',
            CellState::Path => '*',
        }
    }
}

/// Search algorithm run on the scene
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// Lattice A*, unit steps, 4-connected
    #[default]
    AStar,
    /// RRT-Connect in the continuous plane
    Rrt,
}

impl FromStr for Algorithm {
    type Err = KineplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "astar" => Ok(Algorithm::AStar),
            "rrt" => Ok(Algorithm::Rrt),
            other => Err(KineplanError::Parse(format!(
                "unknown algorithm '{}' (expected astar or rrt)",
                other
            ))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Algorithm::AStar => write!(f, "astar"),
            Algorithm::Rrt => write!(f, "rrt"),
        }
    }
}

/// Built-in scene layouts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapKind {
    /// No barriers
    #[default]
    Empty,
    /// Scattered rectangular blocks
    Misc,
    /// One wall with a single narrow gap
    Narrow1,
    /// Two walls with gaps at opposite ends
    Narrow2,
    /// Two walls splitting the board into three sections
    ThreeSection,
}

impl MapKind {
    /// Every built-in layout
    pub const ALL: [MapKind; 5] = [
        MapKind::Empty,
        MapKind::Misc,
        MapKind::Narrow1,
        MapKind::Narrow2,
        MapKind::ThreeSection,
    ];

    /// Start, end and barrier cells on a `rowcol` board; coordinates are
    /// laid out for 50 cells and scaled
    pub fn layout(self, rowcol: usize) -> (Cell, Cell, Vec<Cell>) {
        let n = rowcol.max(2);
        let scale = |v: usize| (v * n / ROWCOL).min(n - 1);
        let start = (scale(5), scale(5));
        let end = (n.saturating_sub(5).max(1).min(n - 1), n.saturating_sub(5).max(1).min(n - 1));

        let mut barriers = Vec::new();
        let mut block = |rows: std::ops::Range<usize>, cols: std::ops::Range<usize>| {
            for row in rows.start * n / ROWCOL..rows.end * n / ROWCOL {
                for col in cols.start * n / ROWCOL..cols.end * n / ROWCOL {
                    barriers.push((row, col));
                }
            }
        };
        match self {
            MapKind::Empty => {}
            MapKind::Misc => {
                block(10..20, 15..18);
                block(25..28, 5..30);
                block(30..45, 35..38);
                block(12..16, 30..40);
            }
            MapKind::Narrow1 => {
                block(25..26, 0..24);
                block(25..26, 26..50);
            }
            MapKind::Narrow2 => {
                block(16..17, 0..47);
                block(33..34, 3..50);
            }
            MapKind::ThreeSection => {
                block(0..24, 16..17);
                block(26..50, 16..17);
                block(0..24, 33..34);
                block(26..50, 33..34);
            }
        }
        barriers.retain(|&cell| cell != start && cell != end);
        (start, end, barriers)
    }
}

impl FromStr for MapKind {
    type Err = KineplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "empty" => Ok(MapKind::Empty),
            "misc" => Ok(MapKind::Misc),
            "narrow1" => Ok(MapKind::Narrow1),
            "narrow2" => Ok(MapKind::Narrow2),
            "three_section" => Ok(MapKind::ThreeSection),
            other => Err(KineplanError::Parse(format!("unknown map '{}'", other))),
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MapKind::Empty => "empty",
            MapKind::Misc => "misc",
            MapKind::Narrow1 => "narrow1",
            MapKind::Narrow2 => "narrow2",
            MapKind::ThreeSection => "three_section",
        };
        write!(f, "{}", name)
    }
}

/// Scene parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Cells per side
    pub rowcol: usize,
    /// Canvas size in pixels
    pub width: u32,
    /// RRT extension length in cells
    pub rrt_step_size: f64,
    /// Sampling resolution for RRT edges and path painting, in cells
    pub edge_resolution: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            rowcol: ROWCOL,
            width: WIDTH,
            rrt_step_size: 2.0,
            edge_resolution: 0.25,
        }
    }
}

impl SceneConfig {
    /// Check the RRT step and the sampling resolution
    pub fn validate(&self) -> Result<()> {
        require_positive("rrt_step_size", self.rrt_step_size)?;
        require_positive("edge_resolution", self.edge_resolution)
    }
}

/// One painted cell in a scene document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    /// RGB color
    pub color: [u8; 3],
    /// [row, col]
    pub position: [usize; 2],
}

/// Persistent form of a scene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Cells in row-major order
    pub grid: Vec<CellEntry>,
    /// Canvas size in pixels
    pub width: u32,
    /// Cells per side
    pub rowcol: usize,
}

/// Summary of one search run on the scene
#[derive(Clone, Debug, PartialEq)]
pub struct SearchReport {
    /// How the search ended
    pub status: SearchStatus,
    /// Path length in pixels (zero without a path)
    pub path_length: f64,
    /// Expanded cells (A*) or tree nodes (RRT)
    pub visited: usize,
    /// Frontier size when the search stopped (zero for RRT)
    pub queue_size: usize,
}

/// Square board of cells
#[derive(Clone, Debug, PartialEq)]
pub struct GridScene {
    rowcol: usize,
    width: u32,
    cells: Vec<CellState>,
    start: Option<Cell>,
    end: Option<Cell>,
    used_previously: bool,
}

impl GridScene {
    /// Empty board
    pub fn new(rowcol: usize, width: u32) -> Self {
        GridScene {
            rowcol,
            width,
            cells: vec![CellState::Free; rowcol * rowcol],
            start: None,
            end: None,
            used_previously: false,
        }
    }

    /// Board with a built-in layout
    pub fn from_map(kind: MapKind, config: &SceneConfig) -> Self {
        let mut scene = GridScene::new(config.rowcol, config.width);
        let (start, end, barriers) = kind.layout(config.rowcol);
        for (row, col) in barriers {
            scene.cells[row * scene.rowcol + col] = CellState::Barrier;
        }
        scene.set(start, CellState::Start);
        scene.set(end, CellState::End);
        scene.start = Some(start);
        scene.end = Some(end);
        info!("Loaded map '{}' ({} x {})", kind, scene.rowcol, scene.rowcol);
        scene
    }

    /// Cells per side
    pub fn rowcol(&self) -> usize {
        self.rowcol
    }

    /// Canvas size in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Side of one cell in pixels
    pub fn cell_size(&self) -> f64 {
        if self.rowcol == 0 {
            0.0
        } else {
            (self.width as usize / self.rowcol) as f64
        }
    }

    /// Start cell, once placed
    pub fn start(&self) -> Option<Cell> {
        self.start
    }

    /// End cell, once placed
    pub fn end(&self) -> Option<Cell> {
        self.end
    }

    /// State of a cell; `None` outside the board
    pub fn cell(&self, row: usize, col: usize) -> Option<CellState> {
        self.index(row, col).map(|i| self.cells[i])
    }

    /// Number of cells in `state`
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&cell| cell == state).count()
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rowcol && col < self.rowcol).then(|| row * self.rowcol + col)
    }

    fn checked_index(&self, row: usize, col: usize) -> Result<usize> {
        self.index(row, col).ok_or_else(|| {
            KineplanError::InvalidScene(format!(
                "cell ({}, {}) outside a {} x {} board",
                row, col, self.rowcol, self.rowcol
            ))
        })
    }

    fn set(&mut self, (row, col): Cell, state: CellState) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] = state;
        }
    }

    /// Left click: the first click sets the start, the second the end,
    /// later clicks add barriers. Start and end are never overwritten.
    pub fn place(&mut self, row: usize, col: usize) -> Result<CellState> {
        let i = self.checked_index(row, col)?;
        let cell = (row, col);
        if self.start.is_none() && self.end != Some(cell) {
            self.cells[i] = CellState::Start;
            self.start = Some(cell);
        } else if self.end.is_none() && self.start != Some(cell) {
            self.cells[i] = CellState::End;
            self.end = Some(cell);
        } else if self.start != Some(cell) && self.end != Some(cell) {
            self.cells[i] = CellState::Barrier;
        }
        Ok(self.cells[i])
    }

    /// Right click: clear a cell, forgetting it as start or end
    pub fn erase(&mut self, row: usize, col: usize) -> Result<()> {
        let i = self.checked_index(row, col)?;
        self.cells[i] = CellState::Free;
        if self.start == Some((row, col)) {
            self.start = None;
        } else if self.end == Some((row, col)) {
            self.end = None;
        }
        Ok(())
    }

    /// Forget the end so the next placement sets a new one
    pub fn clear_end(&mut self) {
        if let Some(end) = self.end.take() {
            self.set(end, CellState::Free);
        }
    }

    /// Clear Open, Closed and Path marks
    pub fn reset_search(&mut self) {
        for cell in &mut self.cells {
            if cell.is_search_mark() {
                *cell = CellState::Free;
            }
        }
        self.used_previously = false;
    }

    /// Clear search marks and the end; start and barriers stay
    pub fn reset_keep_start(&mut self) {
        self.reset_search();
        self.clear_end();
    }

    /// Clear everything, including start, end and barriers
    pub fn clear_all(&mut self) {
        self.cells.fill(CellState::Free);
        self.start = None;
        self.end = None;
        self.used_previously = false;
    }

    /// Non-barrier cells above, below, left and right
    pub fn neighbors(&self, row: usize, col: usize) -> Vec<Cell> {
        let mut neighbors = Vec::with_capacity(4);
        let candidates = [
            (row + 1 < self.rowcol).then(|| (row + 1, col)),
            row.checked_sub(1).map(|r| (r, col)),
            (col + 1 < self.rowcol).then(|| (row, col + 1)),
            col.checked_sub(1).map(|c| (row, c)),
        ];
        for (r, c) in candidates.into_iter().flatten() {
            if self.cell(r, c) != Some(CellState::Barrier) {
                neighbors.push((r, c));
            }
        }
        neighbors
    }

    /// Scene as a document, walking the board row by row
    pub fn to_document(&self) -> SceneDocument {
        let mut grid = Vec::with_capacity(self.cells.len());
        for row in 0..self.rowcol {
            for col in 0..self.rowcol {
                grid.push(CellEntry {
                    color: self.cells[row * self.rowcol + col].color(),
                    position: [row, col],
                });
            }
        }
        SceneDocument {
            grid,
            width: self.width,
            rowcol: self.rowcol,
        }
    }

    /// Rebuild a scene; cells missing from the document are free
    pub fn from_document(document: &SceneDocument) -> Result<Self> {
        if document.rowcol == 0 {
            return Err(KineplanError::InvalidScene("rowcol must be positive".to_string()));
        }
        let mut scene = GridScene::new(document.rowcol, document.width);
        for entry in &document.grid {
            let [row, col] = entry.position;
            let i = scene.checked_index(row, col)?;
            let state = CellState::from_color(entry.color).ok_or_else(|| {
                KineplanError::InvalidScene(format!(
                    "unknown color {:?} at ({}, {})",
                    entry.color, row, col
                ))
            })?;
            match state {
                CellState::Start if scene.start.is_some() => {
                    warn!("Ignoring extra start at ({}, {})", row, col);
                    continue;
                }
                CellState::End if scene.end.is_some() => {
                    warn!("Ignoring extra end at ({}, {})", row, col);
                    continue;
                }
                CellState::Start => scene.start = Some((row, col)),
                CellState::End => scene.end = Some((row, col)),
                _ => {}
            }
            scene.cells[i] = state;
        }
        Ok(scene)
    }

    /// Write the scene as JSON
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer(file, &self.to_document())?;
        info!("Saved scene to {}", path.as_ref().display());
        Ok(())
    }

    /// Read a scene from JSON
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let document: SceneDocument = serde_json::from_str(&data)?;
        let scene = GridScene::from_document(&document)?;
        info!("Loaded scene from {}", path.as_ref().display());
        Ok(scene)
    }

    /// Board as text, one line per row
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.rowcol * (self.rowcol + 1));
        for row in self.cells.chunks(self.rowcol.max(1)) {
            out.extend(row.iter().map(|cell| cell.glyph()));
            out.push('\n');
        }
        out
    }

    fn cell_of(&self, configuration: &RobotConfiguration) -> Option<Cell> {
        let [x, y] = configuration.base_position();
        let (row, col) = (x.round(), y.round());
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let cell = (row as usize, col as usize);
        self.index(cell.0, cell.1).map(|_| cell)
    }

    fn paint(&mut self, cells: impl IntoIterator<Item = Cell>, state: CellState) {
        for (row, col) in cells {
            if let Some(i) = self.index(row, col) {
                if matches!(self.cells[i], CellState::Free | CellState::Open | CellState::Closed) {
                    self.cells[i] = state;
                }
            }
        }
    }

    /// Plan from start to end, paint the search and report on it
    pub fn run(&mut self, algorithm: Algorithm, config: &KineplanConfig) -> Result<SearchReport> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(KineplanError::InvalidScene(
                "place a start and an end before running".to_string(),
            ));
        };
        config.scene.validate()?;
        if self.used_previously {
            self.reset_search();
        }

        let start_configuration = RobotConfiguration::planar(start.0 as f64, start.1 as f64, 0.0);
        let end_configuration = RobotConfiguration::planar(end.0 as f64, end.1 as f64, 0.0);
        info!("Running {} from {:?} to {:?}", algorithm, start, end);

        let report = match algorithm {
            Algorithm::AStar => self.run_astar(start_configuration, end_configuration, config)?,
            Algorithm::Rrt => self.run_rrt(start_configuration, end_configuration, config)?,
        };
        self.used_previously = true;
        info!(
            "{} finished: {:?}, path length {:.1}, visited {}, queue {}",
            algorithm, report.status, report.path_length, report.visited, report.queue_size
        );
        Ok(report)
    }

    fn run_astar(
        &mut self,
        start: RobotConfiguration,
        goal: RobotConfiguration,
        config: &KineplanConfig,
    ) -> Result<SearchReport> {
        let lattice = LatticeConfig {
            delta_x: 1.0,
            delta_y: 1.0,
            delta_heading: None,
            connectivity: Connectivity::Four,
            goal_tolerance: 1e-5,
            max_expansions: config.lattice.max_expansions,
        };

        let (outcome, closed, open, visited, queue_size) = {
            let mut search = GridAStar::new(&*self, start, goal, lattice)?;
            let outcome = search.plan();
            let closed: Vec<Cell> = search.closed_configurations().filter_map(|c| self.cell_of(c)).collect();
            let open: Vec<Cell> = search.open_configurations().filter_map(|c| self.cell_of(c)).collect();
            (outcome, closed, open, search.visited_count(), search.queue_size())
        };

        self.paint(closed, CellState::Closed);
        self.paint(open, CellState::Open);
        Ok(self.finish_report(outcome, visited, queue_size, config.scene.edge_resolution))
    }

    fn run_rrt(
        &mut self,
        start: RobotConfiguration,
        goal: RobotConfiguration,
        config: &KineplanConfig,
    ) -> Result<SearchReport> {
        let rrt = RrtConfig {
            step_size: config.scene.rrt_step_size,
            edge_resolution: Some(config.scene.edge_resolution),
            sample_heading: false,
            ..config.rrt.clone()
        };
        let upper = self.rowcol.saturating_sub(1) as f64;
        let bounds = Bounds {
            x: [0.0, upper],
            y: [0.0, upper],
        };

        let (outcome, explored) = {
            let mut planner = RrtConnect::new(&*self, bounds, start, goal, rrt)?;
            let outcome = planner.plan();
            let explored: Vec<Cell> = [TreeId::A, TreeId::B]
                .into_iter()
                .flat_map(|id| planner.tree(id).nodes().iter())
                .filter_map(|node| self.cell_of(&node.configuration))
                .collect();
            (outcome, explored)
        };

        let visited = explored.len();
        self.paint(explored, CellState::Closed);
        Ok(self.finish_report(outcome, visited, 0, config.scene.edge_resolution))
    }

    fn finish_report(
        &mut self,
        outcome: PlanOutcome,
        visited: usize,
        queue_size: usize,
        resolution: f64,
    ) -> SearchReport {
        let (status, path_length) = match &outcome {
            PlanOutcome::Found(path) | PlanOutcome::AlreadyAtGoal(path) => {
                let cells: Vec<Cell> = rasterize(path.waypoints(), resolution)
                    .iter()
                    .filter_map(|c| self.cell_of(c))
                    .collect();
                self.paint(cells, CellState::Path);
                (SearchStatus::Success, path.length() * self.cell_size())
            }
            PlanOutcome::NoPath => (SearchStatus::Failure, 0.0),
            PlanOutcome::Cancelled => (SearchStatus::Cancelled, 0.0),
        };
        SearchReport {
            status,
            path_length,
            visited,
            queue_size,
        }
    }
}

impl CollisionChecker for GridScene {
    fn is_colliding(&self, configuration: &RobotConfiguration) -> bool {
        match self.cell_of(configuration) {
            Some((row, col)) => self.cells[row * self.rowcol + col] == CellState::Barrier,
            None => true,
        }
    }
}

/// Points along `waypoints` spaced at most `resolution` apart, matching the
/// samples an edge check at the same resolution visits
fn rasterize(waypoints: &[RobotConfiguration], resolution: f64) -> Vec<RobotConfiguration> {
    let mut points = Vec::new();
    if let Some(first) = waypoints.first() {
        points.push(first.clone());
    }
    for segment in waypoints.windows(2) {
        let steps = (segment[0].distance(&segment[1]) / resolution).ceil().max(1.0) as usize;
        for i in 1..=steps {
            points.push(segment[0].interpolate(&segment[1], i as f64 / steps as f64));
        }
    }
    points
}
