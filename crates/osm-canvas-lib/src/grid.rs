//! Uniform grid spatial index over projected screen space
//!
//! Nodes live in the single cell holding their projected point; ways are registered in
//! every cell one of their segments passes through. The grid is never updated in place:
//! any change to the dataset or canvas geometry builds a fresh one.

use crate::{CanvasSize, Dataset, ProjectionCache, ScreenPoint};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Integer cell coordinates `(gx, gy)`
pub type CellKey = (i32, i32);

/// Strategy for finding the cells a segment crosses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellTraversal {
    /// Endpoints plus samples every half cell along the dominant axis
    #[default]
    Sampled,
    /// Exact grid-line walk (Amanatides–Woo)
    Exact,
}

/// Contents of one cell, as indices into the dataset's node and way lists
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridCell {
    pub nodes: Vec<usize>,
    pub ways: Vec<usize>,
}

/// Broad-phase candidates around a point, as dataset indices in dataset order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NearbyElements {
    pub nodes: Vec<usize>,
    pub ways: Vec<usize>,
}

impl NearbyElements {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty()
    }
}

/// The grid itself
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    /// Canvas size the grid was built for
    size: CanvasSize,
    cells: HashMap<CellKey, GridCell>,
    /// Sum of way registrations over all cells
    way_entries: usize,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(50.0)
    }
}

/// Cell containing a screen point
#[inline]
pub fn cell_of(point: ScreenPoint, cell_size: f64) -> CellKey {
    (
        (point.x / cell_size).floor() as i32,
        (point.y / cell_size).floor() as i32,
    )
}

/// Cells touched by the segment `a`–`b`, start cell first, without duplicates
pub fn cells_on_segment(
    a: ScreenPoint,
    b: ScreenPoint,
    cell_size: f64,
    traversal: CellTraversal,
) -> SmallVec<[CellKey; 8]> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        let (start, end) = (cell_of(a, cell_size), cell_of(b, cell_size));
        let mut cells = SmallVec::new();
        cells.push(start);
        if end != start {
            cells.push(end);
        }
        return cells;
    }
    match traversal {
        CellTraversal::Sampled => sampled_cells(a, b, cell_size),
        CellTraversal::Exact => exact_cells(a, b, cell_size),
    }
}

fn sampled_cells(a: ScreenPoint, b: ScreenPoint, cell_size: f64) -> SmallVec<[CellKey; 8]> {
    let start = cell_of(a, cell_size);
    let end = cell_of(b, cell_size);

    let mut cells = SmallVec::new();
    cells.push(start);
    if end != start {
        cells.push(end);
    }

    // Neighbouring or identical cells cannot hide anything in between
    if (start.0 - end.0).abs() <= 1 && (start.1 - end.1).abs() <= 1 {
        return cells;
    }

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let steps = dx.abs().max(dy.abs()) / (cell_size / 2.0);

    // Samples move monotonically, so a cell can only repeat back-to-back
    let mut last = start;
    let mut i = 1.0;
    while i < steps {
        let t = i / steps;
        let cell = cell_of(
            ScreenPoint {
                x: a.x + dx * t,
                y: a.y + dy * t,
            },
            cell_size,
        );
        if cell != last && cell != start && cell != end {
            cells.push(cell);
        }
        last = cell;
        i += 1.0;
    }

    cells
}

fn exact_cells(a: ScreenPoint, b: ScreenPoint, cell_size: f64) -> SmallVec<[CellKey; 8]> {
    let start = cell_of(a, cell_size);
    let end = cell_of(b, cell_size);

    let mut cells = SmallVec::new();
    cells.push(start);
    if start == end {
        return cells;
    }

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let step_x = dx.signum() as i32;
    let step_y = dy.signum() as i32;

    let boundary = |cell: i32, step: i32| {
        if step > 0 {
            (cell + 1) as f64 * cell_size
        } else {
            cell as f64 * cell_size
        }
    };
    let mut t_max_x = if dx != 0.0 {
        (boundary(start.0, step_x) - a.x) / dx
    } else {
        f64::INFINITY
    };
    let mut t_max_y = if dy != 0.0 {
        (boundary(start.1, step_y) - a.y) / dy
    } else {
        f64::INFINITY
    };
    let t_delta_x = if dx != 0.0 { cell_size / dx.abs() } else { f64::INFINITY };
    let t_delta_y = if dy != 0.0 { cell_size / dy.abs() } else { f64::INFINITY };

    // Each step crosses exactly one grid line, so the walk is bounded by the manhattan
    // distance between the end cells
    let max_steps =
        (start.0 as i64 - end.0 as i64).abs() + (start.1 as i64 - end.1 as i64).abs();
    let (mut cx, mut cy) = start;
    for _ in 0..max_steps {
        if t_max_x < t_max_y {
            cx += step_x;
            t_max_x += t_delta_x;
        } else {
            cy += step_y;
            t_max_y += t_delta_y;
        }
        cells.push((cx, cy));
        if (cx, cy) == end {
            break;
        }
    }

    if cells.last() != Some(&end) {
        cells.push(end);
    }
    cells
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialGrid {
    /// An empty grid; every query returns no candidates
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            size: CanvasSize::default(),
            cells: HashMap::new(),
            way_entries: 0,
        }
    }

    /// Index all nodes and renderable ways for the given canvas size
    pub fn build(
        dataset: &Dataset,
        projection: &mut ProjectionCache,
        size: CanvasSize,
        cell_size: f64,
        traversal: CellTraversal,
    ) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("grid::build");

        let start = instant::Instant::now();
        let mut grid = Self::new(cell_size);
        grid.size = size;

        for (index, node) in dataset.nodes().iter().enumerate() {
            let point = projection.project(node.lat, node.lon, size);
            grid.cells
                .entry(cell_of(point, cell_size))
                .or_default()
                .nodes
                .push(index);
        }

        let mut seen: HashSet<CellKey> = HashSet::new();
        for (index, way) in dataset.ways().iter().enumerate() {
            if !dataset.is_renderable(way) {
                continue;
            }

            seen.clear();
            for (a, b) in dataset.way_segments(way) {
                let pa = projection.project(a.lat, a.lon, size);
                let pb = projection.project(b.lat, b.lon, size);
                for cell in cells_on_segment(pa, pb, cell_size, traversal) {
                    if seen.insert(cell) {
                        grid.cells.entry(cell).or_default().ways.push(index);
                        grid.way_entries += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "Built spatial grid for {}x{}: {} nodes, {} ways, {} cells, {} way entries in {:?}",
            size.width,
            size.height,
            dataset.nodes().len(),
            dataset.ways().len(),
            grid.cells.len(),
            grid.way_entries,
            start.elapsed()
        );

        grid
    }

    /// Union of the 3×3 block of cells around the cell holding `(x, y)`
    ///
    /// A broad-phase filter: it may include elements beyond the hit threshold but never
    /// misses one within it while the threshold stays below one cell.
    pub fn query_near(&self, x: f64, y: f64) -> NearbyElements {
        let mut nearby = NearbyElements::default();
        if self.cells.is_empty() {
            return nearby;
        }

        let (gx, gy) = cell_of(ScreenPoint { x, y }, self.cell_size);
        for i in -1..=1 {
            for j in -1..=1 {
                let key = (gx.saturating_add(i), gy.saturating_add(j));
                if let Some(cell) = self.cells.get(&key) {
                    nearby.nodes.extend_from_slice(&cell.nodes);
                    nearby.ways.extend_from_slice(&cell.ways);
                }
            }
        }

        // Dataset order keeps hit resolution reproducible
        nearby.nodes.sort_unstable();
        nearby.nodes.dedup();
        nearby.ways.sort_unstable();
        nearby.ways.dedup();
        nearby
    }

    #[inline]
    pub fn cell_of(&self, point: ScreenPoint) -> CellKey {
        cell_of(point, self.cell_size)
    }

    #[inline]
    pub fn cell(&self, key: CellKey) -> Option<&GridCell> {
        self.cells.get(&key)
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Canvas size this grid was built for
    #[inline]
    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Number of non-empty cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn way_entries(&self) -> usize {
        self.way_entries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
