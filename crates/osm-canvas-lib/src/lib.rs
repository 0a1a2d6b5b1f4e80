//! OSM Canvas Library - Core engine for drawing OpenStreetMap data on a 2D canvas
//!
//! This library projects parsed OSM nodes and ways onto a pixel canvas, indexes the
//! projected geometry in a uniform grid, resolves hover/selection hits, evaluates tag
//! filters and schedules redraws so that tens of thousands of primitives stay interactive.
//!
//! # Architecture
//!
//! - **[`Dataset`]**: Immutable nodes and ways of one load, with a node-id lookup
//! - **[`GeoBounds`]**: Geographic extent of all nodes, feeding the projection
//! - **[`ProjectionCache`]**: Aspect-preserving lat/lon to pixel mapping, memoized
//! - **[`SpatialGrid`]**: Uniform grid over screen space for point and segment queries
//! - **[`FilterEvaluator`]**: Tag/value visibility rules with a memoized verdict cache
//! - **[`RenderScheduler`]**: Coalescing, rate-limited redraw requests
//! - **[`MapView`]**: Owned context tying everything together for a UI layer
//!
//! # Performance Characteristics
//!
//! - **Grid build**: O(N + Σ cells crossed by way segments)
//! - **Hover query**: O(K) where K = elements registered in the 3×3 cell block
//! - **Draw**: O(visible elements), visibility memoized between filter changes

mod bounds;
mod element;
mod filter;
mod grid;
#[cfg(feature = "serde")]
mod loader;
mod projection;
mod render;
mod scheduler;
mod tags;
pub mod utils;
mod view;

use std::time::Duration;

// Public API exports
pub use bounds::{GeoBounds, compute_bounds};
pub use element::{Dataset, Element, ElementKind, ElementRef, Node, Tags, Way};
pub use filter::{FilterEvaluator, FilterState, Visibility};
pub use grid::{
    CellKey, CellTraversal, GridCell, NearbyElements, SpatialGrid, cell_of, cells_on_segment,
};
pub use projection::{CanvasSize, ProjectionCache, ScreenPoint};
pub use render::{Color, DrawStats, FrameInput, Style, Surface, draw_frame};
pub use scheduler::{RenderScheduler, Throttle};
pub use tags::{TagCatalog, TagCount, TagValues};
pub use view::{LoadPhase, MapView};

/// Tunables for the engine
///
/// Everything here is a throughput or layout knob; none of it changes which elements
/// are visible or hit, as long as `cell_size` stays larger than the hit thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Side of one grid cell in screen pixels
    pub cell_size: f64,
    /// Blank margin kept around the projected data on every side, in pixels
    pub padding: f64,
    /// Minimum time between two executed draws
    pub min_redraw_interval: Duration,
    /// Leading-edge throttle window for pointer-move hover recomputation
    pub hover_throttle: Duration,
    /// Nodes drawn per batch
    pub node_batch_size: usize,
    /// Nodes scanned per batch while computing bounds
    pub bounds_batch_size: usize,
    /// How way segments are rasterized into grid cells
    pub traversal: CellTraversal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell_size: 50.0,
            padding: 50.0,
            min_redraw_interval: Duration::from_millis(16),
            hover_throttle: Duration::from_millis(30),
            node_batch_size: 1000,
            bounds_batch_size: 10_000,
            traversal: CellTraversal::Sampled,
        }
    }
}

/// Error types for the library
///
/// Only structurally invalid input payloads are errors. Data integrity gaps inside a
/// well-formed payload (dangling node references, degenerate extents) are absorbed.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[cfg(feature = "serde")]
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Config {
    /// Smallest usable grid cell: hits within the largest threshold must stay inside the
    /// 3×3 query block
    pub const MIN_CELL_SIZE: f64 = Style::MAX_HIT_DISTANCE;

    /// Copy with out-of-range values replaced
    ///
    /// A non-finite or non-positive cell size falls back to the default, a positive one
    /// below [`Config::MIN_CELL_SIZE`] is raised to it. A non-finite or negative padding
    /// becomes the default.
    pub fn validated(mut self) -> Self {
        let defaults = Config::default();
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            tracing::warn!(
                "Invalid cell size {}, using {}",
                self.cell_size,
                defaults.cell_size
            );
            self.cell_size = defaults.cell_size;
        } else if self.cell_size < Self::MIN_CELL_SIZE {
            tracing::warn!(
                "Cell size {} is below the largest hit distance, using {}",
                self.cell_size,
                Self::MIN_CELL_SIZE
            );
            self.cell_size = Self::MIN_CELL_SIZE;
        }
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            tracing::warn!("Invalid padding {}, using {}", self.padding, defaults.padding);
            self.padding = defaults.padding;
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
