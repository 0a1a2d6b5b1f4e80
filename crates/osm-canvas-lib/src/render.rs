//! Frame drawing against an abstract surface
//!
//! The engine never touches pixels itself. A UI layer implements [`Surface`] on top of
//! whatever canvas it has and [`draw_frame`] emits primitives into it: ways first, then
//! nodes in batches, then labels for named nodes.

use crate::utils::parse_hex_rgba;
use crate::{CanvasSize, Dataset, ElementRef, ProjectionCache, ScreenPoint, Visibility};
use std::fmt;

/// 8-bit RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    /// Fill/stroke of the selected element
    pub const SELECTED: Color = Color::rgb(0, 255, 0);
    /// Fill/stroke of the hovered element
    pub const HOVERED: Color = Color::rgb(0, 170, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        parse_hex_rgba(hex).map(|[r, g, b, a]| Self { r, g, b, a })
    }

    /// `#rrggbb`, or `#rrggbbaa` when not opaque
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// User-adjustable drawing parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Style {
    /// Node radius in pixels
    pub node_size: f64,
    pub node_color: Color,
    pub way_color: Color,
    /// Way stroke width in pixels
    pub way_width: f64,
    /// Draw name labels for every named node, not only the selected one
    pub show_labels: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            node_size: 2.0,
            node_color: Color::RED,
            way_color: Color::BLUE,
            way_width: 2.0,
            show_labels: true,
        }
    }
}

impl Style {
    pub const MIN_NODE_SIZE: f64 = 1.0;
    pub const MAX_NODE_SIZE: f64 = 10.0;
    pub const MIN_WAY_WIDTH: f64 = 1.0;
    pub const MAX_WAY_WIDTH: f64 = 10.0;

    /// Size multiplier of the selected element
    pub const SELECTED_SCALE: f64 = 1.5;
    /// Size multiplier of the hovered element
    pub const HOVERED_SCALE: f64 = 1.2;

    pub const LABEL_SIZE: f64 = 12.0;
    /// Gap between the top of a node and its label anchor
    pub const LABEL_GAP: f64 = 5.0;
    pub const NODE_HIT_SCALE: f64 = 1.5;
    pub const WAY_HIT_SCALE: f64 = 2.0;
    /// Largest hit threshold any clamped style can produce
    pub const MAX_HIT_DISTANCE: f64 = {
        let node = Self::MAX_NODE_SIZE * Self::NODE_HIT_SCALE;
        let way = Self::MAX_WAY_WIDTH * Self::WAY_HIT_SCALE;
        if node > way { node } else { way }
    };

    /// Sets the node size, clamped to the allowed range; non-finite input is ignored
    pub fn set_node_size(&mut self, size: f64) {
        if size.is_finite() {
            self.node_size = size.clamp(Self::MIN_NODE_SIZE, Self::MAX_NODE_SIZE);
        }
    }

    /// Sets the way width, clamped to the allowed range; non-finite input is ignored
    pub fn set_way_width(&mut self, width: f64) {
        if width.is_finite() {
            self.way_width = width.clamp(Self::MIN_WAY_WIDTH, Self::MAX_WAY_WIDTH);
        }
    }

    /// Hover radius around a node's center
    #[inline]
    pub fn node_hit_radius(&self) -> f64 {
        self.node_size * Self::NODE_HIT_SCALE
    }

    /// Hover distance from a way's segments
    #[inline]
    pub fn way_hit_distance(&self) -> f64 {
        self.way_width * Self::WAY_HIT_SCALE
    }
}

/// A 2D canvas the engine can draw into
pub trait Surface {
    /// Current pixel dimensions
    fn size(&self) -> CanvasSize;

    /// Erase everything drawn so far
    fn clear(&mut self);

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Color);

    /// Open polyline through `points`, at least two of them
    fn stroke_polyline(&mut self, points: &[ScreenPoint], width: f64, color: Color);

    /// Text horizontally centered on `anchor`, baseline at `anchor.y`
    fn fill_text(&mut self, anchor: ScreenPoint, text: &str, size: f64, color: Color);
}

/// Everything a frame depends on besides the surface and the projection
pub struct FrameInput<'a> {
    pub dataset: &'a Dataset,
    pub visibility: &'a Visibility,
    pub style: &'a Style,
    pub hovered: Option<ElementRef>,
    pub selected: Option<ElementRef>,
    pub node_batch_size: usize,
}

/// What one frame put on the surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub ways: usize,
    pub nodes: usize,
    pub labels: usize,
}

/// Color and scale for an element given the interaction state; selection wins
#[inline]
fn emphasis(element: ElementRef, input: &FrameInput<'_>, base: Color) -> (Color, f64) {
    if input.selected == Some(element) {
        (Color::SELECTED, Style::SELECTED_SCALE)
    } else if input.hovered == Some(element) {
        (Color::HOVERED, Style::HOVERED_SCALE)
    } else {
        (base, 1.0)
    }
}

/// Draw one complete frame
///
/// The surface is cleared first. Ways with fewer than two present vertices are skipped;
/// dangling references inside a way are bridged over.
pub fn draw_frame<S: Surface + ?Sized>(
    surface: &mut S,
    projection: &mut ProjectionCache,
    input: &FrameInput<'_>,
) -> DrawStats {
    #[cfg(feature = "profiling")]
    profiling::scope!("render::draw_frame");

    let size = surface.size();
    let style = input.style;
    let dataset = input.dataset;
    let mut stats = DrawStats::default();

    surface.clear();

    let mut points: Vec<ScreenPoint> = Vec::new();
    for (index, way) in dataset.ways().iter().enumerate() {
        if !input.visibility.way(index) {
            continue;
        }

        points.clear();
        points.extend(
            dataset
                .way_vertices(way)
                .map(|node| projection.project(node.lat, node.lon, size)),
        );
        if points.len() < 2 {
            continue;
        }

        let (color, scale) = emphasis(way.reference(), input, style.way_color);
        surface.stroke_polyline(&points, style.way_width * scale, color);
        stats.ways += 1;
    }

    let visible: Vec<usize> = (0..dataset.nodes().len())
        .filter(|&index| input.visibility.node(index))
        .collect();
    for batch in visible.chunks(input.node_batch_size.max(1)) {
        for &index in batch {
            let node = &dataset.nodes()[index];
            let center = projection.project(node.lat, node.lon, size);
            let reference = node.reference();
            let (color, scale) = emphasis(reference, input, style.node_color);
            surface.fill_circle(center, style.node_size * scale, color);
            stats.nodes += 1;

            let labelled = style.show_labels || input.selected == Some(reference);
            if let Some(name) = node.name().filter(|name| labelled && !name.is_empty()) {
                let anchor = ScreenPoint {
                    x: center.x,
                    y: center.y - style.node_size - Style::LABEL_GAP,
                };
                surface.fill_text(anchor, name, Style::LABEL_SIZE, Color::BLACK);
                stats.labels += 1;
            }
        }
    }

    stats
}
