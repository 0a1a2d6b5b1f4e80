//! Geographic extent of a node set

use crate::Node;
use geo::{Coord, Rect};

/// Latitude/longitude bounding box in degrees
///
/// An empty box is represented explicitly with `min > max` (infinite sentinels) rather
/// than silently collapsing to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeoBounds {
    /// The empty marker: every min is `+inf`, every max is `-inf`
    pub const fn empty() -> Self {
        Self {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        }
    }

    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }

    /// Grow to include one coordinate
    #[inline]
    pub fn expand(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Latitude span, with zero, negative or non-finite spans replaced by `1.0`
    #[inline]
    pub fn lat_span(&self) -> f64 {
        usable_span(self.max_lat - self.min_lat)
    }

    /// Longitude span, with zero, negative or non-finite spans replaced by `1.0`
    #[inline]
    pub fn lon_span(&self) -> f64 {
        usable_span(self.max_lon - self.min_lon)
    }

    /// Lower-left corner used as the projection origin (`0.0` for the empty box)
    #[inline]
    pub fn origin(&self) -> (f64, f64) {
        let lat = if self.min_lat.is_finite() { self.min_lat } else { 0.0 };
        let lon = if self.min_lon.is_finite() { self.min_lon } else { 0.0 };
        (lat, lon)
    }

    /// As a `geo::Rect` with x = longitude and y = latitude, `None` when empty
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        if self.is_empty() {
            return None;
        }
        Some(Rect::new(
            Coord {
                x: self.min_lon,
                y: self.min_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.max_lat,
            },
        ))
    }
}

#[inline]
fn usable_span(span: f64) -> f64 {
    if span.is_finite() && span > 0.0 {
        span
    } else {
        1.0
    }
}

/// Scan all nodes once for their extent
///
/// Nodes are visited in chunks of `batch_size`; chunking only bounds the working set of
/// one pass and has no effect on the result.
pub fn compute_bounds(nodes: &[Node], batch_size: usize) -> GeoBounds {
    #[cfg(feature = "profiling")]
    profiling::scope!("bounds::compute_bounds");

    let start = instant::Instant::now();
    let mut bounds = GeoBounds::empty();

    for chunk in nodes.chunks(batch_size.max(1)) {
        for node in chunk {
            bounds.expand(node.lat, node.lon);
        }
    }

    tracing::debug!(
        "Computed bounds of {} nodes in {:?}: lat [{}, {}], lon [{}, {}]",
        nodes.len(),
        start.elapsed(),
        bounds.min_lat,
        bounds.max_lat,
        bounds.min_lon,
        bounds.max_lon
    );

    bounds
}
