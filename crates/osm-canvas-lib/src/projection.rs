//! Geographic to canvas projection with a screen-coordinate cache
//!
//! The projection is a plain equirectangular fit of the data bounds into the padded
//! canvas, preserving the data aspect ratio and centering along the slack axis. Results
//! are memoized per `(lat, lon, width, height)` until the bounds, padding or canvas size
//! change, at which point the whole cache is dropped.

use crate::GeoBounds;
use std::collections::HashMap;

/// A point in canvas pixels, origin top-left, y growing downwards
pub type ScreenPoint = geo::Coord<f64>;

/// Current pixel dimensions of the drawing surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Cache key: exact bit patterns of the coordinate plus the canvas size
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
struct CacheKey {
    lat_bits: u64,
    lon_bits: u64,
    width: u32,
    height: u32,
}

impl CacheKey {
    #[inline]
    fn new(lat: f64, lon: f64, size: CanvasSize) -> Self {
        Self {
            lat_bits: lat.to_bits(),
            lon_bits: lon.to_bits(),
            width: size.width,
            height: size.height,
        }
    }
}

/// Scale and offsets of the fitted data rectangle for one canvas size
#[derive(Clone, Copy, Debug)]
struct Layout {
    min_lat: f64,
    min_lon: f64,
    lat_span: f64,
    lon_span: f64,
    offset_x: f64,
    offset_y: f64,
    scaled_width: f64,
    scaled_height: f64,
    canvas_height: f64,
}

impl Layout {
    fn new(bounds: &GeoBounds, padding: f64, size: CanvasSize) -> Self {
        let (min_lat, min_lon) = bounds.origin();
        let lon_span = bounds.lon_span();
        let lat_span = bounds.lat_span();
        let data_aspect = lon_span / lat_span;

        let effective_width = (size.width as f64 - padding * 2.0).max(1.0);
        let effective_height = (size.height as f64 - padding * 2.0).max(1.0);
        let canvas_aspect = effective_width / effective_height;

        let (scaled_width, scaled_height, offset_x, offset_y) = if data_aspect > canvas_aspect {
            // Proportionally wider than the canvas: fill the width, center vertically
            let scaled_height = effective_width / data_aspect;
            (
                effective_width,
                scaled_height,
                padding,
                padding + (effective_height - scaled_height) / 2.0,
            )
        } else {
            // Fill the height, center horizontally
            let scaled_width = effective_height * data_aspect;
            (
                scaled_width,
                effective_height,
                padding + (effective_width - scaled_width) / 2.0,
                padding,
            )
        };

        Self {
            min_lat,
            min_lon,
            lat_span,
            lon_span,
            offset_x,
            offset_y,
            scaled_width,
            scaled_height,
            canvas_height: size.height as f64,
        }
    }

    #[inline]
    fn project(&self, lat: f64, lon: f64) -> ScreenPoint {
        let x = self.offset_x + ((lon - self.min_lon) / self.lon_span) * self.scaled_width;
        // Latitude grows northwards, screen y grows downwards
        let y = self.canvas_height
            - (self.offset_y + ((lat - self.min_lat) / self.lat_span) * self.scaled_height);
        ScreenPoint { x, y }
    }

    #[inline]
    fn unproject(&self, point: ScreenPoint) -> (f64, f64) {
        let lon = self.min_lon + ((point.x - self.offset_x) / self.scaled_width) * self.lon_span;
        let lat = self.min_lat
            + ((self.canvas_height - point.y - self.offset_y) / self.scaled_height) * self.lat_span;
        (lat, lon)
    }
}

/// Memoized projection for the current bounds and padding
///
/// The cache is only ever cleared wholesale; nothing is evicted individually.
#[derive(Debug, Clone)]
pub struct ProjectionCache {
    bounds: GeoBounds,
    padding: f64,
    cache: HashMap<CacheKey, ScreenPoint>,
    /// Number of times the scaling computation actually ran (cache misses)
    computations: u64,
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new(GeoBounds::empty(), 50.0)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ProjectionCache {
    pub fn new(bounds: GeoBounds, padding: f64) -> Self {
        Self {
            bounds,
            padding,
            cache: HashMap::new(),
            computations: 0,
        }
    }

    /// Project a coordinate, reusing a cached result when available
    #[inline]
    pub fn project(&mut self, lat: f64, lon: f64, size: CanvasSize) -> ScreenPoint {
        let key = CacheKey::new(lat, lon, size);
        if let Some(point) = self.cache.get(&key) {
            return *point;
        }

        let point = self.compute(lat, lon, size);
        self.cache.insert(key, point);
        point
    }

    /// Project without reading or writing the cache
    pub fn project_uncached(&self, lat: f64, lon: f64, size: CanvasSize) -> ScreenPoint {
        Layout::new(&self.bounds, self.padding, size).project(lat, lon)
    }

    /// Inverse mapping: canvas pixel back to `(lat, lon)` for the same canvas size
    pub fn unproject(&self, point: ScreenPoint, size: CanvasSize) -> (f64, f64) {
        Layout::new(&self.bounds, self.padding, size).unproject(point)
    }

    fn compute(&mut self, lat: f64, lon: f64, size: CanvasSize) -> ScreenPoint {
        self.computations += 1;
        self.project_uncached(lat, lon, size)
    }

    /// Replace the bounds; any change drops every cached coordinate
    pub fn set_bounds(&mut self, bounds: GeoBounds) {
        if self.bounds != bounds {
            self.bounds = bounds;
            self.invalidate();
        }
    }

    pub fn set_padding(&mut self, padding: f64) {
        if self.padding != padding {
            self.padding = padding;
            self.invalidate();
        }
    }

    /// Drop all cached coordinates
    pub fn invalidate(&mut self) {
        if !self.cache.is_empty() {
            tracing::debug!("Clearing {} cached screen coordinates", self.cache.len());
        }
        self.cache.clear();
    }

    #[inline]
    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    #[inline]
    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Number of cached coordinates
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Count of cache misses since construction; a probe for tests and stats
    #[inline]
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: CanvasSize = CanvasSize::new(800, 600);

    fn create_test_projection() -> ProjectionCache {
        ProjectionCache::new(GeoBounds::new(48.0, 48.01, 2.0, 2.01), 50.0)
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_corners_land_inside_padding() {
        let mut projection = create_test_projection();
        // Square data into a 700x500 effective canvas: height-limited, centered in x
        let south_west = projection.project(48.0, 2.0, SIZE);
        let north_east = projection.project(48.01, 2.01, SIZE);

        assert!(approx_eq(south_west.x, 150.0));
        assert!(approx_eq(south_west.y, 550.0));
        assert!(approx_eq(north_east.x, 650.0));
        assert!(approx_eq(north_east.y, 50.0));
    }

    #[test]
    fn test_wide_data_fills_width() {
        let mut projection = ProjectionCache::new(GeoBounds::new(0.0, 1.0, 0.0, 10.0), 50.0);
        let west = projection.project(0.5, 0.0, SIZE);
        let east = projection.project(0.5, 10.0, SIZE);
        assert!(approx_eq(west.x, 50.0));
        assert!(approx_eq(east.x, 750.0));
        // Vertically centered
        assert!(approx_eq(west.y, 300.0));
    }

    #[test]
    fn test_north_is_up() {
        let mut projection = create_test_projection();
        let south = projection.project(48.0, 2.005, SIZE);
        let north = projection.project(48.01, 2.005, SIZE);
        assert!(north.y < south.y);
    }

    #[test]
    fn test_roundtrip() {
        let projection = create_test_projection();
        for (lat, lon) in [(48.0, 2.0), (48.005, 2.001), (48.0099, 2.0073)] {
            let point = projection.project_uncached(lat, lon, SIZE);
            let (lat2, lon2) = projection.unproject(point, SIZE);
            assert!((lat - lat2).abs() < 1e-9, "lat {} vs {}", lat, lat2);
            assert!((lon - lon2).abs() < 1e-9, "lon {} vs {}", lon, lon2);
        }
    }

    #[test]
    fn test_cache_hit_does_not_recompute() {
        let mut projection = create_test_projection();
        let first = projection.project(48.004, 2.003, SIZE);
        assert_eq!(projection.computations(), 1);

        let second = projection.project(48.004, 2.003, SIZE);
        assert_eq!(projection.computations(), 1);
        assert_eq!(first.x.to_bits(), second.x.to_bits());
        assert_eq!(first.y.to_bits(), second.y.to_bits());

        // Different canvas size is a different key
        projection.project(48.004, 2.003, CanvasSize::new(1024, 768));
        assert_eq!(projection.computations(), 2);
        assert_eq!(projection.len(), 2);
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut projection = create_test_projection();
        projection.project(48.004, 2.003, SIZE);
        projection.invalidate();
        assert!(projection.is_empty());
        projection.project(48.004, 2.003, SIZE);
        assert_eq!(projection.computations(), 2);
    }

    #[test]
    fn test_bounds_change_invalidates() {
        let mut projection = create_test_projection();
        let before = projection.project(48.004, 2.003, SIZE);
        projection.set_bounds(GeoBounds::new(47.0, 49.0, 1.0, 3.0));
        assert!(projection.is_empty());
        let after = projection.project(48.004, 2.003, SIZE);
        assert_ne!(before, after);

        // Same bounds again keeps the cache
        projection.set_bounds(GeoBounds::new(47.0, 49.0, 1.0, 3.0));
        assert_eq!(projection.len(), 1);
    }

    #[test]
    fn test_degenerate_bounds_are_finite() {
        // All points on one latitude
        let mut flat = ProjectionCache::new(GeoBounds::new(48.0, 48.0, 2.0, 2.01), 50.0);
        let p = flat.project(48.0, 2.005, SIZE);
        assert!(p.x.is_finite() && p.y.is_finite());

        // Single point
        let mut single = ProjectionCache::new(GeoBounds::new(48.0, 48.0, 2.0, 2.0), 50.0);
        let p = single.project(48.0, 2.0, SIZE);
        assert!(p.x.is_finite() && p.y.is_finite());

        // Empty dataset
        let mut empty = ProjectionCache::default();
        let p = empty.project(48.0, 2.0, SIZE);
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn test_tiny_canvas_is_finite() {
        let mut projection = create_test_projection();
        let p = projection.project(48.005, 2.005, CanvasSize::new(10, 10));
        assert!(p.x.is_finite() && p.y.is_finite());
        let p = projection.project(48.005, 2.005, CanvasSize::new(0, 0));
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}
