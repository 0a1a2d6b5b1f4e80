//! OSM Canvas Viewer - Application Library
//!
//! Desktop front end for `osm-canvas-lib`: it owns a `MapView`, feeds it pointer input
//! and paints the primitives it emits with egui.

mod app;
pub mod logging;

pub use app::OsmCanvasApp;

/// Window title and storage key namespace
pub const APP_NAME: &str = "OSM Canvas Viewer";
