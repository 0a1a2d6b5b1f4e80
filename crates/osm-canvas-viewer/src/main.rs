#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

// The binary uses the library, not duplicate modules
use osm_canvas_viewer::{APP_NAME, OsmCanvasApp, logging};

fn main() -> eframe::Result {
    logging::setup_logging();
    tracing::info!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(APP_NAME)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(|cc| Ok(Box::new(OsmCanvasApp::new(cc)))),
    )
}
