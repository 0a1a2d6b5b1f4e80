//! Application module
//!
//! This module provides the main application structure:
//! - Full-window map canvas drawn by the engine
//! - Toggleable sidebar with tabs (Data, Style and Filters)
//! - Drag-and-drop and file picker support for OSM JSON files
//! - Style and last opened file persisted between runs

pub(crate) mod settings;
mod state;
mod surface;
mod ui_panels;

use crate::app::settings::Settings;
use crate::app::state::{AppState, SidebarTab};
use crate::app::surface::ShapeSurface;
use eframe::egui;
use osm_canvas_lib::{CanvasSize, Style};
use std::path::PathBuf;

/// Persisted settings (lightweight, no element data)
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    style: Style,
    sidebar_open: bool,
    active_tab: String,
    /// File that was open (will need to be reloaded)
    last_file: Option<String>,
}

/// Main application structure
pub struct OsmCanvasApp {
    /// Application state (view, UI settings, etc.)
    state: AppState,

    /// Last frame emitted by the engine, replayed until the next one
    surface: ShapeSurface,
}

impl OsmCanvasApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let cli_args = Settings::from_cli();

        // Try to restore persisted settings (not element data)
        let mut state = if !cli_args.ignore_persisted {
            if let Some(storage) = cc.storage {
                Self::load_persisted_settings(storage, &cli_args)
            } else {
                AppState::new(&cli_args)
            }
        } else {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
            AppState::new(&cli_args)
        };

        // A file given on the command line takes priority
        if let Some(file) = &cli_args.file {
            state.queue_file(file.clone());
        }

        tracing::info!(
            "Initialized{}",
            state
                .file_loader
                .pending_file
                .as_ref()
                .map(|path| format!(", will load {}", path.display()))
                .unwrap_or_default()
        );

        Self {
            state,
            surface: ShapeSurface::default(),
        }
    }

    /// Load persisted settings from storage
    fn load_persisted_settings(storage: &dyn eframe::Storage, cli_args: &Settings) -> AppState {
        if let Some(json) = storage.get_string("persisted_settings")
            && !json.is_empty()
            && let Ok(settings) = serde_json::from_str::<PersistedSettings>(&json)
        {
            tracing::info!("Restored settings");
            return Self::state_from_persisted_settings(settings, cli_args);
        }

        tracing::info!("No persisted settings found, starting fresh");
        AppState::new(cli_args)
    }

    /// Create AppState from persisted settings
    fn state_from_persisted_settings(settings: PersistedSettings, cli_args: &Settings) -> AppState {
        let mut state = AppState::new(cli_args);
        state.view.set_style(settings.style);
        state.ui_settings.sidebar_open = settings.sidebar_open;
        state.ui_settings.active_tab = SidebarTab::from_name(&settings.active_tab);

        if let Some(path) = settings.last_file.map(PathBuf::from)
            && path.exists()
        {
            state.queue_file(path);
        }
        state
    }

    /// The map canvas filling the central panel
    fn map_canvas(&mut self, ui: &mut egui::Ui) {
        profiling::scope!("map_canvas");

        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click());
        let rect = response.rect;
        let size = CanvasSize::new(rect.width().max(0.0) as u32, rect.height().max(0.0) as u32);
        self.state.view.set_canvas_size(size);
        self.surface.set_size(size);

        painter.rect_filled(rect, 0.0, egui::Color32::WHITE);

        let view = &mut self.state.view;
        if view.is_ready() {
            let now = instant::Instant::now();
            match response.hover_pos() {
                Some(pos) => {
                    let local = pos - rect.min;
                    view.pointer_moved(local.x as f64, local.y as f64, now);
                }
                None => {
                    view.pointer_left();
                }
            }

            if response.clicked()
                && let Some(pos) = response.interact_pointer_pos()
            {
                let local = pos - rect.min;
                view.click_at(local.x as f64, local.y as f64);
            }

            if view.hover_cursor() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }

            let draw_start = instant::Instant::now();
            if let Some(stats) = view.frame(&mut self.surface, draw_start) {
                self.state.record_draw(stats, draw_start.elapsed());
            }
            if self.state.view.needs_redraw() {
                let wait = self.state.view.time_until_redraw(instant::Instant::now());
                ui.ctx().request_repaint_after(wait);
            }
        }

        self.surface.paint(&painter, rect.min);

        if self.state.view.dataset().is_empty()
            && !self.state.file_loader.is_busy(&self.state.view)
        {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "📂 Open or drop an OSM JSON file",
                egui::FontId::proportional(20.0),
                egui::Color32::from_black_alpha(140),
            );
        }

        ui_panels::sidebar_toggle_button(ui, &mut self.state);
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl eframe::App for OsmCanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle drag and drop
        ui_panels::handle_drag_and_drop(ctx, &mut self.state);

        // Handle file picker
        ui_panels::show_file_picker(&mut self.state);

        // Render the main sidebar
        ui_panels::render_sidebar(ctx, &mut self.state);

        // Central panel: map canvas (full window)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.map_canvas(ui));

        // Read the queued file, then run one load phase per frame so the UI stays responsive
        if self.state.file_loader.pending_file.is_some() {
            self.state.process_pending_file();
            ctx.request_repaint();
        } else if self.state.advance_load(self.state.view.canvas_size()) {
            ctx.request_repaint();
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let last_file = self
            .state
            .file_loader
            .pending_file
            .as_ref()
            .or(self.state.file_loader.loaded_file.as_ref())
            .map(|path| path.to_string_lossy().to_string());

        let settings = PersistedSettings {
            style: self.state.view.style().clone(),
            sidebar_open: self.state.ui_settings.sidebar_open,
            active_tab: self.state.ui_settings.active_tab.name().to_owned(),
            last_file,
        };

        if let Ok(json) = serde_json::to_string(&settings) {
            storage.set_string("persisted_settings", json);
            tracing::debug!("Saved settings on exit");
        }
    }
}
