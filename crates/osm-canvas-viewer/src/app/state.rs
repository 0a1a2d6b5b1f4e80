//! Application state management
//!
//! This module owns the map view together with the UI settings, the file
//! loading queue and the statistics shown in the sidebar.

use crate::app::settings::Settings;
use osm_canvas_lib::{CanvasSize, Dataset, DrawStats, LoadPhase, MapView};
use std::path::PathBuf;

/// Main application state
pub struct AppState {
    /// Engine context: dataset, caches, interaction and style
    pub view: MapView,

    /// Current UI settings
    pub ui_settings: UiSettings,

    /// File loading state
    pub file_loader: FileLoader,

    /// Statistics about loaded data
    pub stats: Stats,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone)]
pub struct UiSettings {
    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Current active tab in sidebar
    pub active_tab: SidebarTab,
}

/// Sidebar tabs
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarTab {
    Data,
    Style,
    Filters,
}

impl SidebarTab {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::Style => "Style",
            Self::Filters => "Filters",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "Style" => Self::Style,
            "Filters" => Self::Filters,
            _ => Self::Data,
        }
    }
}

/// File loading state and operations
pub struct FileLoader {
    /// File waiting to be read
    pub pending_file: Option<PathBuf>,

    /// File whose dataset is currently in the view (possibly still going through load phases)
    pub loaded_file: Option<PathBuf>,

    /// Load errors
    pub errors: Vec<(PathBuf, String)>,

    /// Show file picker dialog
    pub show_picker: bool,
}

/// Statistics about loaded data
#[derive(Default)]
pub struct Stats {
    pub node_count: usize,
    pub way_count: usize,

    /// Distinct tag keys in the dataset
    pub tag_count: usize,

    /// Node extent with x = longitude and y = latitude, `None` without nodes
    pub extent: Option<geo::Rect<f64>>,

    /// Primitives emitted by the last executed frame
    pub last_draw: DrawStats,

    /// Duration of the last executed frame in milliseconds
    pub last_draw_time_ms: f64,
}

impl AppState {
    /// Create new application state from CLI settings
    pub fn new(settings: &Settings) -> Self {
        let mut view = MapView::new(settings.to_config());
        view.set_style(settings.to_style());

        Self {
            view,
            ui_settings: UiSettings::default(),
            file_loader: FileLoader {
                pending_file: settings.file.clone(),
                loaded_file: None,
                errors: Vec::new(),
                show_picker: false,
            },
            stats: Stats::default(),
        }
    }

    /// Read a JSON file and start bringing it on screen
    ///
    /// Parsing happens here in one go; the derived structures are built over the
    /// following frames by [`AppState::advance_load`].
    pub fn load_file(&mut self, path: PathBuf) -> Result<(), String> {
        profiling::scope!("load_file");

        let start = instant::Instant::now();
        match Dataset::from_file(&path) {
            Ok(dataset) => {
                tracing::info!("Read {} in {:?}", path.display(), start.elapsed());
                self.view.begin_load(dataset);
                self.file_loader.loaded_file = Some(path);
                self.stats = Stats::default();
                Ok(())
            }
            Err(e) => {
                let message = format!("Failed to load: {}", e);
                tracing::warn!("{}: {}", path.display(), message);
                self.file_loader.errors.push((path, message.clone()));
                Err(message)
            }
        }
    }

    /// Load the queued file, if any
    pub fn process_pending_file(&mut self) {
        if let Some(path) = self.file_loader.pending_file.take() {
            let _ = self.load_file(path);
        }
    }

    /// Queue a file, replacing any file queued before it
    pub fn queue_file(&mut self, path: PathBuf) {
        tracing::debug!("Queued {}", path.display());
        self.file_loader.pending_file = Some(path);
    }

    /// Run one load phase; returns whether more phases remain
    pub fn advance_load(&mut self, size: CanvasSize) -> bool {
        if let Some(phase) = self.view.advance_load(size)
            && phase == LoadPhase::Filters
        {
            self.update_stats();
        }
        !self.view.is_ready()
    }

    /// Update statistics from the dataset
    pub fn update_stats(&mut self) {
        let dataset = self.view.dataset();
        self.stats.node_count = dataset.nodes().len();
        self.stats.way_count = dataset.ways().len();
        self.stats.tag_count = self.view.tag_catalog().len();
        self.stats.extent = self.view.bounds().to_rect();
    }

    /// Record what a frame drew and how long it took
    pub fn record_draw(&mut self, stats: DrawStats, elapsed: std::time::Duration) {
        self.stats.last_draw = stats;
        self.stats.last_draw_time_ms = elapsed.as_secs_f64() * 1000.0;
    }

    /// Replace the view with an empty one, keeping style and filters
    pub fn clear_data(&mut self) {
        self.view.begin_load(Dataset::default());
        self.file_loader.loaded_file = None;
        self.file_loader.errors.clear();
        self.stats = Stats::default();
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            active_tab: SidebarTab::Data,
        }
    }
}

impl FileLoader {
    /// Check if a file is waiting or the view is still going through load phases
    pub fn is_busy(&self, view: &MapView) -> bool {
        self.pending_file.is_some() || !view.is_ready()
    }

    /// Get load progress (0.0 to 1.0) from the phase about to run
    pub fn progress(view: &MapView) -> f32 {
        match view.load_phase() {
            LoadPhase::Bounds => 0.0,
            LoadPhase::Filters => 0.25,
            LoadPhase::Index => 0.5,
            LoadPhase::FirstDraw => 0.75,
            LoadPhase::Ready => 1.0,
        }
    }
}

/// Helper to format numbers with comma separators
pub fn format_number_with_commas(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
