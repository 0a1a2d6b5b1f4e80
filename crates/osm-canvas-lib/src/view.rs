//! The owned map context
//!
//! [`MapView`] holds one dataset and every structure derived from it, together with the
//! interaction and styling state a UI mutates. A UI layer owns one `MapView`, forwards
//! input events to it and asks it to draw into a [`Surface`] once per display tick.

use crate::hit_test::HitTester;
use crate::render::{DrawStats, FrameInput};
use crate::{
    CanvasSize, Color, Config, Dataset, Element, ElementRef, FilterEvaluator, FilterState,
    GeoBounds, NearbyElements, ProjectionCache, RenderScheduler, ScreenPoint, SpatialGrid,
    Style, Surface, TagCatalog, TagValues, Throttle, compute_bounds, draw_frame,
};
use instant::Instant;
use std::fmt;

/// Steps of bringing a freshly loaded dataset on screen, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadPhase {
    /// Scan node extents and configure the projection
    Bounds,
    /// Build the tag catalog and evaluate filters
    Filters,
    /// Build the spatial grid for the current canvas size
    Index,
    /// Schedule the first frame
    FirstDraw,
    /// Nothing left to do
    Ready,
}

impl LoadPhase {
    fn next(self) -> Self {
        match self {
            LoadPhase::Bounds => LoadPhase::Filters,
            LoadPhase::Filters => LoadPhase::Index,
            LoadPhase::Index => LoadPhase::FirstDraw,
            LoadPhase::FirstDraw | LoadPhase::Ready => LoadPhase::Ready,
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadPhase::Bounds => "Calculating bounds",
            LoadPhase::Filters => "Building filters",
            LoadPhase::Index => "Building spatial index",
            LoadPhase::FirstDraw => "Drawing map",
            LoadPhase::Ready => "Ready",
        };
        f.write_str(name)
    }
}

/// Dataset, derived caches, interaction state and style for one canvas
pub struct MapView {
    config: Config,
    dataset: Dataset,
    bounds: GeoBounds,
    projection: ProjectionCache,
    grid: SpatialGrid,
    filter: FilterEvaluator,
    /// Memoized tag catalog, dropped on reload and reset
    catalog: Option<TagCatalog>,
    style: Style,
    hovered: Option<ElementRef>,
    selected: Option<ElementRef>,
    scheduler: RenderScheduler,
    hover_throttle: Throttle,
    /// Canvas size the projection cache and grid currently describe
    canvas_size: CanvasSize,
    phase: LoadPhase,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapView {
    /// A view with no data; `config` is passed through [`Config::validated`]
    pub fn new(config: Config) -> Self {
        let config = config.validated();
        Self {
            projection: ProjectionCache::new(GeoBounds::empty(), config.padding),
            grid: SpatialGrid::new(config.cell_size),
            scheduler: RenderScheduler::new(config.min_redraw_interval),
            hover_throttle: Throttle::new(config.hover_throttle),
            dataset: Dataset::default(),
            bounds: GeoBounds::empty(),
            filter: FilterEvaluator::new(),
            catalog: None,
            style: Style::default(),
            hovered: None,
            selected: None,
            canvas_size: CanvasSize::default(),
            phase: LoadPhase::Ready,
            config,
        }
    }

    // ---- Loading ----

    /// Replace the dataset and queue the load phases
    ///
    /// Derived state is dropped immediately: until [`LoadPhase::Index`] has run, hit
    /// tests see an empty grid. Filter rules and style survive the reload, the hover and
    /// selection do not.
    pub fn begin_load(&mut self, dataset: Dataset) {
        tracing::info!(
            "Loading dataset with {} nodes and {} ways",
            dataset.nodes().len(),
            dataset.ways().len()
        );
        self.dataset = dataset;
        self.bounds = GeoBounds::empty();
        self.projection.set_bounds(GeoBounds::empty());
        self.projection.invalidate();
        self.grid = SpatialGrid::new(self.config.cell_size);
        self.filter.invalidate();
        self.catalog = None;
        self.hovered = None;
        self.selected = None;
        self.hover_throttle.reset();
        self.phase = LoadPhase::Bounds;
    }

    /// Run the next pending load phase for a canvas of `size`
    ///
    /// Returns the phase that ran, or `None` once loading is complete.
    pub fn advance_load(&mut self, size: CanvasSize) -> Option<LoadPhase> {
        let phase = self.phase;
        match phase {
            LoadPhase::Bounds => {
                self.bounds = compute_bounds(self.dataset.nodes(), self.config.bounds_batch_size);
                self.projection.set_bounds(self.bounds);
            }
            LoadPhase::Filters => {
                self.catalog = Some(TagCatalog::build(&self.dataset));
                self.filter.invalidate();
                self.filter.visibility(&self.dataset);
            }
            LoadPhase::Index => {
                if self.canvas_size != size {
                    self.canvas_size = size;
                    self.projection.invalidate();
                }
                self.rebuild_grid();
            }
            LoadPhase::FirstDraw => {
                self.scheduler.request_redraw();
                tracing::info!(
                    "Loaded {} nodes and {} ways",
                    self.dataset.nodes().len(),
                    self.dataset.ways().len()
                );
            }
            LoadPhase::Ready => return None,
        }
        tracing::debug!("Load phase done: {}", phase);
        self.phase = phase.next();
        Some(phase)
    }

    /// Replace the dataset and run every load phase
    pub fn load(&mut self, dataset: Dataset, size: CanvasSize) {
        self.begin_load(dataset);
        while self.advance_load(size).is_some() {}
    }

    #[inline]
    pub fn load_phase(&self) -> LoadPhase {
        self.phase
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    fn rebuild_grid(&mut self) {
        self.grid = SpatialGrid::build(
            &self.dataset,
            &mut self.projection,
            self.canvas_size,
            self.config.cell_size,
            self.config.traversal,
        );
    }

    // ---- Geometry ----

    /// Observe the current canvas size
    ///
    /// A change drops the screen-coordinate cache, rebuilds the grid (once indexing has
    /// happened) and requests a redraw. Returns whether the size changed.
    pub fn set_canvas_size(&mut self, size: CanvasSize) -> bool {
        if self.canvas_size == size {
            return false;
        }
        tracing::debug!(
            "Canvas resized from {}x{} to {}x{}",
            self.canvas_size.width,
            self.canvas_size.height,
            size.width,
            size.height
        );
        self.canvas_size = size;
        self.projection.invalidate();
        if self.phase > LoadPhase::Index {
            self.rebuild_grid();
        }
        self.scheduler.request_redraw();
        true
    }

    #[inline]
    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas_size
    }

    /// Project a coordinate at the current canvas size
    pub fn project(&mut self, lat: f64, lon: f64) -> ScreenPoint {
        self.projection.project(lat, lon, self.canvas_size)
    }

    /// Canvas pixel back to `(lat, lon)` at the current canvas size
    pub fn unproject(&self, point: ScreenPoint) -> (f64, f64) {
        self.projection.unproject(point, self.canvas_size)
    }

    // ---- Hit testing and interaction ----

    /// Broad-phase candidates around a canvas point
    pub fn query_near(&self, x: f64, y: f64) -> NearbyElements {
        self.grid.query_near(x, y)
    }

    /// The element a pointer at `(x, y)` would hover, without changing any state
    pub fn hit_test(&mut self, x: f64, y: f64) -> Option<ElementRef> {
        let node_radius = self.style.node_hit_radius();
        let way_distance = self.style.way_hit_distance();
        let visibility = self.filter.visibility(&self.dataset);
        HitTester {
            dataset: &self.dataset,
            grid: &self.grid,
            visibility,
            projection: &mut self.projection,
            size: self.canvas_size,
        }
        .resolve_hover(ScreenPoint { x, y }, node_radius, way_distance)
    }

    /// Pointer moved to `(x, y)` at `now`
    ///
    /// Hover is recomputed at most once per throttle window. Returns whether the hovered
    /// element changed (and a redraw was requested).
    pub fn pointer_moved(&mut self, x: f64, y: f64, now: Instant) -> bool {
        if !self.hover_throttle.try_fire(now) {
            return false;
        }
        let hit = self.hit_test(x, y);
        self.set_hovered(hit)
    }

    /// Pointer left the canvas
    pub fn pointer_left(&mut self) -> bool {
        self.set_hovered(None)
    }

    fn set_hovered(&mut self, hovered: Option<ElementRef>) -> bool {
        if self.hovered == hovered {
            return false;
        }
        match hovered {
            Some(element) => tracing::trace!("Hovering {}", element),
            None => tracing::trace!("Hover cleared"),
        }
        self.hovered = hovered;
        self.scheduler.request_redraw();
        true
    }

    /// Click with the current hover
    ///
    /// Clicking the selected element deselects it, clicking another element selects it,
    /// clicking empty space clears the selection. Returns the new selection.
    pub fn click(&mut self) -> Option<ElementRef> {
        self.selected = match self.hovered {
            Some(hovered) if self.selected == Some(hovered) => None,
            Some(hovered) => Some(hovered),
            None => None,
        };
        match self.selected {
            Some(element) => tracing::debug!("Selected {}", element),
            None => tracing::debug!("Selection cleared"),
        }
        self.scheduler.request_redraw();
        self.selected
    }

    /// Click at `(x, y)`, refreshing the hover first regardless of the throttle
    pub fn click_at(&mut self, x: f64, y: f64) -> Option<ElementRef> {
        let hit = self.hit_test(x, y);
        self.set_hovered(hit);
        self.click()
    }

    #[inline]
    pub fn hovered(&self) -> Option<ElementRef> {
        self.hovered
    }

    #[inline]
    pub fn selected(&self) -> Option<ElementRef> {
        self.selected
    }

    /// The selected element with its id, kind and tags, for display
    pub fn selected_element(&self) -> Option<Element> {
        self.selected.and_then(|reference| self.dataset.element(reference))
    }

    /// Whether the UI should show a pointing cursor
    #[inline]
    pub fn hover_cursor(&self) -> bool {
        self.hovered.is_some()
    }

    // ---- Drawing ----

    /// Ask for a redraw; repeated requests before the next frame collapse into one
    pub fn request_redraw(&mut self) -> bool {
        self.scheduler.request_redraw()
    }

    #[inline]
    pub fn needs_redraw(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Time the host should wait before offering the next frame
    pub fn time_until_redraw(&self, now: Instant) -> std::time::Duration {
        self.scheduler.time_until_due(now)
    }

    /// Draw if a redraw is pending and the minimum interval has passed
    pub fn frame<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        now: Instant,
    ) -> Option<DrawStats> {
        if !self.scheduler.should_draw(now) {
            return None;
        }
        Some(self.draw_at(surface, now))
    }

    /// Draw immediately, consuming any pending request
    pub fn draw<S: Surface + ?Sized>(&mut self, surface: &mut S) -> DrawStats {
        self.draw_at(surface, Instant::now())
    }

    fn draw_at<S: Surface + ?Sized>(&mut self, surface: &mut S, now: Instant) -> DrawStats {
        self.set_canvas_size(surface.size());
        self.scheduler.begin_draw(now);

        let visibility = self.filter.visibility(&self.dataset);
        let input = FrameInput {
            dataset: &self.dataset,
            visibility,
            style: &self.style,
            hovered: self.hovered,
            selected: self.selected,
            node_batch_size: self.config.node_batch_size,
        };
        draw_frame(surface, &mut self.projection, &input)
    }

    #[inline]
    pub fn draw_count(&self) -> u64 {
        self.scheduler.draw_count()
    }

    // ---- Style ----

    #[inline]
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Replace the whole style; sizes are clamped like the individual setters
    pub fn set_style(&mut self, style: Style) {
        let (node_size, way_width) = (style.node_size, style.way_width);
        self.style = style;
        self.style.set_node_size(node_size);
        self.style.set_way_width(way_width);
        self.scheduler.request_redraw();
    }

    pub fn set_node_size(&mut self, size: f64) {
        self.style.set_node_size(size);
        self.scheduler.request_redraw();
    }

    pub fn set_way_width(&mut self, width: f64) {
        self.style.set_way_width(width);
        self.scheduler.request_redraw();
    }

    pub fn set_node_color(&mut self, color: Color) {
        self.style.node_color = color;
        self.scheduler.request_redraw();
    }

    pub fn set_way_color(&mut self, color: Color) {
        self.style.way_color = color;
        self.scheduler.request_redraw();
    }

    pub fn set_show_labels(&mut self, show: bool) {
        self.style.show_labels = show;
        self.scheduler.request_redraw();
    }

    // ---- Filters ----

    #[inline]
    pub fn filter_state(&self) -> &FilterState {
        self.filter.state()
    }

    pub fn set_tag_active(&mut self, tag: &str, active: bool) {
        self.filter.set_tag_active(tag, active);
        self.scheduler.request_redraw();
    }

    pub fn set_tag_value_selected(&mut self, tag: &str, value: &str, selected: bool) {
        self.filter.set_tag_value_selected(tag, value, selected);
        self.scheduler.request_redraw();
    }

    pub fn disable_all_filters(&mut self) {
        self.filter.disable_all();
        self.scheduler.request_redraw();
    }

    /// Activate every given tag key
    pub fn enable_all_filters<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter.enable_all(tags);
        self.scheduler.request_redraw();
    }

    /// Activate every tag key present in the dataset
    pub fn enable_all_dataset_filters(&mut self) {
        let keys: Vec<String> = self.tag_catalog().keys().map(str::to_owned).collect();
        self.enable_all_filters(keys);
    }

    /// Whether an element passes the current filters
    pub fn is_visible(&self, element: ElementRef) -> bool {
        self.dataset
            .tags_of(element)
            .is_some_and(|tags| self.filter.is_visible(tags))
    }

    // ---- Tags ----

    /// Tag keys of the dataset, most common first; built on first use
    pub fn tag_catalog(&mut self) -> &TagCatalog {
        self.catalog.get_or_insert_with(|| TagCatalog::build(&self.dataset))
    }

    /// Values of one tag key, computed once per loaded dataset
    pub fn tag_values(&mut self, tag: &str) -> &TagValues {
        self.catalog
            .get_or_insert_with(|| TagCatalog::build(&self.dataset))
            .cache_values(&self.dataset, tag)
    }

    /// Catalog with the values of every active key computed, alongside the filter state
    ///
    /// Lets a filter panel read both without copying either.
    pub fn tag_overview(&mut self) -> (&TagCatalog, &FilterState) {
        let catalog = self
            .catalog
            .get_or_insert_with(|| TagCatalog::build(&self.dataset));
        for tag in self.filter.state().active_tags() {
            catalog.cache_values(&self.dataset, tag);
        }
        (catalog, self.filter.state())
    }

    // ---- Misc ----

    /// Restore default style and filters and drop the cached coordinates and tag catalog
    ///
    /// The selection is kept.
    pub fn reset_view(&mut self) {
        tracing::info!("Resetting view");
        self.style = Style::default();
        self.filter.disable_all();
        self.projection.invalidate();
        self.catalog = None;
        self.scheduler.request_redraw();
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[inline]
    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    #[inline]
    pub fn projection(&self) -> &ProjectionCache {
        &self.projection
    }
}
