//! End-to-end behaviour through the public `MapView` API

use osm_canvas_lib::hit_test::HitTester;
use osm_canvas_lib::{
    CanvasSize, Color, Config, Dataset, ElementRef, MapView, Node, ProjectionCache, ScreenPoint,
    SpatialGrid, Surface, Visibility, Way, compute_bounds,
};

const SIZE: CanvasSize = CanvasSize::new(800, 600);

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Clear,
    Circle { center: ScreenPoint, radius: f64, color: Color },
    Polyline { points: Vec<ScreenPoint>, width: f64, color: Color },
    Text { anchor: ScreenPoint, text: String },
}

/// Off-screen canvas that records every primitive
struct RecordingSurface {
    size: CanvasSize,
    ops: Vec<Op>,
}

impl RecordingSurface {
    fn new(size: CanvasSize) -> Self {
        Self {
            size,
            ops: Vec::new(),
        }
    }

    fn circles(&self) -> Vec<(ScreenPoint, f64, Color)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Circle {
                    center,
                    radius,
                    color,
                } => Some((*center, *radius, *color)),
                _ => None,
            })
            .collect()
    }

    fn texts(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(Op::Clear);
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Color) {
        self.ops.push(Op::Circle {
            center,
            radius,
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], width: f64, color: Color) {
        self.ops.push(Op::Polyline {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn fill_text(&mut self, anchor: ScreenPoint, text: &str, _size: f64, _color: Color) {
        self.ops.push(Op::Text {
            anchor,
            text: text.to_owned(),
        });
    }
}

fn create_test_dataset() -> Dataset {
    Dataset::new(
        vec![
            Node::new(1, 48.0, 2.0)
                .with_tag("shop", "bakery")
                .with_tag("name", "Boulangerie"),
            Node::new(2, 48.01, 2.01),
        ],
        vec![Way::new(10, vec![1, 2])],
    )
}

fn create_test_view() -> MapView {
    let mut view = MapView::new(Config::default());
    view.load(create_test_dataset(), SIZE);
    view
}

#[test]
fn test_filter_by_tag_presence() {
    let mut view = create_test_view();
    let mut surface = RecordingSurface::new(SIZE);

    let stats = view.draw(&mut surface);
    assert_eq!(stats.nodes, 2);
    assert!(view.is_visible(ElementRef::node(1)));
    assert!(view.is_visible(ElementRef::node(2)));

    view.set_tag_active("shop", true);
    assert!(view.is_visible(ElementRef::node(1)));
    assert!(!view.is_visible(ElementRef::node(2)));

    let stats = view.draw(&mut surface);
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.ways, 0);
    let circles = surface.circles();
    assert_eq!(circles.len(), 1);
    let expected = view.project(48.0, 2.0);
    assert_eq!(circles[0].0, expected);
}

#[test]
fn test_way_midpoint_is_near() {
    let dataset = create_test_dataset();
    let mut projection = ProjectionCache::new(compute_bounds(dataset.nodes(), 10_000), 50.0);
    let grid = SpatialGrid::build(&dataset, &mut projection, SIZE, 50.0, Default::default());
    let visibility = Visibility::all(&dataset);

    let a = projection.project(48.0, 2.0, SIZE);
    let b = projection.project(48.01, 2.01, SIZE);
    let mid = ScreenPoint {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
    };

    let way = dataset.way(10).expect("way 10").clone();
    let mut tester = HitTester {
        dataset: &dataset,
        grid: &grid,
        visibility: &visibility,
        projection: &mut projection,
        size: SIZE,
    };
    // Way width 2 gives a threshold of 4 pixels
    assert!(tester.is_near_way(&way, mid, 2.0 * 2.0));
    assert!(tester.way_distance(&way, mid).expect("has segments") < 1e-9);
}

#[test]
fn test_resize_clears_cache_and_rebuilds_grid() {
    let mut view = create_test_view();
    view.draw(&mut RecordingSurface::new(SIZE));
    // Two nodes, each projected once at the load size
    assert_eq!(view.projection().len(), 2);
    assert_eq!(view.projection().computations(), 2);

    let bigger = CanvasSize::new(1024, 768);
    assert!(view.set_canvas_size(bigger));
    assert!(view.needs_redraw());

    // Only the rebuild's entries for the new size remain
    assert_eq!(view.grid().size(), bigger);
    assert_eq!(view.projection().len(), 2);
    assert_eq!(view.projection().computations(), 4);

    // Going back to the old size recomputes instead of hitting stale entries
    assert!(view.set_canvas_size(SIZE));
    assert_eq!(view.projection().len(), 2);
    assert_eq!(view.projection().computations(), 6);
    assert!(view.set_canvas_size(bigger));
    assert_eq!(view.projection().computations(), 8);

    // Hit-tests see the new geometry immediately
    let mut old = ProjectionCache::new(*view.bounds(), 50.0);
    let old_point = old.project(48.0, 2.0, SIZE);
    let new_point = view.project(48.0, 2.0);
    assert_ne!(old_point, new_point);
    assert_eq!(view.projection().computations(), 8);
    assert_eq!(view.hit_test(new_point.x, new_point.y), Some(ElementRef::node(1)));
    assert_eq!(view.hit_test(old_point.x, old_point.y), None);
}

#[test]
fn test_unusable_cell_size_loads_and_hits() {
    let dataset = create_test_dataset();
    let mut view = MapView::new(Config {
        cell_size: 0.0,
        padding: 0.0,
        ..Config::default()
    });
    view.load(dataset.clone(), SIZE);
    assert!(view.is_ready());
    assert_eq!(view.config().cell_size, Config::default().cell_size);
    let p = view.project(48.0, 2.0);
    assert_eq!(view.hit_test(p.x, p.y), Some(ElementRef::node(1)));

    // A cell smaller than the hit radius would drop neighbours from the 3×3 block
    let mut view = MapView::new(Config {
        cell_size: 5.0,
        ..Config::default()
    });
    view.set_node_size(10.0);
    view.load(dataset, SIZE);
    let p = view.project(48.0, 2.0);
    // Radius is 15 px
    assert_eq!(view.hit_test(p.x + 12.0, p.y), Some(ElementRef::node(1)));
    assert_eq!(view.hit_test(p.x + 16.0, p.y), None);
}

#[test]
fn test_selection_toggling() {
    let mut view = create_test_view();
    let a = view.project(48.0, 2.0);
    let b = view.project(48.01, 2.01);

    assert_eq!(view.click_at(a.x, a.y), Some(ElementRef::node(1)));
    assert_eq!(view.click_at(a.x, a.y), None);

    view.click_at(a.x, a.y);
    assert_eq!(view.click_at(b.x, b.y), Some(ElementRef::node(2)));
    assert_eq!(view.selected(), Some(ElementRef::node(2)));

    assert_eq!(view.click_at(a.x + 60.0, a.y - 200.0), None);
}

#[test]
fn test_adding_value_back_never_hides() {
    let dataset = Dataset::new(
        vec![
            Node::new(1, 48.0, 2.0).with_tag("shop", "bakery"),
            Node::new(2, 48.01, 2.01).with_tag("shop", "butcher"),
            Node::new(3, 48.02, 2.02).with_tag("amenity", "cafe"),
        ],
        vec![],
    );
    let mut view = MapView::new(Config::default());
    view.load(dataset, SIZE);

    view.set_tag_active("shop", true);
    view.set_tag_value_selected("shop", "bakery", true);
    let before: Vec<bool> = (1..=3).map(|id| view.is_visible(ElementRef::node(id))).collect();
    assert_eq!(before, vec![true, false, false]);

    view.set_tag_value_selected("shop", "butcher", true);
    let after: Vec<bool> = (1..=3).map(|id| view.is_visible(ElementRef::node(id))).collect();
    for (was, is) in before.iter().zip(&after) {
        assert!(!was || *is);
    }
    assert_eq!(after, vec![true, true, false]);

    view.set_tag_active("shop", false);
    assert!(view.filter_state().is_empty());
    assert!((1..=3).all(|id| view.is_visible(ElementRef::node(id))));
}

#[test]
fn test_labels_and_highlight_in_frame() {
    let mut view = create_test_view();
    let mut surface = RecordingSurface::new(SIZE);

    view.set_show_labels(false);
    view.draw(&mut surface);
    assert!(surface.texts().is_empty());

    let a = view.project(48.0, 2.0);
    view.click_at(a.x, a.y);
    view.draw(&mut surface);
    assert_eq!(surface.texts(), vec!["Boulangerie".to_owned()]);
    assert!(
        surface
            .circles()
            .iter()
            .any(|(_, radius, color)| *color == Color::SELECTED && *radius == 3.0)
    );
    assert!(matches!(surface.ops.first(), Some(Op::Clear)));
    assert!(matches!(surface.ops.get(1), Some(Op::Polyline { .. })));
}

#[test]
fn test_dangling_references_do_not_fail() {
    let dataset = Dataset::new(
        vec![Node::new(1, 48.0, 2.0), Node::new(2, 48.01, 2.01)],
        vec![
            Way::new(10, vec![1, 77, 2]),
            Way::new(11, vec![77, 78]),
            Way::new(12, vec![]),
        ],
    );
    let mut view = MapView::new(Config::default());
    view.load(dataset, SIZE);
    let stats = view.draw(&mut RecordingSurface::new(SIZE));
    // Way 10 is bridged, the others have nothing to draw
    assert_eq!(stats.ways, 1);
    assert_eq!(stats.nodes, 2);
}

#[test]
fn test_degenerate_datasets_project_finitely() {
    for dataset in [
        Dataset::default(),
        Dataset::new(vec![Node::new(1, 10.0, 10.0)], vec![]),
        Dataset::new(vec![Node::new(1, 10.0, 10.0), Node::new(2, 10.0, 11.0)], vec![]),
    ] {
        let mut view = MapView::new(Config::default());
        view.load(dataset, SIZE);
        let p = view.project(10.0, 10.0);
        assert!(p.x.is_finite() && p.y.is_finite());
        view.draw(&mut RecordingSurface::new(SIZE));
    }
}
