//! egui-backed drawing surface
//!
//! Frames are recorded as egui shapes in canvas-local coordinates and replayed on
//! every egui pass, so the engine only redraws when it decides to.

use egui::{Align2, Color32, FontId, Painter, Pos2, Shape, Stroke};
use osm_canvas_lib::{CanvasSize, Color, ScreenPoint, Surface};

struct Label {
    anchor: Pos2,
    text: String,
    size: f32,
    color: Color32,
}

/// Retained frame of egui shapes
#[derive(Default)]
pub struct ShapeSurface {
    size: CanvasSize,
    shapes: Vec<Shape>,
    labels: Vec<Label>,
}

#[inline]
fn to_pos(point: ScreenPoint) -> Pos2 {
    Pos2::new(point.x as f32, point.y as f32)
}

#[inline]
fn to_color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

impl ShapeSurface {
    /// Canvas size the next frame will be drawn for
    pub fn set_size(&mut self, size: CanvasSize) {
        self.size = size;
    }

    /// Number of recorded primitives
    pub fn len(&self) -> usize {
        self.shapes.len() + self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay the recorded frame with its origin at `origin`
    pub fn paint(&self, painter: &Painter, origin: Pos2) {
        profiling::scope!("ShapeSurface::paint");

        let offset = origin.to_vec2();
        painter.extend(self.shapes.iter().cloned().map(|mut shape| {
            shape.translate(offset);
            shape
        }));
        for label in &self.labels {
            painter.text(
                label.anchor + offset,
                Align2::CENTER_BOTTOM,
                &label.text,
                FontId::proportional(label.size),
                label.color,
            );
        }
    }
}

impl Surface for ShapeSurface {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear(&mut self) {
        self.shapes.clear();
        self.labels.clear();
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Color) {
        self.shapes
            .push(Shape::circle_filled(to_pos(center), radius as f32, to_color32(color)));
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], width: f64, color: Color) {
        let points: Vec<Pos2> = points.iter().copied().map(to_pos).collect();
        self.shapes.push(Shape::line(
            points,
            Stroke::new(width as f32, to_color32(color)),
        ));
    }

    fn fill_text(&mut self, anchor: ScreenPoint, text: &str, size: f64, color: Color) {
        self.labels.push(Label {
            anchor: to_pos(anchor),
            text: text.to_owned(),
            size: size as f32,
            color: to_color32(color),
        });
    }
}
