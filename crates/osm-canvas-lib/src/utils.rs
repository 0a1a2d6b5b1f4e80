//! Utility functions for screen-space distances and color parsing

use crate::ScreenPoint;

/// Euclidean distance between two canvas points in pixels
#[inline(always)]
pub fn distance(a: ScreenPoint, b: ScreenPoint) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Shortest distance from `p` to the closed segment `a`–`b`
///
/// # Arguments
/// * `p` - Query point in canvas pixels
/// * `a`, `b` - Segment endpoints in canvas pixels
///
/// # Returns
/// The distance to the closest point of the segment. A zero-length segment degenerates
/// to the distance to `a`.
#[inline(always)]
pub fn distance_to_segment(p: ScreenPoint, a: ScreenPoint, b: ScreenPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return distance(p, a);
    }

    // Parameter of the orthogonal projection, clamped onto the segment
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    distance(
        p,
        ScreenPoint {
            x: a.x + t * dx,
            y: a.y + t * dy,
        },
    )
}

/// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional) into RGBA bytes
pub fn parse_hex_rgba(hex: &str) -> Option<[u8; 4]> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    match digits.len() {
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}
