//! Shared geometry calculations for the measurement overlay
//!
//! This module contains constants and math shared between the interactive
//! canvas and the baked export image.

use std::f64::consts::{PI, TAU};

use crate::domain::Position;

/// Landmark marker constants
pub mod marker {
    /// White ring around each marker
    pub const OUTLINE: f64 = 3.0;
    /// Hit radius as a multiple of the marker radius
    pub const HIT_FACTOR: f64 = 2.0;
    /// Glyph scale of the ordinal drawn inside a marker (16px)
    pub const ORDINAL_SCALE: u32 = 2;
    /// Extra radius of the ring highlighting the dragged marker
    pub const DRAG_RING: f64 = 6.0;
}

/// Connecting line constants
pub mod line {
    /// Stroke thickness of the interactive polyline
    pub const THICKNESS: f64 = 3.0;
}

/// Angle arc constants
pub mod arc {
    /// Stroke thickness of the interactive arc
    pub const THICKNESS: f64 = 2.0;
    /// Distance of the angle label beyond the arc
    pub const LABEL_OFFSET: f64 = 20.0;
    /// Glyph scale of the angle label
    pub const LABEL_SCALE: u32 = 2;
    /// Maximum angular step between arc polyline vertices (radians)
    pub const SEGMENT_STEP: f64 = 0.05;
}

/// Export (baked image) constants, in pixels of a 1000px reference image
pub mod export {
    /// Images up to this size use the constants unscaled
    pub const REFERENCE_SIZE: f64 = 1000.0;
    pub const LINE_THICKNESS: f64 = 5.0;
    pub const ARC_THICKNESS: f64 = 4.0;
    /// Dark outline added on each side of lines, arc and markers
    pub const OUTLINE: f64 = 2.0;
    /// Marker radius relative to the interactive radius
    pub const MARKER_SCALE: f64 = 1.2;
    /// Gap between a marker and its anatomical label
    pub const LABEL_GAP: f64 = 6.0;
    /// Padding inside label boxes and the angle badge
    pub const PADDING: f64 = 6.0;
    /// Corner radius of label boxes and the angle badge
    pub const CORNER_RADIUS: f64 = 8.0;
    /// Gap between the arc and the angle badge
    pub const BADGE_OFFSET: f64 = 12.0;
    /// Inset of the timestamp watermark from the image corner
    pub const MARGIN: f64 = 12.0;
}

/// Ellipse bezier approximation constant: 4/3 * (sqrt(2) - 1)
pub const BEZIER_K: f64 = 0.552_284_749_830_793_4;

/// Scale factor for export decorations so they stay legible on large images
#[inline]
pub fn export_scale(width: u32, height: u32) -> f64 {
    (width.max(height) as f64 / export::REFERENCE_SIZE).max(1.0)
}

/// Point at `distance` from `center` in direction `angle` (radians, y down)
#[inline]
pub fn polar(center: Position, angle: f64, distance: f64) -> Position {
    Position::new(
        center.x + angle.cos() * distance,
        center.y + angle.sin() * distance,
    )
}

/// The included angle at a vertex, as a start direction and signed sweep
///
/// The sweep always takes the short way round, so `|sweep| <= PI` and the
/// arc spans exactly the measured angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleArc {
    pub start: f64,
    pub sweep: f64,
}

impl AngleArc {
    /// Arc from the `first` direction to the `last` direction around `vertex`
    ///
    /// Returns `None` when either point coincides with the vertex.
    pub fn between(first: Position, vertex: Position, last: Position) -> Option<Self> {
        if first == vertex || last == vertex {
            return None;
        }
        let start = vertex.direction_to(first);
        let end = vertex.direction_to(last);
        let sweep = (end - start + PI).rem_euclid(TAU) - PI;
        Some(Self { start, sweep })
    }

    /// Direction halfway along the arc
    pub fn bisector(&self) -> f64 {
        self.start + self.sweep * 0.5
    }

    /// Polyline approximation of the arc at `radius` around `center`
    pub fn points(&self, center: Position, radius: f64) -> Vec<Position> {
        let segments = ((self.sweep.abs() / arc::SEGMENT_STEP).ceil() as usize).max(1);
        (0..=segments)
            .map(|i| {
                let t = i as f64 / segments as f64;
                polar(center, self.start + self.sweep * t, radius)
            })
            .collect()
    }
}
