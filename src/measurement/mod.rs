//! Three-point angle measurement over an oriented image
//!
//! [`AngleMeasurementEngine`] owns up to three landmark positions in backing
//! pixel space, reacts to pointer input, keeps the derived angle current and
//! redraws its canvas after every mutation. The canvas is always rebuilt from
//! the backing image, never patched.

pub mod angle;
pub mod display;
pub mod handlers;

use chrono::NaiveDateTime;
use image::RgbaImage;

pub use angle::{ANGLE_DECIMALS, compute_angle};
pub use display::DisplayMapping;
pub use handlers::{MeasureMsg, PointerEvent, PointerId, PointerRouter};

use crate::config::MeasureConfig;
use crate::domain::{LANDMARK_COUNT, Landmark, MeasurementResult, OrientedImage, Point, Position};
use crate::render::{OverlayStyle, draw_export_annotations, draw_measurement_overlay};

/// Timestamp format of the export watermark
pub const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where a measurement is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementPhase {
    Empty,
    /// One or two points placed
    Partial(usize),
    /// Three points and a defined angle
    Complete,
    /// Three points, but a landmark sits on the vertex
    Degenerate,
}

/// Interactive three-point angle measurement
#[derive(Clone, Debug)]
pub struct AngleMeasurementEngine {
    backing: OrientedImage,
    canvas: RgbaImage,
    points: Vec<Position>,
    angle_value: Option<f64>,
    drag_index: Option<usize>,
    style: OverlayStyle,
}

impl AngleMeasurementEngine {
    /// Start an empty measurement over `backing`
    pub fn new(backing: OrientedImage, config: &MeasureConfig) -> Self {
        Self::with_style(backing, OverlayStyle::from_config(config))
    }

    pub fn with_style(backing: OrientedImage, style: OverlayStyle) -> Self {
        let canvas = backing.rgba().clone();
        Self {
            backing,
            canvas,
            points: Vec::with_capacity(LANDMARK_COUNT),
            angle_value: None,
            drag_index: None,
            style,
        }
    }

    pub fn backing(&self) -> &OrientedImage {
        &self.backing
    }

    /// The interactive canvas as of the last mutation
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn points(&self) -> &[Position] {
        &self.points
    }

    /// Included angle in degrees, rounded to [`ANGLE_DECIMALS`] places
    pub fn angle_value(&self) -> Option<f64> {
        self.angle_value
    }

    pub fn drag_index(&self) -> Option<usize> {
        self.drag_index
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_index.is_some()
    }

    pub fn phase(&self) -> MeasurementPhase {
        match (self.points.len(), self.angle_value) {
            (0, _) => MeasurementPhase::Empty,
            (n, _) if n < LANDMARK_COUNT => MeasurementPhase::Partial(n),
            (_, Some(_)) => MeasurementPhase::Complete,
            (_, None) => MeasurementPhase::Degenerate,
        }
    }

    /// Index of the first point within the hit radius of `pos`
    fn hit_test(&self, pos: Position) -> Option<usize> {
        let radius = self.style.hit_radius();
        self.points
            .iter()
            .position(|point| point.distance_to(pos) < radius)
    }

    fn update_angle(&mut self) {
        self.angle_value = match self.points.as_slice() {
            [p1, p2, p3] => {
                let angle = compute_angle(*p1, *p2, *p3);
                if angle.is_none() {
                    log::debug!("Landmark coincides with the vertex, angle undefined");
                }
                angle
            }
            _ => None,
        };
    }

    /// Press at backing coordinates: grab a nearby point, or place the next one
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("Ignoring pointer down at non-finite position ({x}, {y})");
            return;
        }
        let pos = Position::new(x, y);

        // A press without a release in between re-targets instead of stacking drags
        let stale_drag = self.drag_index.take().is_some();

        if let Some(index) = self.hit_test(pos) {
            log::debug!("Dragging point {}", index + 1);
            self.drag_index = Some(index);
            self.render_interactive();
        } else if self.points.len() < LANDMARK_COUNT {
            self.points.push(pos);
            log::debug!("Placed point {} at ({x:.1}, {y:.1})", self.points.len());
            self.update_angle();
            self.render_interactive();
        } else if stale_drag {
            self.render_interactive();
        }
    }

    /// Move at backing coordinates; repositions the grabbed point, if any
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some(index) = self.drag_index else {
            return;
        };
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if let Some(point) = self.points.get_mut(index) {
            *point = Position::new(x, y);
            self.update_angle();
            self.render_interactive();
        }
    }

    /// Release: always leaves drag mode
    pub fn pointer_up(&mut self) {
        if let Some(index) = self.drag_index.take() {
            log::debug!("Released point {}", index + 1);
            self.render_interactive();
        }
    }

    /// Clear all points and the angle
    pub fn reset(&mut self) {
        self.points.clear();
        self.angle_value = None;
        self.drag_index = None;
        self.render_interactive();
    }

    /// Rebuild the canvas from the backing image and the current state
    pub fn render_interactive(&mut self) {
        self.canvas.clone_from(self.backing.rgba());
        draw_measurement_overlay(
            &mut self.canvas,
            &self.points,
            self.angle_value,
            self.drag_index,
            &self.style,
        );
    }

    /// Current points, rounded and labeled by position, with the angle
    pub fn measurement_data(&self) -> MeasurementResult {
        let points = self
            .points
            .iter()
            .zip(Landmark::ALL)
            .map(|(position, label)| {
                let (x, y) = position.rounded();
                Point { label, x, y }
            })
            .collect();
        MeasurementResult {
            points,
            angle_value: self.angle_value,
        }
    }

    /// Annotated export image stamped with the current local time
    ///
    /// `None` until three points with a defined angle exist.
    pub fn bake_annotated_image(&self) -> Option<OrientedImage> {
        self.bake_annotated_image_at(chrono::Local::now().naive_local())
    }

    /// Annotated export image stamped with `taken_at`
    pub fn bake_annotated_image_at(&self, taken_at: NaiveDateTime) -> Option<OrientedImage> {
        let angle = self.angle_value?;
        if self.points.len() != LANDMARK_COUNT {
            return None;
        }

        let mut rgba = self.backing.rgba().clone();
        let stamp = taken_at.format(WATERMARK_FORMAT).to_string();
        draw_export_annotations(&mut rgba, &self.points, angle, &stamp, &self.style);
        Some(OrientedImage::new(rgba, self.backing.source_orientation()))
    }
}
