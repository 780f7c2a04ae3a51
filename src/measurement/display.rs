//! Mapping on-screen pointer coordinates onto the backing surface
//!
//! The backing surface is usually shown scaled to fit the screen, so pointer
//! positions must be rescaled per axis by `backing size / displayed size`.

use crate::domain::{Bounds, Position};

/// Where the backing surface is displayed on screen
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMapping {
    backing_width: f64,
    backing_height: f64,
    displayed: Bounds,
}

impl DisplayMapping {
    /// Returns `None` if either rectangle has no area
    pub fn new(backing_width: u32, backing_height: u32, displayed: Bounds) -> Option<Self> {
        if backing_width == 0
            || backing_height == 0
            || displayed.width <= 0.0
            || displayed.height <= 0.0
        {
            return None;
        }
        Some(Self {
            backing_width: f64::from(backing_width),
            backing_height: f64::from(backing_height),
            displayed,
        })
    }

    /// Mapping for a surface shown at its native size at the origin
    pub fn identity(backing_width: u32, backing_height: u32) -> Option<Self> {
        Self::new(
            backing_width,
            backing_height,
            Bounds {
                left: 0.0,
                top: 0.0,
                width: f64::from(backing_width),
                height: f64::from(backing_height),
            },
        )
    }

    /// Per-axis scale from display to backing pixels
    pub fn scale(&self) -> (f64, f64) {
        (
            self.backing_width / self.displayed.width,
            self.backing_height / self.displayed.height,
        )
    }

    /// Convert client (screen) coordinates into backing-surface coordinates
    pub fn to_backing(&self, client_x: f64, client_y: f64) -> Position {
        let (sx, sy) = self.scale();
        Position::new(
            (client_x - self.displayed.left) * sx,
            (client_y - self.displayed.top) * sy,
        )
    }
}
