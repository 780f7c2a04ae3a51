//! Geometric types for landmark positions

/// A position in backing-surface pixel coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a new position
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Direction (radians, y axis pointing down) from this position towards `other`
    pub fn direction_to(&self, other: Position) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Round to the nearest integer pixel, halves towards positive infinity
    pub fn rounded(&self) -> (i32, i32) {
        (round_half_up(self.x), round_half_up(self.y))
    }
}

fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// Axis-aligned rectangle in floating point pixel coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Rectangle of the given size centered on `center`
    pub fn centered(center: Position, width: f64, height: f64) -> Self {
        Self {
            left: center.x - width * 0.5,
            top: center.y - height * 0.5,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Shift the rectangle so it lies inside a `surface_w` x `surface_h` surface
    ///
    /// Rectangles larger than the surface are pinned to the top-left corner.
    pub fn clamp_within(&self, surface_w: f64, surface_h: f64) -> Bounds {
        let max_left = (surface_w - self.width).max(0.0);
        let max_top = (surface_h - self.height).max(0.0);
        Bounds {
            left: self.left.clamp(0.0, max_left),
            top: self.top.clamp(0.0, max_top),
            width: self.width,
            height: self.height,
        }
    }
}
