//! Landmark vocabulary and measurement result types
//!
//! Landmarks are identified purely by placement order; the labels below are
//! the fixed vocabulary attached to points 1, 2 and 3.

use serde::{Deserialize, Serialize};

/// Number of landmarks in a complete measurement
pub const LANDMARK_COUNT: usize = 3;

/// Anatomical landmark, in placement order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landmark {
    /// Proximal landmark (point 1)
    #[serde(rename = "fibular_head")]
    FibularHead,
    /// Angle vertex (point 2)
    #[serde(rename = "lateral_malleolus")]
    LateralMalleolus,
    /// Distal landmark (point 3)
    #[serde(rename = "5th_metatarsal")]
    FifthMetatarsal,
}

impl Landmark {
    /// All landmarks in placement order
    pub const ALL: [Landmark; LANDMARK_COUNT] = [
        Landmark::FibularHead,
        Landmark::LateralMalleolus,
        Landmark::FifthMetatarsal,
    ];

    /// Landmark for a zero-based point index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable identifier used in exported data
    pub fn id(self) -> &'static str {
        match self {
            Landmark::FibularHead => "fibular_head",
            Landmark::LateralMalleolus => "lateral_malleolus",
            Landmark::FifthMetatarsal => "5th_metatarsal",
        }
    }

    /// Human readable name drawn onto export images
    pub fn display_name(self) -> &'static str {
        match self {
            Landmark::FibularHead => "Fibular head",
            Landmark::LateralMalleolus => "Lateral malleolus",
            Landmark::FifthMetatarsal => "5th metatarsal head",
        }
    }
}

/// A labeled landmark point, rounded to integer backing-surface pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub label: Landmark,
    pub x: i32,
    pub y: i32,
}

/// Snapshot of a measurement handed to export and storage
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub points: Vec<Point>,
    /// Included angle at the vertex in degrees (3 decimals), `None` until complete
    pub angle_value: Option<f64>,
}

impl MeasurementResult {
    /// Whether three points and a defined angle are present
    pub fn is_complete(&self) -> bool {
        self.points.len() == LANDMARK_COUNT && self.angle_value.is_some()
    }
}
