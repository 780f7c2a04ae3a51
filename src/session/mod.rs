//! Measurement session records
//!
//! A [`SessionData`] collects who was measured, how the image was obtained
//! and every measurement taken on it, ready for export.

pub mod export;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::{MeasurementResult, OrientedImage, Point};
use crate::import::ImportChecklist;
use crate::measurement::angle::round_degrees;

pub use export::{
    ExportPaths, file_stem, overlay_file_name, sanitize_filename, to_csv, to_json, write_export_set,
};

pub const DEFAULT_MEASUREMENT_TYPE: &str = "ankle_dorsiflexion";

/// Degrees of pitch and roll still considered level
pub const LEVEL_TOLERANCE_DEG: f64 = 5.0;

/// Which leg was measured
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[default]
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Side {
    pub fn code(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid side `{0}`, expected L or R")]
pub struct ParseSideError(String);

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "l" | "left" => Ok(Side::Left),
            "R" | "r" | "right" => Ok(Side::Right),
            other => Err(ParseSideError(other.to_string())),
        }
    }
}

/// How the measured image was obtained
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Realtime,
    Import,
}

impl CaptureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMode::Realtime => "realtime",
            CaptureMode::Import => "import",
        }
    }
}

/// Device attitude at capture time, from motion sensor Euler angles
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceTilt {
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub is_level: bool,
    pub level_tolerance_deg: f64,
}

impl DeviceTilt {
    /// `beta` is front-to-back tilt, `gamma` left-to-right
    ///
    /// A phone held upright for the rear camera reads `beta` near 90, which
    /// is taken as zero pitch.
    pub fn from_euler(beta: f64, gamma: f64) -> Self {
        let pitch = beta - 90.0;
        let roll = gamma;
        Self {
            pitch_deg: round_tenth(pitch),
            roll_deg: round_tenth(roll),
            is_level: pitch.abs() <= LEVEL_TOLERANCE_DEG && roll.abs() <= LEVEL_TOLERANCE_DEG,
            level_tolerance_deg: LEVEL_TOLERANCE_DEG,
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `session_<unix millis>_<9 random characters>`
pub fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{millis}_{}", &random[..9])
}

/// Current local time with whole-second precision
pub fn local_timestamp() -> DateTime<FixedOffset> {
    let now = Local::now().fixed_offset();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Describes the host the measurement was taken on
pub fn device_info() -> String {
    format!(
        "{}/{} ({}; {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// One recorded three-point measurement within a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// 1-based position in the session
    pub measurement_num: u32,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub angle_value: Option<f64>,
    #[serde(default, with = "iso_timestamp")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Annotated export image, written as its own PNG
    #[serde(skip)]
    pub overlay: Option<OrientedImage>,
}

/// Summary of the defined angles in a session
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleStatistics {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub sd: f64,
    pub min: f64,
    pub max: f64,
}

impl AngleStatistics {
    /// `None` for an empty slice
    pub fn from_angles(angles: &[f64]) -> Option<Self> {
        if angles.is_empty() {
            return None;
        }
        let count = angles.len();
        let n = count as f64;
        let mean = angles.iter().sum::<f64>() / n;
        let variance = angles.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            count,
            mean: round_degrees(mean),
            sd: round_degrees(variance.sqrt()),
            min: angles.iter().copied().fold(f64::INFINITY, f64::min),
            max: angles.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// One measurement session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_id: String,
    pub subject_id: String,
    #[serde(default)]
    pub operator_id: String,
    pub side: Side,
    #[serde(default)]
    pub mode: CaptureMode,
    #[serde(default = "default_measurement_type")]
    pub measurement_type: String,
    #[serde(default)]
    pub checklist: Option<ImportChecklist>,
    #[serde(default)]
    pub device_orientation: Option<DeviceTilt>,
    /// Time of the first recorded measurement
    #[serde(default, with = "iso_timestamp")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub device_info: String,
    #[serde(default)]
    pub measurements: Vec<MeasurementRecord>,
}

fn default_measurement_type() -> String {
    DEFAULT_MEASUREMENT_TYPE.to_string()
}

impl SessionData {
    pub fn new(subject_id: impl Into<String>, side: Side, mode: CaptureMode) -> Self {
        Self {
            session_id: generate_session_id(),
            subject_id: subject_id.into(),
            operator_id: String::new(),
            side,
            mode,
            measurement_type: default_measurement_type(),
            checklist: None,
            device_orientation: None,
            timestamp: None,
            device_info: device_info(),
            measurements: Vec::new(),
        }
    }

    /// Append a measurement taken at `taken_at`, returning its number
    ///
    /// The first measurement also fixes the session timestamp.
    pub fn record_measurement(
        &mut self,
        result: MeasurementResult,
        taken_at: DateTime<FixedOffset>,
        overlay: Option<OrientedImage>,
    ) -> u32 {
        let taken_at = taken_at.with_nanosecond(0).unwrap_or(taken_at);
        let measurement_num = self.measurements.len() as u32 + 1;
        self.timestamp.get_or_insert(taken_at);
        self.measurements.push(MeasurementRecord {
            measurement_num,
            points: result.points,
            angle_value: result.angle_value,
            timestamp: Some(taken_at),
            overlay,
        });
        log::debug!(
            "Session {} recorded measurement {measurement_num} with angle {:?}",
            self.session_id,
            result.angle_value
        );
        measurement_num
    }

    /// True once any measurement with a defined angle is recorded
    pub fn has_measurement(&self) -> bool {
        self.timestamp.is_some() && self.measurements.iter().any(|m| m.angle_value.is_some())
    }

    /// Statistics over every defined angle, `None` without any
    pub fn statistics(&self) -> Option<AngleStatistics> {
        let angles: Vec<f64> = self.measurements.iter().filter_map(|m| m.angle_value).collect();
        AngleStatistics::from_angles(&angles)
    }
}

/// ISO-8601 with offset and whole seconds, e.g. `2026-01-14T14:32:15+09:00`
mod iso_timestamp {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

pub(crate) use iso_timestamp::FORMAT as TIMESTAMP_FORMAT;
