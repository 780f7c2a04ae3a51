//! Session export: JSON, CSV and PNG files sharing one file stem

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use serde::Serialize;

use super::{AngleStatistics, MeasurementRecord, SessionData, TIMESTAMP_FORMAT};
use crate::domain::{LANDMARK_COUNT, OrientedImage};

/// Prepended to CSV output so spreadsheet tools detect UTF-8
pub const UTF8_BOM: &str = "\u{FEFF}";

const STEM_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const CSV_HEADERS: [&str; 19] = [
    "session_id",
    "subject_id",
    "operator_id",
    "side",
    "mode",
    "measurement_type",
    "measurement_num",
    "point1_label",
    "point1_x",
    "point1_y",
    "point2_label",
    "point2_x",
    "point2_y",
    "point3_label",
    "point3_x",
    "point3_y",
    "angle_value",
    "timestamp",
    "device_info",
];

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<subject>_<side>_<YYYYMMDD_HHMMSS>` in the session timestamp's own offset
///
/// Sessions without a recorded timestamp use the current local time.
pub fn file_stem(session: &SessionData) -> String {
    let when = match session.timestamp {
        Some(ts) => ts.format(STEM_TIME_FORMAT).to_string(),
        None => Local::now().format(STEM_TIME_FORMAT).to_string(),
    };
    format!(
        "{}_{}_{}",
        sanitize_filename(&session.subject_id),
        session.side,
        when
    )
}

/// Session fields plus the statistics block
#[derive(Serialize)]
struct SessionDocument<'a> {
    #[serde(flatten)]
    session: &'a SessionData,
    statistics: Option<AngleStatistics>,
}

pub fn to_json(session: &SessionData) -> anyhow::Result<String> {
    let document = SessionDocument {
        session,
        statistics: session.statistics(),
    };
    serde_json::to_string_pretty(&document).context("serializing session")
}

/// Header plus one fully quoted row per measurement, without a BOM
pub fn to_csv(session: &SessionData) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;

    for record in &session.measurements {
        writer.write_record(csv_row(session, record))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn csv_row(session: &SessionData, record: &MeasurementRecord) -> Vec<String> {
    let mut row = vec![
        session.session_id.clone(),
        session.subject_id.clone(),
        session.operator_id.clone(),
        session.side.to_string(),
        session.mode.as_str().to_string(),
        session.measurement_type.clone(),
        record.measurement_num.to_string(),
    ];
    for index in 0..LANDMARK_COUNT {
        match record.points.get(index) {
            Some(point) => row.extend([
                point.label.id().to_string(),
                point.x.to_string(),
                point.y.to_string(),
            ]),
            None => row.extend([String::new(), String::new(), String::new()]),
        }
    }
    row.push(record.angle_value.map(|a| a.to_string()).unwrap_or_default());
    row.push(
        record
            .timestamp
            .or(session.timestamp)
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default(),
    );
    row.push(session.device_info.clone());
    row
}

/// Files written by [`write_export_set`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub raw: PathBuf,
    /// One per measurement that carries an annotated image, in order
    pub overlays: Vec<PathBuf>,
}

/// `<stem>_measurement<n>_overlay.png`
pub fn overlay_file_name(stem: &str, measurement_num: u32) -> String {
    format!("{stem}_measurement{measurement_num}_overlay.png")
}

/// Write JSON, CSV, the unannotated image and each annotated image into `dir`
pub fn write_export_set(
    session: &SessionData,
    raw: &OrientedImage,
    dir: &Path,
) -> anyhow::Result<ExportPaths> {
    anyhow::ensure!(
        session.has_measurement(),
        "session {} has no recorded measurement",
        session.session_id
    );
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let stem = file_stem(session);
    let mut paths = ExportPaths {
        json: dir.join(format!("{stem}.json")),
        csv: dir.join(format!("{stem}.csv")),
        raw: dir.join(format!("{stem}_raw.png")),
        overlays: Vec::new(),
    };

    std::fs::write(&paths.json, to_json(session)?)
        .with_context(|| format!("writing {}", paths.json.display()))?;
    std::fs::write(&paths.csv, format!("{UTF8_BOM}{}", to_csv(session)?))
        .with_context(|| format!("writing {}", paths.csv.display()))?;
    raw.rgba()
        .save(&paths.raw)
        .with_context(|| format!("writing {}", paths.raw.display()))?;

    for record in &session.measurements {
        let Some(overlay) = &record.overlay else {
            log::debug!("Measurement {} has no overlay image", record.measurement_num);
            continue;
        };
        let path = dir.join(overlay_file_name(&stem, record.measurement_num));
        overlay
            .rgba()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        paths.overlays.push(path);
    }

    log::info!(
        "Exported session {} ({} measurements) to {}",
        session.session_id,
        session.measurements.len(),
        dir.display()
    );
    Ok(paths)
}
