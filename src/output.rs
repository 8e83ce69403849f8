//! Flat-file persistence for every table the pipeline produces.
//!
//! The hourly results table is the hand-off between `calc` and the
//! reducers, so it also has a tolerant loader.

use anyhow::Result;
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::grade::LosGrade;
use crate::analyzers::hours::format_hour;
use crate::analyzers::types::{
    ClassifiedInterval, Extreme, ExtremeSummary, HourlyRecord, HourlyVolume, Movement,
    hour_format,
};
use crate::error::LosError;
use crate::parser::{
    DATE_COLUMN, INTID_COLUMN, TIME_COLUMN, coerce_volume, parse_intersection_id, parse_timestamp,
};

/// Columns every LOS reducer needs from the hourly table.
pub const REQUIRED_COLUMNS: [&str; 3] = [INTID_COLUMN, "hour", "los_score"];

/// Columns the volume profile needs from the hourly table.
pub const VOLUME_COLUMNS: [&str; 3] = [INTID_COLUMN, "hour", "total_volume"];

/// Writes any serializable rows as a CSV table with a header line.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(())
}

/// Persists the canonical hourly table: `INTID,hour,total_volume,los_score,LOS`.
pub fn write_hourly_results(path: &Path, rows: &[HourlyRecord]) -> Result<()> {
    if rows.is_empty() {
        // serde only emits the header alongside the first row
        let mut writer = Writer::from_path(path)?;
        writer.write_record([INTID_COLUMN, "hour", "total_volume", "los_score", "LOS"])?;
        writer.flush()?;
        return Ok(());
    }
    write_rows(path, rows)
}

/// Persists classified 15-minute intervals. The file is valid parser input.
pub fn write_intervals(path: &Path, intervals: &[ClassifiedInterval]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;

    let mut header = vec![DATE_COLUMN, TIME_COLUMN, INTID_COLUMN];
    header.extend(Movement::ALL.iter().map(|m| m.code()));
    header.extend(["datetime", "total_volume", "LOS", "los_score"]);
    writer.write_record(&header)?;

    for interval in intervals {
        let record = &interval.record;
        let mut fields = vec![
            record.date.clone(),
            record.time.clone(),
            record
                .intersection_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ];
        fields.extend(
            Movement::ALL
                .iter()
                .map(|m| record.movements.get(*m).to_string()),
        );
        fields.push(
            record
                .timestamp
                .map(|ts| ts.format(hour_format::FORMAT).to_string())
                .unwrap_or_default(),
        );
        fields.push(interval.total_volume.to_string());
        fields.push(interval.los_grade.to_string());
        fields.push(interval.los_score().to_string());
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = intervals.len(), "Intervals written");
    Ok(())
}

/// Persists a best or worst summary: `INTID,<p>_score,<p>_LOS,<p>_hours`.
pub fn write_extremes(path: &Path, extreme: Extreme, summaries: &[ExtremeSummary]) -> Result<()> {
    let prefix = extreme.prefix();
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        INTID_COLUMN.to_string(),
        format!("{prefix}_score"),
        format!("{prefix}_LOS"),
        format!("{prefix}_hours"),
    ])?;

    for summary in summaries {
        writer.write_record([
            summary.intersection_id.to_string(),
            summary.score.to_string(),
            summary.grade.to_string(),
            hours_cell(summary),
        ])?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = summaries.len(), "Summary written");
    Ok(())
}

/// `YYYY-MM-DD HH:MM` strings, sorted, unique, comma-separated.
pub fn hours_cell(summary: &ExtremeSummary) -> String {
    let mut formatted: Vec<String> = summary.hours.iter().map(format_hour).collect();
    formatted.sort();
    formatted.dedup();
    formatted.join(", ")
}

/// One line of the hourly table as stored. Cells are validated on conversion.
#[derive(Debug, Deserialize)]
struct HourlyRow {
    #[serde(rename = "INTID", default)]
    intersection_id: Option<String>,
    #[serde(default)]
    hour: Option<String>,
    #[serde(default)]
    total_volume: Option<String>,
    #[serde(default)]
    los_score: Option<String>,
}

impl HourlyRow {
    fn key(&self) -> Option<(i64, NaiveDateTime)> {
        let intersection_id = parse_intersection_id(self.intersection_id.as_deref()?)?;
        let hour = parse_timestamp(self.hour.as_deref()?)?;
        Some((intersection_id, hour))
    }

    fn volume(&self) -> u64 {
        self.total_volume
            .as_deref()
            .map(|raw| coerce_volume(raw).round() as u64)
            .unwrap_or(0)
    }

    fn into_hourly(self) -> Option<HourlyRecord> {
        let (intersection_id, hour) = self.key()?;
        let los_score = parse_score(self.los_score.as_deref()?)?;
        Some(HourlyRecord {
            intersection_id,
            hour,
            total_volume: self.volume(),
            los_score,
            los_grade: LosGrade::from_score(los_score)?,
        })
    }

    fn into_volume(self) -> Option<HourlyVolume> {
        let (intersection_id, hour) = self.key()?;
        Some(HourlyVolume {
            intersection_id,
            hour,
            total_volume: self.volume(),
        })
    }
}

/// Loads the hourly results table for the LOS reducers.
///
/// Rows with a blank or non-integer `INTID`, an unparseable `hour` or a
/// `los_score` outside 1-6 are dropped. A missing `total_volume` reads as 0.
///
/// # Errors
///
/// [`LosError::SourceNotFound`] if the file does not exist,
/// [`LosError::MissingColumns`] if any of [`REQUIRED_COLUMNS`] is absent.
pub fn load_hourly_results(path: &Path) -> std::result::Result<Vec<HourlyRecord>, LosError> {
    load_rows(path, &REQUIRED_COLUMNS, HourlyRow::into_hourly)
}

/// Loads the hourly table for the volume profile. `los_score` is not read.
///
/// # Errors
///
/// As [`load_hourly_results`], checked against [`VOLUME_COLUMNS`].
pub fn load_hourly_volumes(path: &Path) -> std::result::Result<Vec<HourlyVolume>, LosError> {
    load_rows(path, &VOLUME_COLUMNS, HourlyRow::into_volume)
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
fn load_rows<T>(
    path: &Path,
    required: &[&str],
    convert: impl Fn(HourlyRow) -> Option<T>,
) -> std::result::Result<Vec<T>, LosError> {
    if !path.is_file() {
        return Err(LosError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let mut missing: Vec<String> = required
        .iter()
        .filter(|name| !headers.iter().any(|h| h == **name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(LosError::MissingColumns { missing });
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for result in rdr.deserialize() {
        let row: HourlyRow = result?;
        match convert(row) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "Hourly rows with unusable cells dropped");
    }
    info!(rows = rows.len(), "Hourly results loaded");
    Ok(rows)
}

/// Accepts integral scores 1-6, including float spellings such as `3.0`.
fn parse_score(raw: &str) -> Option<u8> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.fract() != 0.0 || !(1.0..=6.0).contains(&value) {
        return None;
    }
    Some(value as u8)
}
