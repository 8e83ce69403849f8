//! Parser for raw intersection volume exports.
//!
//! Field exports start with an arbitrary preamble, carry spreadsheet text
//! literals in the `TIME` column and often end every line with a stray
//! delimiter. Parsing is done in two passes: the first locates the header
//! line, the second reads the table from that line on.

use crate::analyzers::types::{Movement, MovementVolumes, RawRecord};
use crate::error::{LosError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DATE_COLUMN: &str = "DATE";
pub const TIME_COLUMN: &str = "TIME";
pub const INTID_COLUMN: &str = "INTID";

const MIDNIGHT: &str = "00:00";

/// Formats tried, in order, when neither `month/day/year` layout fits.
const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m-%d-%Y %H:%M",
    "%d-%b-%Y %H:%M",
    "%b %d %Y %H:%M",
    "%B %d %Y %H:%M",
    "%Y%m%d %H:%M",
];

const GENERIC_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Ways of turning the `DATE` and `TIME` cells into a timestamp.
///
/// Strategies are tried against the whole column in [`DateTimeStrategy::ORDER`];
/// the first one that parses at least one row is used for every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeStrategy {
    MonthDayYearMinutes,
    MonthDayYearSeconds,
    Generic,
    DateOnly,
}

impl DateTimeStrategy {
    pub const ORDER: [DateTimeStrategy; 4] = [
        DateTimeStrategy::MonthDayYearMinutes,
        DateTimeStrategy::MonthDayYearSeconds,
        DateTimeStrategy::Generic,
        DateTimeStrategy::DateOnly,
    ];

    pub fn parse(self, date: &str, time: &str) -> Option<NaiveDateTime> {
        let combined = format!("{} {}", date.trim(), time.trim());
        let combined = combined.trim();
        match self {
            DateTimeStrategy::MonthDayYearMinutes => {
                NaiveDateTime::parse_from_str(combined, "%m/%d/%Y %H:%M").ok()
            }
            DateTimeStrategy::MonthDayYearSeconds => {
                NaiveDateTime::parse_from_str(combined, "%m/%d/%Y %H:%M:%S").ok()
            }
            DateTimeStrategy::Generic => parse_timestamp(combined),
            DateTimeStrategy::DateOnly => NaiveDate::parse_from_str(date.trim(), "%m/%d/%Y")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// Lenient timestamp parse used for the generic strategy and for reading
/// back the `hour` column of the results table.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    GENERIC_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            GENERIC_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Builds timestamps for every `(date, time)` pair with a single strategy.
///
/// Returns the strategy that was used, or `None` (and all-`None` timestamps)
/// when no strategy parses a single row.
pub fn build_timestamps(
    cells: &[(String, String)],
) -> (Vec<Option<NaiveDateTime>>, Option<DateTimeStrategy>) {
    for strategy in DateTimeStrategy::ORDER {
        let parsed: Vec<_> = cells
            .iter()
            .map(|(date, time)| strategy.parse(date, time))
            .collect();
        if parsed.iter().any(Option::is_some) {
            return (parsed, Some(strategy));
        }
    }
    (vec![None; cells.len()], None)
}

/// Normalizes a raw `TIME` cell to `HH:MM`.
///
/// Text-literal wrappers such as `="0700"` and any other non-digit characters
/// are dropped. Three or four remaining digits are read as `HMM`/`HHMM`;
/// anything else becomes midnight.
pub fn normalize_time(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 3 || digits.len() > 4 {
        return MIDNIGHT.to_string();
    }
    let padded = format!("{digits:0>4}");
    format!("{}:{}", &padded[..2], &padded[2..])
}

/// Parses a movement count; anything non-numeric, non-finite or negative is 0.
pub fn coerce_volume(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

/// Parses an intersection id, accepting integral floats such as `3.0`.
pub fn parse_intersection_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Location of the header line inside the file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPosition {
    pub line_index: usize,
    pub byte_offset: usize,
}

/// First pass: finds the first line mentioning all three key columns.
///
/// On failure returns the number of lines scanned.
pub fn find_header(content: &str) -> std::result::Result<HeaderPosition, usize> {
    let mut byte_offset = 0;
    let mut total_lines = 0;
    for (line_index, line) in content.split_inclusive('\n').enumerate() {
        total_lines = line_index + 1;
        if line.contains(DATE_COLUMN) && line.contains(TIME_COLUMN) && line.contains(INTID_COLUMN)
        {
            return Ok(HeaderPosition {
                line_index,
                byte_offset,
            });
        }
        byte_offset += line.len();
    }
    Err(total_lines)
}

/// Loads a raw volume export and returns one [`RawRecord`] per data row.
///
/// # Errors
///
/// [`LosError::InputNotFound`] if the path is not a file,
/// [`LosError::HeaderNotFound`] if no line names `DATE`, `TIME` and `INTID`,
/// [`LosError::EmptyDataset`] if no data rows survive.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_and_prepare(path: &Path) -> Result<Vec<RawRecord>> {
    if !path.is_file() {
        return Err(LosError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let header = find_header(&content).map_err(|total_lines| LosError::HeaderNotFound {
        path: path.to_path_buf(),
        total_lines,
    })?;
    debug!(header_line = header.line_index + 1, "Header row located");

    let records = parse_table(&content[header.byte_offset..])?;
    if records.is_empty() {
        return Err(LosError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    info!(rows = records.len(), "Raw volume table parsed");
    Ok(records)
}

/// Maps each expected column name to its index in the file, if present.
struct ColumnIndex {
    width: usize,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let expected: Vec<&str> = [DATE_COLUMN, TIME_COLUMN, INTID_COLUMN]
            .into_iter()
            .chain(Movement::ALL.iter().map(|m| m.code()))
            .collect();

        let mut positions = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            if name.is_empty() || !expected.contains(&name) {
                continue;
            }
            positions.entry(name.to_string()).or_insert(i);
        }

        for name in &expected {
            if !positions.contains_key(*name) {
                debug!(column = *name, "Column absent, filling with 0");
            }
        }

        Self {
            width: headers.len(),
            positions,
        }
    }

    /// `None` when the column is absent from the file, `Some("")` when the
    /// column exists but this (short) row has no cell for it.
    fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.positions
            .get(name)
            .map(|&i| record.get(i).unwrap_or(""))
    }

    /// Rows longer than the header are malformed, except for trailing empty cells.
    fn accepts(&self, record: &StringRecord) -> bool {
        record.len() <= self.width || record.iter().skip(self.width).all(str::is_empty)
    }
}

/// Second pass: reads the table starting at the header line.
fn parse_table(text: &str) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns = ColumnIndex::from_headers(rdr.headers()?);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        match result {
            Ok(record) if columns.accepts(&record) => rows.push(record),
            Ok(_) | Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "Skipped malformed data rows");
    }

    let mut dates_and_times = Vec::with_capacity(rows.len());
    let mut partial = Vec::with_capacity(rows.len());
    for record in &rows {
        let date = columns.cell(record, DATE_COLUMN).unwrap_or("0").to_string();
        let time = normalize_time(columns.cell(record, TIME_COLUMN).unwrap_or("0"));
        let intersection_id = match columns.cell(record, INTID_COLUMN) {
            Some(raw) => parse_intersection_id(raw),
            None => Some(0),
        };

        let mut movements = MovementVolumes::default();
        for movement in Movement::ALL {
            if let Some(raw) = columns.cell(record, movement.code()) {
                movements.set(movement, coerce_volume(raw));
            }
        }

        dates_and_times.push((date.clone(), time.clone()));
        partial.push(RawRecord {
            date,
            time,
            intersection_id,
            movements,
            timestamp: None,
        });
    }

    let (timestamps, strategy) = build_timestamps(&dates_and_times);
    match strategy {
        Some(strategy) => debug!(?strategy, "Datetime strategy selected"),
        None if !partial.is_empty() => warn!("No datetime strategy matched any row"),
        None => {}
    }

    Ok(partial
        .into_iter()
        .zip(timestamps)
        .map(|(record, timestamp)| RawRecord {
            timestamp,
            ..record
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_normalize_time_variants() {
        assert_eq!(normalize_time("0000"), "00:00");
        assert_eq!(normalize_time("=\"0930\""), "09:30");
        assert_eq!(normalize_time("930"), "09:30");
        assert_eq!(normalize_time("1745"), "17:45");
        assert_eq!(normalize_time(" 07:15 "), "07:15");
    }

    #[test]
    fn test_normalize_time_falls_back_to_midnight() {
        assert_eq!(normalize_time(""), "00:00");
        assert_eq!(normalize_time("5"), "00:00");
        assert_eq!(normalize_time("45"), "00:00");
        assert_eq!(normalize_time("abc"), "00:00");
        assert_eq!(normalize_time("070000"), "00:00");
    }

    #[test]
    fn test_coerce_volume() {
        assert_eq!(coerce_volume("12"), 12.0);
        assert_eq!(coerce_volume(" 7.5 "), 7.5);
        assert_eq!(coerce_volume(""), 0.0);
        assert_eq!(coerce_volume("n/a"), 0.0);
        assert_eq!(coerce_volume("-4"), 0.0);
        assert_eq!(coerce_volume("NaN"), 0.0);
    }

    #[test]
    fn test_parse_intersection_id() {
        assert_eq!(parse_intersection_id("3"), Some(3));
        assert_eq!(parse_intersection_id("3.0"), Some(3));
        assert_eq!(parse_intersection_id("3.5"), None);
        assert_eq!(parse_intersection_id(""), None);
    }

    #[test]
    fn test_find_header_skips_preamble() {
        let content = "Report\nGenerated 2025\nDATE,TIME,INTID,NBL\n01/01/2025,0700,1,5\n";
        let pos = find_header(content).unwrap();
        assert_eq!(pos.line_index, 2);
        assert!(content[pos.byte_offset..].starts_with("DATE,TIME,INTID"));
    }

    #[test]
    fn test_find_header_reports_line_count() {
        assert_eq!(find_header("a\nb\nc\n"), Err(3));
    }

    #[test]
    fn test_header_not_found() {
        let file = write_csv("junk\nDATE,TIME\n1,2\n");
        let err = load_and_prepare(file.path()).unwrap_err();
        assert!(matches!(err, LosError::HeaderNotFound { total_lines: 3, .. }));
    }

    #[test]
    fn test_empty_dataset() {
        let file = write_csv("DATE,TIME,INTID,NBL\n");
        let err = load_and_prepare(file.path()).unwrap_err();
        assert!(matches!(err, LosError::EmptyDataset { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_and_prepare(Path::new("/nonexistent/volumes.csv")).unwrap_err();
        assert!(matches!(err, LosError::InputNotFound { .. }));
    }

    #[test]
    fn test_parses_messy_export() {
        let file = write_csv(
            "Vehicle Volume Report\n\
             Site list,1,2\n\
             DATE,TIME,INTID,NBL,NBT,SBL,EXTRA,\n\
             01/01/2025,=\"0700\",1,100,20,abc,zzz,\n\
             01/01/2025,=\"0715\",1,5,,3,zzz,\n\
             01/01/2025,0730,1,1,2,3,4,5,6,7\n",
        );
        let records = load_and_prepare(file.path()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.time, "07:00");
        assert_eq!(first.intersection_id, Some(1));
        assert_eq!(first.movements.get(Movement::NorthboundLeft), 100.0);
        assert_eq!(first.movements.get(Movement::NorthboundThrough), 20.0);
        assert_eq!(first.movements.get(Movement::SouthboundLeft), 0.0);
        assert_eq!(first.movements.get(Movement::WestboundRight), 0.0);
        assert_eq!(first.movements.total(), 120.0);
        assert_eq!(first.timestamp, Some(at(2025, 1, 1, 7, 0)));

        assert_eq!(records[1].movements.total(), 8.0);
        assert_eq!(records[1].timestamp, Some(at(2025, 1, 1, 7, 15)));
    }

    #[test]
    fn test_missing_intid_column_is_zero() {
        let file = write_csv("DATE,TIME,INTID_NAME\n01/02/2025,0800,x\n");
        let records = load_and_prepare(file.path()).unwrap();
        assert_eq!(records[0].intersection_id, Some(0));
        assert_eq!(records[0].timestamp, Some(at(2025, 1, 2, 8, 0)));
    }

    #[test]
    fn test_strategy_is_chosen_per_column() {
        let cells = vec![
            ("01/01/2025".to_string(), "07:00".to_string()),
            ("2025-01-01".to_string(), "08:00".to_string()),
        ];
        let (timestamps, strategy) = build_timestamps(&cells);
        assert_eq!(strategy, Some(DateTimeStrategy::MonthDayYearMinutes));
        assert_eq!(timestamps, vec![Some(at(2025, 1, 1, 7, 0)), None]);
    }

    #[test]
    fn test_generic_strategy() {
        let cells = vec![("2025-03-04".to_string(), "09:30".to_string())];
        let (timestamps, strategy) = build_timestamps(&cells);
        assert_eq!(strategy, Some(DateTimeStrategy::Generic));
        assert_eq!(timestamps, vec![Some(at(2025, 3, 4, 9, 30))]);
    }

    #[test]
    fn test_seconds_strategy_precedes_generic() {
        let with_seconds = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(7, 15, 30)
            .unwrap();
        assert_eq!(
            DateTimeStrategy::MonthDayYearSeconds.parse("01/01/2025", "07:15:30"),
            Some(with_seconds)
        );
        assert_eq!(
            DateTimeStrategy::MonthDayYearMinutes.parse("01/01/2025", "07:15:30"),
            None
        );

        let cells = vec![
            ("01/01/2025".to_string(), "07:15:30".to_string()),
            ("2025-01-02".to_string(), "08:00".to_string()),
        ];
        let (timestamps, strategy) = build_timestamps(&cells);
        assert_eq!(strategy, Some(DateTimeStrategy::MonthDayYearSeconds));
        assert_eq!(timestamps, vec![Some(with_seconds), None]);
    }

    #[test]
    fn test_date_only_strategy() {
        let cells = vec![
            ("01/01/2025".to_string(), "25:00".to_string()),
            ("01/02/2025".to_string(), "99:99".to_string()),
        ];
        let (timestamps, strategy) = build_timestamps(&cells);
        assert_eq!(strategy, Some(DateTimeStrategy::DateOnly));
        assert_eq!(
            timestamps,
            vec![Some(at(2025, 1, 1, 0, 0)), Some(at(2025, 1, 2, 0, 0))]
        );
    }

    #[test]
    fn test_no_strategy_matches() {
        let cells = vec![("garbage".to_string(), "00:00".to_string())];
        let (timestamps, strategy) = build_timestamps(&cells);
        assert_eq!(strategy, None);
        assert_eq!(timestamps, vec![None]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2025-01-01 07:00:00"),
            Some(at(2025, 1, 1, 7, 0))
        );
        assert_eq!(parse_timestamp("2025-01-01 07:00"), Some(at(2025, 1, 1, 7, 0)));
        assert_eq!(parse_timestamp("2025-01-01"), Some(at(2025, 1, 1, 0, 0)));
        assert_eq!(parse_timestamp("not a date"), None);
    }
}
