//! Data types that flow through the pipeline and out of the reducers.

use crate::analyzers::grade::LosGrade;
use chrono::NaiveDateTime;
use serde::Serialize;

/// One of the twelve turning movements counted at an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    NorthboundLeft,
    NorthboundThrough,
    NorthboundRight,
    SouthboundLeft,
    SouthboundThrough,
    SouthboundRight,
    EastboundLeft,
    EastboundThrough,
    EastboundRight,
    WestboundLeft,
    WestboundThrough,
    WestboundRight,
}

impl Movement {
    pub const ALL: [Movement; 12] = [
        Movement::NorthboundLeft,
        Movement::NorthboundThrough,
        Movement::NorthboundRight,
        Movement::SouthboundLeft,
        Movement::SouthboundThrough,
        Movement::SouthboundRight,
        Movement::EastboundLeft,
        Movement::EastboundThrough,
        Movement::EastboundRight,
        Movement::WestboundLeft,
        Movement::WestboundThrough,
        Movement::WestboundRight,
    ];

    /// Column name used by the field exports.
    pub fn code(self) -> &'static str {
        match self {
            Movement::NorthboundLeft => "NBL",
            Movement::NorthboundThrough => "NBT",
            Movement::NorthboundRight => "NBR",
            Movement::SouthboundLeft => "SBL",
            Movement::SouthboundThrough => "SBT",
            Movement::SouthboundRight => "SBR",
            Movement::EastboundLeft => "EBL",
            Movement::EastboundThrough => "EBT",
            Movement::EastboundRight => "EBR",
            Movement::WestboundLeft => "WBL",
            Movement::WestboundThrough => "WBT",
            Movement::WestboundRight => "WBR",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Counts for all twelve movements; absent movements hold 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementVolumes([f64; 12]);

impl MovementVolumes {
    pub fn get(&self, movement: Movement) -> f64 {
        self.0[movement.index()]
    }

    pub fn set(&mut self, movement: Movement, volume: f64) {
        self.0[movement.index()] = volume;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

/// A single 15-minute row as read from the field export.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// `DATE` cell, whitespace-trimmed but otherwise untouched.
    pub date: String,
    /// Normalized `HH:MM`.
    pub time: String,
    /// `None` when the `INTID` cell was blank or not an integer.
    pub intersection_id: Option<i64>,
    pub movements: MovementVolumes,
    /// `None` when no datetime could be built for this row.
    pub timestamp: Option<NaiveDateTime>,
}

/// A raw record together with its total volume and grade.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedInterval {
    pub record: RawRecord,
    pub total_volume: f64,
    pub los_grade: LosGrade,
}

impl ClassifiedInterval {
    pub fn los_score(&self) -> u8 {
        self.los_grade.score()
    }
}

/// One row of the canonical hourly results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRecord {
    #[serde(rename = "INTID")]
    pub intersection_id: i64,
    #[serde(with = "hour_format")]
    pub hour: NaiveDateTime,
    pub total_volume: u64,
    pub los_score: u8,
    #[serde(rename = "LOS")]
    pub los_grade: LosGrade,
}

/// Per-intersection mean of the hourly scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageRow {
    #[serde(rename = "INTID")]
    pub intersection_id: i64,
    pub avg_hourly_score: f64,
    #[serde(rename = "avg_LOS")]
    pub avg_grade: LosGrade,
}

/// Which end of the score range an extreme summary looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Best,
    Worst,
}

impl Extreme {
    pub fn prefix(self) -> &'static str {
        match self {
            Extreme::Best => "best",
            Extreme::Worst => "worst",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Extreme::Best => "Best",
            Extreme::Worst => "Worst",
        }
    }
}

/// Per-intersection best or worst score with every hour that reached it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtremeSummary {
    pub intersection_id: i64,
    pub score: u8,
    pub grade: LosGrade,
    /// Sorted, deduplicated.
    pub hours: Vec<NaiveDateTime>,
}

/// The volume-only view of an hourly row, for reports that ignore LOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyVolume {
    pub intersection_id: i64,
    pub hour: NaiveDateTime,
    pub total_volume: u64,
}

/// Mean hourly volume for one intersection at one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    #[serde(rename = "INTID")]
    pub intersection_id: i64,
    pub hour_of_day: u32,
    pub avg_total_volume: f64,
}

pub(crate) mod hour_format {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(hour: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&hour.format(FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_codes_are_unique() {
        let mut codes: Vec<_> = Movement::ALL.iter().map(|m| m.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 12);
    }

    #[test]
    fn test_volumes_total() {
        let mut v = MovementVolumes::default();
        assert_eq!(v.total(), 0.0);
        v.set(Movement::NorthboundLeft, 100.0);
        v.set(Movement::WestboundRight, 50.0);
        assert_eq!(v.get(Movement::NorthboundLeft), 100.0);
        assert_eq!(v.get(Movement::SouthboundThrough), 0.0);
        assert_eq!(v.total(), 150.0);
    }
}
