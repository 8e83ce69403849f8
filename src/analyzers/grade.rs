use serde::Serialize;
use std::fmt;

/// Level-of-Service grade, `A` (free flow) through `F` (breakdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LosGrade {
    A,
    B,
    C,
    D,
    E,
    F,
}

/// Ordinal encoding shared by the classifier, the aggregator and the reducers.
pub const GRADE_SCORES: [(LosGrade, u8); 6] = [
    (LosGrade::A, 1),
    (LosGrade::B, 2),
    (LosGrade::C, 3),
    (LosGrade::D, 4),
    (LosGrade::E, 5),
    (LosGrade::F, 6),
];

/// Inclusive upper bounds on a 15-minute total volume, ascending.
/// Anything above the last bound is `F`.
pub const VOLUME_THRESHOLDS: [(f64, LosGrade); 5] = [
    (600.0, LosGrade::A),
    (900.0, LosGrade::B),
    (1200.0, LosGrade::C),
    (1500.0, LosGrade::D),
    (1800.0, LosGrade::E),
];

/// Exclusive upper bounds on an unrounded mean hourly score, ascending.
///
/// These are narrower than the integer midpoints on purpose, so an average
/// lands on the worse letter sooner than plain rounding would.
pub const AVERAGE_BANDS: [(f64, LosGrade); 5] = [
    (1.2, LosGrade::A),
    (2.0, LosGrade::B),
    (2.8, LosGrade::C),
    (3.6, LosGrade::D),
    (4.4, LosGrade::E),
];

impl LosGrade {
    pub fn score(self) -> u8 {
        GRADE_SCORES
            .iter()
            .find(|(grade, _)| *grade == self)
            .map(|(_, score)| *score)
            .unwrap_or(6)
    }

    pub fn from_score(score: u8) -> Option<Self> {
        GRADE_SCORES
            .iter()
            .find(|(_, s)| *s == score)
            .map(|(grade, _)| *grade)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LosGrade::A => "A",
            LosGrade::B => "B",
            LosGrade::C => "C",
            LosGrade::D => "D",
            LosGrade::E => "E",
            LosGrade::F => "F",
        }
    }
}

impl fmt::Display for LosGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Maps a 15-minute total volume to a grade.
///
/// | Volume       | Grade |
/// |--------------|-------|
/// | <= 600       | A     |
/// | <= 900       | B     |
/// | <= 1200      | C     |
/// | <= 1500      | D     |
/// | <= 1800      | E     |
/// | otherwise    | F     |
///
/// `NaN` never satisfies a bound and therefore grades `F`.
pub fn classify_volume(thresholds: &[(f64, LosGrade)], total_volume: f64) -> LosGrade {
    thresholds
        .iter()
        .find(|(limit, _)| total_volume <= *limit)
        .map(|(_, grade)| *grade)
        .unwrap_or(LosGrade::F)
}

/// Letter for an unrounded mean hourly score, using [`AVERAGE_BANDS`]-style bounds.
pub fn grade_average(bands: &[(f64, LosGrade)], avg_score: f64) -> LosGrade {
    bands
        .iter()
        .find(|(limit, _)| avg_score < *limit)
        .map(|(_, grade)| *grade)
        .unwrap_or(LosGrade::F)
}
