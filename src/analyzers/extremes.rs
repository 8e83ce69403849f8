//! Best and worst hours per intersection and across the whole network.

use crate::analyzers::grade::LosGrade;
use crate::analyzers::types::{Extreme, ExtremeSummary, HourlyRecord};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_TOP: usize = 10;

impl Extreme {
    /// `Greater` when `a` is a better candidate than `b` for this extreme.
    fn rank(self, a: &HourlyRecord, b: &HourlyRecord) -> Ordering {
        let by_score = a.los_score.cmp(&b.los_score);
        let by_volume = a.total_volume.cmp(&b.total_volume);
        match self {
            Extreme::Best => by_score.then(by_volume).reverse(),
            Extreme::Worst => by_score.then(by_volume),
        }
    }

    fn beats(self, score: u8, current: u8) -> bool {
        match self {
            Extreme::Best => score < current,
            Extreme::Worst => score > current,
        }
    }
}

/// For every intersection, the extreme hourly score and all hours that hit it.
pub fn build_per_intersection(extreme: Extreme, rows: &[HourlyRecord]) -> Vec<ExtremeSummary> {
    let mut by_intersection: BTreeMap<i64, (u8, Vec<NaiveDateTime>)> = BTreeMap::new();

    for row in rows {
        by_intersection
            .entry(row.intersection_id)
            .and_modify(|(score, hours)| {
                if extreme.beats(row.los_score, *score) {
                    *score = row.los_score;
                    hours.clear();
                    hours.push(row.hour);
                } else if row.los_score == *score {
                    hours.push(row.hour);
                }
            })
            .or_insert_with(|| (row.los_score, vec![row.hour]));
    }

    by_intersection
        .into_iter()
        .map(|(intersection_id, (score, mut hours))| {
            hours.sort();
            hours.dedup();
            ExtremeSummary {
                intersection_id,
                score,
                grade: LosGrade::from_score(score).unwrap_or(LosGrade::F),
                hours,
            }
        })
        .collect()
}

/// The `top` most extreme hours across all intersections.
///
/// Best ranks by score then volume ascending, worst by both descending.
/// Equal rows keep their input order.
pub fn build_overall(extreme: Extreme, rows: &[HourlyRecord], top: usize) -> Vec<HourlyRecord> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| extreme.rank(b, a));
    ranked.truncate(top);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn row(intid: i64, hour: NaiveDateTime, score: u8, volume: u64) -> HourlyRecord {
        HourlyRecord {
            intersection_id: intid,
            hour,
            total_volume: volume,
            los_score: score,
            los_grade: LosGrade::from_score(score).unwrap(),
        }
    }

    #[test]
    fn test_best_collects_all_minimum_hours() {
        let rows = vec![
            row(7, at(17, 9), 2, 700),
            row(7, at(17, 10), 3, 1000),
            row(7, at(17, 6), 2, 650),
            row(7, at(17, 11), 5, 1700),
        ];
        let best = build_per_intersection(Extreme::Best, &rows);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].intersection_id, 7);
        assert_eq!(best[0].score, 2);
        assert_eq!(best[0].grade, LosGrade::B);
        assert_eq!(best[0].hours, vec![at(17, 6), at(17, 9)]);
    }

    #[test]
    fn test_worst_resets_on_higher_score() {
        let rows = vec![
            row(1, at(17, 7), 3, 1),
            row(1, at(17, 8), 5, 1),
            row(1, at(17, 8), 5, 1),
            row(2, at(17, 8), 1, 1),
        ];
        let worst = build_per_intersection(Extreme::Worst, &rows);
        assert_eq!(worst[0].score, 5);
        assert_eq!(worst[0].hours, vec![at(17, 8)]);
        assert_eq!(worst[1].intersection_id, 2);
        assert_eq!(worst[1].grade, LosGrade::A);
    }

    #[test]
    fn test_overall_best_breaks_ties_on_lower_volume() {
        let rows = vec![
            row(1, at(17, 7), 2, 800),
            row(2, at(17, 7), 1, 300),
            row(3, at(17, 7), 1, 100),
            row(4, at(17, 7), 6, 5000),
        ];
        let ids: Vec<_> = build_overall(Extreme::Best, &rows, 3)
            .iter()
            .map(|r| r.intersection_id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_overall_worst_breaks_ties_on_higher_volume() {
        let rows = vec![
            row(1, at(17, 7), 6, 7000),
            row(2, at(17, 7), 6, 9000),
            row(3, at(17, 7), 4, 100),
        ];
        let ids: Vec<_> = build_overall(Extreme::Worst, &rows, DEFAULT_TOP)
            .iter()
            .map(|r| r.intersection_id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_overall_is_stable_for_equal_rows() {
        let rows = vec![
            row(5, at(17, 7), 4, 10),
            row(3, at(17, 8), 4, 10),
            row(4, at(17, 9), 4, 10),
        ];
        let ids: Vec<_> = build_overall(Extreme::Worst, &rows, 2)
            .iter()
            .map(|r| r.intersection_id)
            .collect();
        assert_eq!(ids, vec![5, 3]);
    }
}
