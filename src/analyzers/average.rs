use crate::analyzers::grade::{LosGrade, grade_average};
use crate::analyzers::types::{AverageRow, HourlyRecord};
use crate::analyzers::utility::mean;
use std::collections::BTreeMap;

/// Unrounded mean hourly score per intersection, ordered by INTID.
///
/// The letter comes from `bands`, not from rounding the mean.
pub fn compute_intersection_averages(
    bands: &[(f64, LosGrade)],
    rows: &[HourlyRecord],
) -> Vec<AverageRow> {
    let mut scores: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for row in rows {
        scores
            .entry(row.intersection_id)
            .or_default()
            .push(f64::from(row.los_score));
    }

    scores
        .into_iter()
        .map(|(intersection_id, series)| {
            let avg_hourly_score = mean(&series);
            AverageRow {
                intersection_id,
                avg_hourly_score,
                avg_grade: grade_average(bands, avg_hourly_score),
            }
        })
        .collect()
}
