use crate::analyzers::grade::{LosGrade, classify_volume};
use crate::analyzers::types::{ClassifiedInterval, HourlyRecord, RawRecord};
use crate::analyzers::utility::round_half_up;
use chrono::{NaiveDateTime, Timelike};
use std::collections::HashMap;
use tracing::{debug, info};

/// Running sums for one `(INTID, hour)` bucket.
#[derive(Default)]
struct HourBucket {
    volume: f64,
    score_sum: u32,
    intervals: u32,
}

/// Truncates a timestamp to the start of its hour.
pub fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

/// Totals and grades every 15-minute record against `thresholds`.
pub fn classify_intervals(
    thresholds: &[(f64, LosGrade)],
    records: Vec<RawRecord>,
) -> Vec<ClassifiedInterval> {
    records
        .into_iter()
        .map(|record| {
            let total_volume = record.movements.total();
            ClassifiedInterval {
                los_grade: classify_volume(thresholds, total_volume),
                total_volume,
                record,
            }
        })
        .collect()
}

/// Rolls classified intervals up to one [`HourlyRecord`] per intersection and hour.
///
/// The hourly score is the mean of the interval scores rounded half-up.
/// Intervals without a timestamp or intersection id are left out.
/// Output order is unspecified.
#[tracing::instrument(skip_all, fields(intervals = intervals.len()))]
pub fn compute_hourly_los(intervals: &[ClassifiedInterval]) -> Vec<HourlyRecord> {
    let mut buckets: HashMap<(i64, NaiveDateTime), HourBucket> = HashMap::new();
    let mut excluded = 0usize;

    for interval in intervals {
        let (Some(intersection_id), Some(timestamp)) =
            (interval.record.intersection_id, interval.record.timestamp)
        else {
            excluded += 1;
            continue;
        };

        let bucket = buckets
            .entry((intersection_id, floor_to_hour(timestamp)))
            .or_default();
        bucket.volume += interval.total_volume;
        bucket.score_sum += u32::from(interval.los_score());
        bucket.intervals += 1;
    }

    if excluded > 0 {
        debug!(excluded, "Intervals without timestamp or INTID left out");
    }

    let hourly: Vec<HourlyRecord> = buckets
        .into_iter()
        .map(|((intersection_id, hour), bucket)| {
            let mean_score = f64::from(bucket.score_sum) / f64::from(bucket.intervals);
            let los_score = round_half_up(mean_score).clamp(1.0, 6.0) as u8;
            HourlyRecord {
                intersection_id,
                hour,
                total_volume: bucket.volume.round() as u64,
                los_score,
                los_grade: LosGrade::from_score(los_score).unwrap_or(LosGrade::F),
            }
        })
        .collect();

    info!(hours = hourly.len(), "Hourly LOS computed");
    hourly
}

/// Sorts hourly rows by intersection, then hour, for display and persistence.
pub fn sort_hourly(rows: &mut [HourlyRecord]) {
    rows.sort_by(|a, b| {
        a.intersection_id
            .cmp(&b.intersection_id)
            .then(a.hour.cmp(&b.hour))
    });
}
