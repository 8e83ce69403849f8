use crate::analyzers::types::{HourlyVolume, ProfileRow};
use crate::analyzers::utility::mean;
use chrono::Timelike;
use std::collections::BTreeMap;

/// Average hourly volume for each intersection at each hour of the day,
/// across all dates in the table.
pub fn compute_hourly_profile(rows: &[HourlyVolume]) -> Vec<ProfileRow> {
    let mut series: BTreeMap<(i64, u32), Vec<f64>> = BTreeMap::new();
    for row in rows {
        series
            .entry((row.intersection_id, row.hour.hour()))
            .or_default()
            .push(row.total_volume as f64);
    }

    series
        .into_iter()
        .map(|((intersection_id, hour_of_day), volumes)| ProfileRow {
            intersection_id,
            hour_of_day,
            avg_total_volume: mean(&volumes),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(intid: i64, day: u32, h: u32, volume: u64) -> HourlyVolume {
        HourlyVolume {
            intersection_id: intid,
            hour: NaiveDate::from_ymd_opt(2025, 11, day)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
            total_volume: volume,
        }
    }

    #[test]
    fn test_profile_averages_across_days() {
        let rows = vec![
            row(2, 17, 8, 100),
            row(1, 17, 8, 400),
            row(1, 18, 8, 600),
            row(1, 17, 7, 50),
        ];
        let profile = compute_hourly_profile(&rows);
        let got: Vec<_> = profile
            .iter()
            .map(|p| (p.intersection_id, p.hour_of_day, p.avg_total_volume))
            .collect();
        assert_eq!(got, vec![(1, 7, 50.0), (1, 8, 500.0), (2, 8, 100.0)]);
    }
}
