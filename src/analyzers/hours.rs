//! Rendering of hour buckets as compact time windows.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};

const MINUTES_PER_HOUR: u32 = 60;

/// `YYYY-MM-DD HH:MM`, the format used in summary tables.
pub fn format_hour(hour: &NaiveDateTime) -> String {
    hour.format("%Y-%m-%d %H:%M").to_string()
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn minute_of_day(ts: &NaiveDateTime) -> u32 {
    ts.hour() * MINUTES_PER_HOUR + ts.minute()
}

/// Collapses times of day into ranges of consecutive hours.
///
/// Dates are ignored. `07:00, 08:00, 09:00, 15:00` becomes
/// `["07:00–09:00", "15:00"]`.
pub fn compress_times(times: &[NaiveDateTime]) -> Vec<String> {
    let minutes: BTreeSet<u32> = times.iter().map(minute_of_day).collect();

    let mut ranges = Vec::new();
    let mut run: Option<(u32, u32)> = None;
    for m in minutes {
        run = match run {
            Some((start, prev)) if m == prev + MINUTES_PER_HOUR => Some((start, m)),
            Some((start, prev)) => {
                ranges.push(render_range(start, prev));
                Some((m, m))
            }
            None => Some((m, m)),
        };
    }
    if let Some((start, prev)) = run {
        ranges.push(render_range(start, prev));
    }
    ranges
}

fn render_range(start: u32, end: u32) -> String {
    if start == end {
        format_minutes(start)
    } else {
        format!("{}–{}", format_minutes(start), format_minutes(end))
    }
}

/// One line per calendar date, `- YYYY-MM-DD: 07:00–08:00; 15:00`, or
/// `- YYYY-MM-DD: All hours` when every `HH:00` of that day is present.
pub fn day_lines(hours: &[NaiveDateTime]) -> Vec<String> {
    let mut by_date: BTreeMap<NaiveDate, Vec<NaiveDateTime>> = BTreeMap::new();
    for hour in hours {
        by_date.entry(hour.date()).or_default().push(*hour);
    }

    let full_day: BTreeSet<u32> = (0..24).map(|h| h * MINUTES_PER_HOUR).collect();

    let mut lines: Vec<String> = by_date
        .into_iter()
        .map(|(date, times)| {
            let present: BTreeSet<u32> = times.iter().map(minute_of_day).collect();
            if present == full_day {
                format!("- {date}: All hours")
            } else {
                format!("- {date}: {}", compress_times(&times).join("; "))
            }
        })
        .collect();
    lines.sort();
    lines
}
