//! Human-readable console reports.
//!
//! Every renderer returns the full report text so the binary decides where
//! it goes.

use comfy_table::{Cell, Table, TableComponent, presets};

use crate::analyzers::hours::{compress_times, day_lines};
use crate::analyzers::types::{AverageRow, Extreme, ExtremeSummary, HourlyRecord, ProfileRow};

/// Borderless table with a dashed rule under the header.
fn plain_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_style(TableComponent::HeaderLines, '-');
    table.set_header(header);
    table
}

fn push_table(out: &mut String, table: &Table) {
    out.push_str(&table.to_string());
    out.push('\n');
}

/// One line per hourly row, in the order given.
pub fn render_hourly(rows: &[HourlyRecord]) -> String {
    let mut out = String::from("Hourly LOS by intersection:\n");
    for row in rows {
        out.push_str(&format!(
            "INTID {} | {} | volume={} | LOS={} | score={}\n",
            row.intersection_id,
            row.hour.format("%Y-%m-%d %H:%M:%S"),
            row.total_volume,
            row.los_grade,
            row.los_score
        ));
    }
    out
}

pub fn render_averages(rows: &[AverageRow]) -> String {
    let mut out = String::from("Average of hourly LOS scores per intersection (no rounding):\n");
    let mut table = plain_table(vec!["INTID", "AvgHourlyScore", "LOS"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.intersection_id),
            Cell::new(format!("{:.2}", row.avg_hourly_score)),
            Cell::new(row.avg_grade),
        ]);
    }
    push_table(&mut out, &table);
    out
}

/// Per-intersection lines followed by the network-wide top-N table.
pub fn render_extremes(
    extreme: Extreme,
    per_intersection: &[ExtremeSummary],
    overall: &[HourlyRecord],
) -> String {
    let title = extreme.title();
    let mut out = format!("{title} LOS per intersection:\n");

    for summary in per_intersection {
        match extreme {
            Extreme::Best => {
                let ranges = compress_times(&summary.hours);
                let times = if ranges.is_empty() {
                    "No data".to_string()
                } else {
                    ranges.join(", ")
                };
                out.push_str(&format!(
                    "INTID {} | Best LOS {} (score {}) | Times: {}\n",
                    summary.intersection_id, summary.grade, summary.score, times
                ));
            }
            Extreme::Worst => {
                out.push_str(&format!(
                    "INTID {} | Worst LOS {} (score {})\n",
                    summary.intersection_id, summary.grade, summary.score
                ));
                for line in day_lines(&summary.hours) {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        }
    }

    out.push_str(&format!(
        "\nOverall {} hours across intersections:\n",
        extreme.prefix()
    ));
    let mut table = plain_table(vec!["INTID", "Date", "Time", "LOS", "Score", "Volume"]);
    for row in overall {
        table.add_row(vec![
            Cell::new(row.intersection_id),
            Cell::new(row.hour.format("%Y-%m-%d")),
            Cell::new(row.hour.format("%H:%M")),
            Cell::new(row.los_grade),
            Cell::new(row.los_score),
            Cell::new(row.total_volume),
        ]);
    }
    push_table(&mut out, &table);
    out
}

pub fn render_profile(rows: &[ProfileRow]) -> String {
    let mut out = String::from("Average hourly volume by intersection and hour of day:\n");
    let mut table = plain_table(vec!["INTID", "Hour", "AvgVolume"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.intersection_id),
            Cell::new(format!("{:02}:00", row.hour_of_day)),
            Cell::new(format!("{:.1}", row.avg_total_volume)),
        ]);
    }
    push_table(&mut out, &table);
    out
}
