//! Level-of-Service classification, hourly aggregation and the summaries
//! built on top of the hourly table.
//!
//! Fifteen-minute volumes are graded against fixed thresholds, averaged per
//! intersection and hour, and then reduced into average, best, worst and
//! hour-of-day views.

pub mod aggregate;
pub mod average;
pub mod extremes;
pub mod grade;
pub mod hours;
pub mod profile;
pub mod types;
pub mod utility;
