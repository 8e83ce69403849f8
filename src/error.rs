//! Structural errors raised by the pipeline stages.
//!
//! Row-level problems never surface here: they are coerced to safe defaults
//! where they occur.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LosError {
    #[error("CSV not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error(
        "Could not find header row with DATE,TIME,INTID columns in {}. File has {total_lines} lines. Please check the CSV format.",
        .path.display()
    )]
    HeaderNotFound { path: PathBuf, total_lines: usize },

    #[error("No data rows found in {} after parsing.", .path.display())]
    EmptyDataset { path: PathBuf },

    #[error("Missing required columns in source CSV: {missing:?}")]
    MissingColumns { missing: Vec<String> },

    #[error(
        "Source file not found: {}. Run 'traffic_los calc' first to generate hourly LOS.",
        .path.display()
    )]
    SourceNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, LosError>;
