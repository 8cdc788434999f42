//! Error types for the dashboard pipeline.
//!
//! Structural problems (a required column cannot be found, the input has
//! no header row, a config file is malformed) surface as
//! [`DashboardError`] and abort the whole computation. Per-row data
//! quality problems never reach this type; they are absorbed by the
//! normalizer and counted in [`crate::normalize::DataQuality`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// A required column could not be located in the header row.
    #[error("missing expected column for {role}: looked for {expected}")]
    MissingColumn { role: String, expected: String },

    /// The input had no header row or no columns at all.
    #[error("input table is empty: {0}")]
    EmptyTable(String),

    /// Configuration was readable but semantically invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
