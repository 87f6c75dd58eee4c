//! Error types for hcal-summary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Calibration error: {0}")]
    Core(#[from] hcal_core::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected correction table header: {0}")]
    Header(String),

    #[error("Invalid correction row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
