use std::path::PathBuf;

use thiserror::Error;

use crate::publish::PublishError;

#[derive(Error, Debug)]
pub enum BudgitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No .csv files found in {}", dir.display())]
    NoCsvFiles { dir: PathBuf },

    #[error("Unrecognized CSV detected: {}", path.display())]
    UnrecognizedFile { path: PathBuf },

    #[error("{}: line {line}: invalid amount '{value}'", path.display())]
    InvalidAmount {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("{}: line {line}: invalid date '{value}'", path.display())]
    InvalidDate {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("Invalid settings file {}: {source}", path.display())]
    CorruptSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid spreadsheet URL: {0}")]
    InvalidSheetUrl(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BudgitError>;
