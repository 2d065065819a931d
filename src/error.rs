use thiserror::Error;

#[derive(Error, Debug)]
pub enum FortifiError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No import format matches file: {0}")]
    UnknownFormat(String),

    #[error("Column '{0}' not found in header")]
    MissingColumn(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate transaction: {0}")]
    Duplicate(String),

    #[error("Input closed")]
    InputClosed,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FortifiError>;
