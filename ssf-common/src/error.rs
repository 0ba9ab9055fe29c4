//! Common error types for the severity framework service

use thiserror::Error;

/// Common result type for framework operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the HTTP service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input or CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input rejected before any store access
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A specific CSV row failed validation, resolution or write.
    /// `row` is the 1-based line number in the uploaded file (header = line 1).
    #[error("Row {row}: {message}")]
    Row { row: usize, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Attach a CSV line number to an error raised while processing that row
    pub fn at_row(self, row: usize) -> Self {
        match self {
            Error::Row { .. } => self,
            other => Error::Row {
                row,
                message: other.to_string(),
            },
        }
    }
}
