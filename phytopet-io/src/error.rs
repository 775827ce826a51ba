//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// A crystal pair addresses a record past the end of the histogram.
    #[error(
        "crystal pair ({id1}, {id2}) maps to record {index}, histogram holds {capacity} records"
    )]
    PairOutOfRange {
        id1: u32,
        id2: u32,
        index: u64,
        capacity: u64,
    },

    /// A record index past the end of the histogram.
    #[error("record {index} out of range, histogram holds {capacity} records")]
    RecordOutOfRange { index: u64, capacity: u64 },

    /// Invalid conversion settings.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// List-mode decoding error.
    #[error("list-mode error: {0}")]
    ListModeError(#[from] phytopet_listmode::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] phytopet_core::Error),
}
