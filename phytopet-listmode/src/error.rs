//! List-mode decoding error types.

use crate::decoder::RecordField;
use crate::rotation::Sentinel;
use thiserror::Error;

/// Result type for list-mode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// List-mode decoding error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A rotation/position marker was not immediately repeated.
    #[error("malformed {sentinel} marker at byte {offset}: expected {expected:#06x}, found {found:#06x}")]
    MalformedSentinel {
        sentinel: Sentinel,
        expected: u16,
        found: u16,
        offset: u64,
    },

    /// The stream ended where the repeat of a marker was expected.
    #[error("stream ended inside {0} marker")]
    TruncatedSentinel(Sentinel),

    /// The stream ended in the middle of a record.
    #[error("stream ended inside {field} at byte {offset}")]
    UnexpectedEnd { field: RecordField, offset: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// The sentinel kind for marker protocol violations.
    #[must_use]
    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            Error::MalformedSentinel { sentinel, .. } | Error::TruncatedSentinel(sentinel) => {
                Some(*sentinel)
            }
            _ => None,
        }
    }
}
