//! Crate error type

use crate::board::Hex;

/// Errors raised by fallible engine operations.
///
/// Illegal moves and missing tablebase data are ordinary values, not errors;
/// see [`crate::movegen::IllegalReason`] and [`crate::tablebase::ProbeHit`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cell {0} is not on the board")]
    OffBoard(Hex),

    #[error("unsupported tablebase configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("invalid tablebase name: {0}")]
    InvalidTablebaseName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
