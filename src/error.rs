use thiserror::Error;

/// Closed set of configuration-time failures the core can report.
///
/// VM halts are never represented here — they are data on `RunResult`,
/// not errors (see `vm::HaltReason`).
#[derive(Debug, Error)]
pub enum SoupError {
    #[error("invalid tape: expected length {expected}, got {actual}")]
    InvalidTape { expected: usize, actual: usize },

    #[error("invalid program: expected length {expected}, got {actual}")]
    InvalidProgram { expected: usize, actual: usize },

    #[error("invalid population: {0}")]
    InvalidPopulation(&'static str),

    #[error("length mismatch: {a} vs {b}")]
    LengthMismatch { a: usize, b: usize },

    #[error("malformed hex in snapshot: {0}")]
    MalformedHex(#[from] hex::FromHexError),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SoupError>;
