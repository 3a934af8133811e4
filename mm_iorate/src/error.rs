use std::io;

use thiserror::Error;

use crate::rate::Rate;

/// Result type for building rate limited streams
pub type Result<T> = std::result::Result<T, PacingError>;

/// Errors raised while configuring a rate limited stream
#[derive(Error, Debug)]
pub enum PacingError {
    /// Builder finished without a rate
    #[error("Rate must be set")]
    MissingRate,

    /// Rate of zero bytes per second
    #[error("Rate must be greater than 0 bytes per second")]
    ZeroRate,

    /// Interval of zero length
    #[error("Interval must be greater than 0")]
    ZeroInterval,

    /// Rate too low to move a single byte within one interval
    #[error("Rate {rate} moves no bytes within a {interval_ms}ms interval")]
    BudgetTooSmall { rate: Rate, interval_ms: u64 },

    /// Rate string that does not parse
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// Configuration source could not be read or deserialised
    #[error("Failed to load pacing config: {0}")]
    Config(#[from] config::ConfigError),
}

/// Errors raised by a single paced transfer
///
/// Every variant carries the number of bytes moved before the call stopped, so callers
/// never lose track of data that already crossed the underlying stream.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The underlying stream reported a failure
    #[error("Underlying stream failed after {transferred} bytes: {source}")]
    Io { transferred: usize, source: io::Error },

    /// The underlying source ran dry before the buffer was filled
    #[error("End of stream reached after {transferred} bytes")]
    EndOfStream { transferred: usize },

    /// The call was cancelled at a sleep boundary
    #[error("Transfer cancelled after {transferred} bytes")]
    Cancelled { transferred: usize },
}

impl TransferError {
    /// Bytes that crossed the underlying stream before the call stopped
    pub fn transferred(&self) -> usize {
        match self {
            TransferError::Io { transferred, .. } | TransferError::EndOfStream { transferred } | TransferError::Cancelled { transferred } => {
                *transferred
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled { .. })
    }
}

impl From<TransferError> for io::Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io { source, .. } => source,
            eof @ TransferError::EndOfStream { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, eof),
            cancelled @ TransferError::Cancelled { .. } => io::Error::new(io::ErrorKind::Interrupted, cancelled),
        }
    }
}
