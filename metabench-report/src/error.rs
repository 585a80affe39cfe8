//! Errors raised while rendering outputs.

use thiserror::Error;

use crate::output::OutputKind;

/// Errors that can occur while rendering measurements.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The output only supports a single run.
    ///
    /// This is checked before anything is written.
    #[error("'{output}' supports exactly one run, got {count}")]
    UnsupportedRunCount {
        /// The requested output.
        output: OutputKind,
        /// Number of runs that were passed.
        count: usize,
    },

    /// Writing to the output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding measurements as JSON failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for rendering operations.
pub type ReportResult<T> = Result<T, ReportError>;
