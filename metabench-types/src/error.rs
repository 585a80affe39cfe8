//! Errors raised while loading saved runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading a saved benchmark run.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read `{}`", path.display())]
    Io {
        /// Path of the saved run.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not contain a valid list of measurements.
    #[error("failed to decode measurements from `{}`", path.display())]
    Decode {
        /// Path of the saved run.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
