use std::process::ExitStatus;

use thiserror::Error;

/// Errors returned by a [`Client`](crate::Client).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration is incomplete.
    #[error("invalid client configuration: {0}")]
    Config(&'static str),

    /// The command could not be started.
    #[error("failed to run `{program}`")]
    Spawn {
        /// The program that was run.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The command exited unsuccessfully.
    #[error("`{program}` failed with {status}\n{stderr}\n{stdout}")]
    Command {
        /// The program that was run.
        program: String,
        /// The exit status of the process.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
        /// Captured standard output.
        stdout: String,
    },

    /// The command output could not be parsed.
    #[error("failed to decode `{program}` output")]
    Decode {
        /// The program that was run.
        program: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
