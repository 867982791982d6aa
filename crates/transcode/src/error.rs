//! Error types for message transcoding and CSV output.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two output streams a write went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Console => f.write_str("console"),
            SinkKind::File => f.write_str("file"),
        }
    }
}

/// Errors that can occur while turning messages into CSV rows.
#[derive(Error, Debug)]
pub enum Error {
    /// The output file could not be created at startup.
    #[error("Failed to open output file '{}': {source}", path.display())]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload is not UTF-8 encoded JSON.
    #[error("Failed to decode JSON: {0}")]
    MalformedPayload(String),

    /// Any other per-message failure.
    #[error("Error processing message: {0}")]
    Processing(String),

    /// Writing a record to one of the sinks failed.
    #[error("Failed to write record to {sink}: {source}")]
    Write {
        sink: SinkKind,
        #[source]
        source: csv::Error,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedPayload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
