//! Error taxonomy for the analysis core.
//!
//! Every variant here is recoverable at batch level: the orchestrator logs
//! the error, skips the offending file or row, and continues.

use std::path::PathBuf;

use thiserror::Error;

use crate::channel::InvalidReason;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The file could not be decoded into an intensity array
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image cannot be reduced to a single analysis channel
    #[error("invalid image {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: InvalidReason },

    /// The result sink rejected a row; the row is lost, the batch continues
    #[error("result sink write failed: {0}")]
    Sink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
