use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure conditions raised by the decomposition pipeline.
///
/// Every condition is fatal to the pass that raised it; there is no retry
/// and no partial-success mode.
#[derive(Error, Debug)]
pub enum Error {
    /// A manifest locator no longer resolves to a file.
    #[error("raster not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// A raster file exists but cannot be parsed as a grid.
    #[error("failed to decode raster {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    /// Batch feature dimensionality disagrees with the dimensionality the
    /// model established on its first update.
    #[error("shape mismatch: batch has {got} features, model expects {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    /// An update batch carries fewer samples than the requested component
    /// count, so the factorization cannot produce enough directions.
    #[error("batch of {rows} samples cannot update a {required}-component model")]
    InsufficientBatchSize { rows: usize, required: usize },

    /// Rejected before any raster I/O begins.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Projection was requested from a model that has seen no data.
    #[error("model has not been fitted")]
    NotFitted,

    /// Manifest range context attached by the batch runner.
    #[error("batch [{start}, {end}) failed: {source}")]
    Batch {
        start: usize,
        end: usize,
        #[source]
        source: Box<Error>,
    },

    /// Model snapshot could not be serialized or deserialized.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A condition that is unreachable by construction; raising it is a
    /// defect, not an input problem.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps an error with the half-open manifest range of the batch that
    /// raised it.
    pub(crate) fn in_batch(self, start: usize, end: usize) -> Error {
        Error::Batch {
            start,
            end,
            source: Box::new(self),
        }
    }
}
