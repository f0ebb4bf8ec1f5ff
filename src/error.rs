// Error taxonomy shared by every component of the clustering pipeline.

use std::path::{Path, PathBuf};

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All failure modes surfaced to callers.
///
/// Errors raised inside a shard read abort the current pass; scoped device
/// resources release on the way out and the error propagates unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid k, unknown format, unknown distance key, unknown seeder key.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Path missing, permission denied, truncated shard.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unrecognized extension or corrupt file.
    #[error("{path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// No device, kernel build failure, device OOM.
    #[error("accelerator unavailable: {reason}")]
    Accelerator {
        reason: String,
        /// Compiler output when the kernel source failed to build.
        build_log: Option<String>,
    },

    /// Mismatched column counts or non-finite values where not tolerated.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// A structural invariant of the data model was violated.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// The run was cancelled between shards.
    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Builds a format error for `path`.
    pub fn format(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Maps an Arrow error raised while reading or writing `path`.
    ///
    /// Arrow folds OS-level failures into its own error type; unfold them back
    /// into `Io` so callers can keep the taxonomy clean.
    pub fn from_arrow(path: impl AsRef<Path>, err: arrow::error::ArrowError) -> Self {
        match err {
            arrow::error::ArrowError::IoError(_, source) => Self::io(path, source),
            other => Self::format(path, other.to_string()),
        }
    }

    /// Maps a Parquet error raised while reading or writing `path`.
    pub fn from_parquet(path: impl AsRef<Path>, err: parquet::errors::ParquetError) -> Self {
        Self::format(path, err.to_string())
    }
}
