//! Error types for oracle construction
//!
//! Query failures are not errors: they surface as [`crate::Unresolved`] so
//! rules can decline. These errors cover loading oracle data.

use std::path::PathBuf;

/// Errors while building an oracle
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// IO error while reading oracle data
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Oracle data is not valid JSON for the expected shape
    #[error("invalid oracle data: {0}")]
    Json(#[from] serde_json::Error),
}

impl OracleError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
