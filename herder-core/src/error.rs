//! Error types for herder-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading core configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load, with the file path.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A target or herd name that cannot be used as a manifest key.
    #[error("invalid {kind} name {name:?}: use lowercase letters, digits and '-'")]
    InvalidName { kind: &'static str, name: String },
}
