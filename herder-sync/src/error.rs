//! Error types for herder-sync.

use std::path::PathBuf;

use thiserror::Error;

use herder_core::{CoreError, HerdName};

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad input from the caller: empty repo path, malformed target name.
    #[error("validation error: {0}")]
    Validation(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two herds provide the same canonical path.
    #[error("conflict: {path} provided by both herd {first:?} and {second:?}")]
    Conflict {
        path: String,
        first: HerdName,
        second: HerdName,
    },

    /// A herd directory has a `herd.json` that cannot be parsed.
    #[error("failed to parse herd metadata at {path}: {source}")]
    HerdMeta {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (manifest).
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings or name validation failure from herder-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The archive-extraction target was built without a bundled tree.
    #[error("target {target}: bundled source is unavailable")]
    MissingBundle { target: String },

    /// Two source documents map to the same output path within one target.
    #[error("duplicate output {path}: produced by more than one source document")]
    DuplicateOutput { path: String },

    /// The run observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,

    /// A target's install failed; wraps the cause with the target name.
    #[error("target {name}: {source}")]
    Target {
        name: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// True when the failure stems from caller input rather than the
    /// filesystem or content, including failures wrapped by a target.
    pub fn is_validation(&self) -> bool {
        match self {
            SyncError::Validation(_) => true,
            SyncError::Core(CoreError::InvalidName { .. }) => true,
            SyncError::Target { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// True when the run stopped because of a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        match self {
            SyncError::Cancelled => true,
            SyncError::Target { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
