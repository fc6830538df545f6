//! Hash-gated atomic file writer.
//!
//! ## `atomic_write` protocol
//!
//! 1. SHA-256 hash the new content.
//! 2. Hash the file currently on disk (if any) → skip if identical.
//! 3. Dry-run stops here with [`WriteResult::WouldWrite`].
//! 4. Create parent directories, write to `<path>.herder.tmp`.
//! 5. Rename to final path (atomic on POSIX); remove the tmp on failure.
//!
//! Readers never observe a partially written file. Bytes are written
//! verbatim.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// Suffix of the sibling temp file used during a write.
pub const TMP_SUFFIX: &str = ".herder.tmp";

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped; on-disk content already matches.
    Unchanged { path: PathBuf },
    /// Dry-run mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// Atomically write `content` to `path` unless the file already holds it.
pub fn atomic_write(path: &Path, content: &[u8], dry_run: bool) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    atomic_write_with_tmp(path, content, dry_run, &tmp)
}

fn atomic_write_with_tmp(
    path: &Path,
    content: &[u8],
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, SyncError> {
    let digest = content_digest(content);
    if existing_digest(path)?.as_deref() == Some(digest.as_str()) {
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
        });
    }

    if dry_run {
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Hex SHA-256 of `content`.
pub fn content_digest(content: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(content);
    hex::encode(h.finalize())
}

fn existing_digest(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(content_digest(&bytes))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        // A directory in the way surfaces as a write error below.
        Err(_) if path.is_dir() => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
