//! Directory traversal decoupled from transformation.
//!
//! [`collect_files`] walks a tree with an explicit worklist and returns a
//! flat list of files sorted by their `/`-separated relative path. Callers
//! transform that list without touching the walk again.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{io_err, SyncError};
use crate::writer::TMP_SUFFIX;

/// One regular file found under a walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// `/`-separated path relative to the walk root.
    pub rel: String,
    /// Absolute path on disk.
    pub path: PathBuf,
}

/// Walk every file under `root`, descending only into directories for which
/// `descend(rel_dir)` returns true.
///
/// A missing `root` yields an empty list. Leftover writer temp files are
/// never reported. Symlinks to files are reported like regular files.
pub fn collect_files(
    root: &Path,
    cancel: &CancelToken,
    descend: impl Fn(&str) -> bool,
) -> Result<Vec<WalkEntry>, SyncError> {
    let mut out = Vec::new();
    let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, rel_dir)) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound && rel_dir.is_empty() => {
                return Ok(vec![]);
            }
            Err(err) => return Err(io_err(&dir, err)),
        };
        for entry in entries {
            cancel.check()?;
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if rel_dir.is_empty() {
                name.clone()
            } else {
                format!("{rel_dir}/{name}")
            };
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            if file_type.is_dir() {
                if descend(&rel) {
                    pending.push((path, rel));
                }
                continue;
            }
            let is_file = if file_type.is_symlink() {
                symlink_is_file(&path)
            } else {
                file_type.is_file()
            };
            if is_file && !name.ends_with(TMP_SUFFIX) {
                out.push(WalkEntry { rel, path });
            }
        }
    }

    out.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(out)
}

/// Symlinked files are read through their link. Links to directories are
/// not followed and dangling links are skipped, both with a warning.
fn symlink_is_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => true,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "symlink does not point at a file, skipping");
            false
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "dangling symlink, skipping");
            false
        }
    }
}

/// Walk every file under `root` without pruning.
pub fn collect_all(root: &Path, cancel: &CancelToken) -> Result<Vec<WalkEntry>, SyncError> {
    collect_files(root, cancel, |_| true)
}

/// Final path component of a `/`-separated relative path.
pub fn base_name(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

/// Parent of a `/`-separated relative path, or `""` at the top level.
pub fn parent_rel(rel: &str) -> &str {
    rel.rfind('/').map(|i| &rel[..i]).unwrap_or("")
}

/// True when `rel` is relative and has no `..` component, so resolving it
/// against a root can never escape that root.
pub fn is_contained(rel: &str) -> bool {
    !rel.is_empty()
        && !rel.starts_with('/')
        && !rel.contains('\\')
        && !rel.contains(':')
        && rel.split('/').all(|part| part != "..")
}

/// Filename without its final extension (`00-general.md` → `00-general`).
pub fn file_stem(rel: &str) -> &str {
    let base = base_name(rel);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(i) => &base[..i],
    }
}
