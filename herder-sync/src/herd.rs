//! Herd discovery and merge into the canonical source tree.
//!
//! A herd is a directory under `<herds_dir>` carrying a `herd.json`. Only its
//! `rules/`, `skills/` and `workflows/` subtrees are merged. Two herds
//! providing the same relative path is a hard error, detected before any
//! file is written, so a conflicting merge leaves no copy of either file.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use herder_core::layout::{join_rel, resolve};
use herder_core::{HerdName, Layout};

use crate::cancel::CancelToken;
use crate::error::{io_err, SyncError};
use crate::manifest::Manifest;
use crate::walk::{self, base_name, WalkEntry};
use crate::writer::{self, WriteResult};

/// Top-level herd directories merged into the canonical tree.
pub const CONTENT_DIRS: &[&str] = &["rules", "skills", "workflows"];

/// Contents of a herd's metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HerdMeta {
    #[serde(default)]
    pub name: String,
}

/// An installed herd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Herd {
    pub name: HerdName,
    /// Absolute path to the herd root.
    pub path: PathBuf,
}

/// Find every herd under `<repo>/<herds_dir>`, sorted by name.
///
/// A missing herds root means no herds. Subdirectories without a metadata
/// file are skipped; a metadata file that cannot be read or parsed is an
/// error. An empty `name` falls back to the directory name.
pub fn discover(repo: &Path, layout: &Layout) -> Result<Vec<Herd>, SyncError> {
    let root = layout.herds_root(repo);
    let entries = match std::fs::read_dir(&root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(io_err(&root, err)),
    };

    let mut herds = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let meta_path = path.join(&layout.herd_meta_file);
        let data = match std::fs::read(&meta_path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&meta_path, err)),
        };
        let meta: HerdMeta = serde_json::from_slice(&data).map_err(|source| SyncError::HerdMeta {
            path: meta_path.clone(),
            source,
        })?;
        let name = if meta.name.is_empty() {
            entry.file_name().to_string_lossy().into_owned()
        } else {
            meta.name
        };
        herds.push(Herd {
            name: HerdName::from(name),
            path,
        });
    }

    herds.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(herds)
}

/// Options for one merge.
#[derive(Debug, Clone, Copy)]
pub struct MergeConfig<'a> {
    pub repo: &'a Path,
    pub layout: &'a Layout,
    pub dry_run: bool,
    pub cancel: &'a CancelToken,
}

struct Planned<'h> {
    herd: &'h HerdName,
    entry: WalkEntry,
}

fn descend_into(rel: &str) -> bool {
    if base_name(rel) == ".git" {
        return false;
    }
    rel.contains('/') || CONTENT_DIRS.contains(&rel)
}

/// Merge `herds` into the canonical tree and return the written paths,
/// repo-relative, in merge order.
///
/// A protected file already present in the canonical tree is skipped.
pub fn merge(
    cfg: &MergeConfig<'_>,
    herds: &[Herd],
    prev: &Manifest,
) -> Result<Vec<String>, SyncError> {
    let mut owners: BTreeMap<String, &HerdName> = BTreeMap::new();
    let mut planned = Vec::new();

    for herd in herds {
        cfg.cancel.check()?;
        for entry in walk::collect_files(&herd.path, cfg.cancel, descend_into)? {
            // Top-level files (herd.json, README, LICENSE) are never merged.
            if !entry.rel.contains('/') || base_name(&entry.rel) == cfg.layout.herd_meta_file {
                continue;
            }
            if let Some(first) = owners.get(&entry.rel) {
                return Err(SyncError::Conflict {
                    path: entry.rel,
                    first: (*first).clone(),
                    second: herd.name.clone(),
                });
            }
            owners.insert(entry.rel.clone(), &herd.name);
            planned.push(Planned {
                herd: &herd.name,
                entry,
            });
        }
    }

    let mut installed = Vec::with_capacity(planned.len());
    for Planned { herd, entry } in planned {
        cfg.cancel.check()?;
        let output = join_rel(&cfg.layout.canonical_dir, &entry.rel);
        let dest = resolve(cfg.repo, &output);
        if prev.is_protected(base_name(&entry.rel)) && dest.exists() {
            tracing::debug!(file = %entry.rel, herd = %herd, "skipping generated file");
            continue;
        }
        let data = std::fs::read(&entry.path).map_err(|e| io_err(&entry.path, e))?;
        match writer::atomic_write(&dest, &data, cfg.dry_run)? {
            WriteResult::Written { .. } => {
                tracing::info!(output = %output, source = %entry.rel, herd = %herd, "wrote")
            }
            WriteResult::WouldWrite { .. } => {
                tracing::info!(output = %output, source = %entry.rel, herd = %herd, "would write")
            }
            WriteResult::Unchanged { .. } => {
                tracing::debug!(output = %output, source = %entry.rel, herd = %herd, "unchanged")
            }
        }
        installed.push(output);
    }

    Ok(installed)
}

/// Remove every non-protected file the previous merge wrote into the
/// canonical tree, pruning directories left empty.
pub fn clean_merged(cfg: &MergeConfig<'_>, prev: &Manifest) -> Result<(), SyncError> {
    let Some(files) = prev.target_files(&herder_core::TargetName::herds()) else {
        return Ok(());
    };
    let canonical_root = cfg.layout.canonical_root(cfg.repo);
    let prefix = format!("{}/", cfg.layout.canonical_dir.trim_end_matches('/'));

    for rel in files {
        cfg.cancel.check()?;
        if !rel.starts_with(&prefix) || !walk::is_contained(rel) {
            continue;
        }
        if prev.is_protected_path(rel) {
            continue;
        }
        if cfg.dry_run {
            tracing::info!(file = %rel, "would remove");
            continue;
        }

        let path = resolve(cfg.repo, rel);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(file = %rel, "removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&path, err)),
        }
        prune_empty_parents(&path, &canonical_root);
    }
    Ok(())
}

fn prune_empty_parents(path: &Path, stop: &Path) {
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == stop || !current.starts_with(stop) {
            break;
        }
        let empty = std::fs::read_dir(current)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !empty || std::fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}
