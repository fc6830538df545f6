//! Ownership manifest: which repo-relative paths belong to which target.
//!
//! Persists a [`Manifest`] JSON document at
//! `<repo>/<config_dir>/<manifest_file>` (`.promptherder/manifest.json` by
//! default). Writes go through the atomic writer, so the file is replaced,
//! never patched.
//!
//! Two older shapes are still readable and surface as an anonymous target:
//! the v1 object with a flat `files` list, and a bare JSON array of paths.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herder_core::{Layout, TargetName};

use crate::error::SyncError;
use crate::walk::base_name;
use crate::writer;

/// Schema version written by [`save_at`].
pub const MANIFEST_VERSION: u32 = 2;

/// In-memory ownership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    /// Target name → sorted repo-relative paths it owns.
    #[serde(default)]
    pub targets: BTreeMap<TargetName, Vec<String>>,
    /// Basenames an external agent populates; installed once, never overwritten.
    #[serde(default)]
    pub generated: BTreeSet<String>,
    /// Paths from a legacy flat-list manifest, owned by no named target.
    #[serde(skip)]
    pub legacy_files: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: 0,
            generated_at: Utc::now(),
            targets: BTreeMap::new(),
            generated: BTreeSet::new(),
            legacy_files: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestCompat {
    Structured(ManifestStructuredCompat),
    Flat(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ManifestStructuredCompat {
    #[serde(default)]
    version: u32,
    generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    targets: BTreeMap<TargetName, Vec<String>>,
    #[serde(default)]
    generated: BTreeSet<String>,
    #[serde(default)]
    files: Vec<String>,
}

impl Manifest {
    /// Start the next run's manifest from the previous one: current schema,
    /// fresh timestamp, `generated` carried over, no targets.
    pub fn next_from(prev: &Manifest) -> Self {
        Self {
            version: MANIFEST_VERSION,
            generated_at: Utc::now(),
            targets: BTreeMap::new(),
            generated: prev.generated.clone(),
            legacy_files: Vec::new(),
        }
    }

    /// Replace the file list for `target` wholesale. Paths are sorted; the
    /// input is not de-duplicated.
    pub fn set_target_files(&mut self, target: TargetName, mut files: Vec<String>) {
        files.sort();
        self.targets.insert(target, files);
    }

    pub fn target_files(&self, target: &TargetName) -> Option<&[String]> {
        self.targets.get(target).map(Vec::as_slice)
    }

    pub fn has_target(&self, target: &TargetName) -> bool {
        self.targets.contains_key(target)
    }

    /// Union of every owned path (named targets plus legacy), sorted and
    /// de-duplicated.
    pub fn all_files(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .legacy_files
            .iter()
            .chain(self.targets.values().flatten())
            .collect();
        set.into_iter().cloned().collect()
    }

    /// True when `filename` (a basename, matched exactly and
    /// case-sensitively) is a protected generated file.
    pub fn is_protected(&self, filename: &str) -> bool {
        self.generated.contains(filename)
    }

    /// [`Manifest::is_protected`] applied to the basename of a relative path.
    pub fn is_protected_path(&self, rel: &str) -> bool {
        self.is_protected(base_name(rel))
    }
}

/// Load the manifest for the repository at `repo`.
///
/// Returns an empty manifest if the file does not exist. A file that cannot
/// be read or parsed is logged and treated as empty: the manifest caches
/// ownership, it is not a source of truth for content.
pub fn load_at(repo: &Path, layout: &Layout) -> Manifest {
    let path = layout.manifest_path(repo);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Manifest::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable manifest, treating as empty");
            return Manifest::default();
        }
    };
    match serde_json::from_str::<ManifestCompat>(&contents) {
        Ok(ManifestCompat::Structured(m)) => Manifest {
            version: m.version,
            generated_at: m.generated_at.unwrap_or_else(Utc::now),
            targets: m.targets,
            generated: m.generated,
            legacy_files: m.files,
        },
        Ok(ManifestCompat::Flat(files)) => Manifest {
            legacy_files: files,
            ..Manifest::default()
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt manifest, treating as empty");
            Manifest::default()
        }
    }
}

/// Save the manifest atomically, upgraded to [`MANIFEST_VERSION`].
///
/// Legacy flat-list entries are dropped on save.
pub fn save_at(repo: &Path, layout: &Layout, manifest: &Manifest) -> Result<(), SyncError> {
    let path = layout.manifest_path(repo);
    let mut upgraded = manifest.clone();
    upgraded.version = MANIFEST_VERSION;
    upgraded.legacy_files.clear();

    let mut json = serde_json::to_vec_pretty(&upgraded)?;
    json.push(b'\n');
    writer::atomic_write(&path, &json, false)?;
    Ok(())
}
