//! Repository layout: every path the engine reads or writes.
//!
//! # Default layout
//!
//! ```text
//! <repo>/
//!   .promptherder/
//!     manifest.json        (ownership manifest)
//!     settings.json        (user settings)
//!     hard-rules.md        (optional, mirrored into .agent/rules/)
//!     herds/<herd>/        (installed content packages, each with herd.json)
//!     agent/               (canonical source tree: rules/ skills/ workflows/)
//!   .agent/                (mirror target output)
//!   .github/               (fan-out target output)
//! ```
//!
//! All fields are repo-relative, `/`-separated strings. Tests build a
//! [`Layout`] pointing anywhere; nothing in the engine reads a hidden constant.

use std::path::{Path, PathBuf};

/// Repo-relative locations used by the reconciler and every target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Reserved configuration directory.
    pub config_dir: String,
    /// Manifest filename inside `config_dir`.
    pub manifest_file: String,
    /// Settings filename inside `config_dir`.
    pub settings_file: String,
    /// Directory holding one subdirectory per installed herd.
    pub herds_dir: String,
    /// Metadata filename at the root of each herd.
    pub herd_meta_file: String,
    /// Canonical source tree every target reads from.
    pub canonical_dir: String,
    /// Optional repo-wide rules file copied by the mirror target.
    pub hard_rules_file: String,
    /// Mirror target output root.
    pub mirror_dir: String,
    /// Fan-out target: combined file for scope-less rules.
    pub instructions_file: String,
    /// Fan-out target: one file per scoped rule.
    pub instructions_dir: String,
    /// Fan-out target: one prompt per workflow or skill.
    pub prompts_dir: String,
    /// Root directory inside the bundled archive tree.
    pub bundle_root: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            config_dir: ".promptherder".to_owned(),
            manifest_file: "manifest.json".to_owned(),
            settings_file: "settings.json".to_owned(),
            herds_dir: ".promptherder/herds".to_owned(),
            herd_meta_file: "herd.json".to_owned(),
            canonical_dir: ".promptherder/agent".to_owned(),
            hard_rules_file: ".promptherder/hard-rules.md".to_owned(),
            mirror_dir: ".agent".to_owned(),
            instructions_file: ".github/copilot-instructions.md".to_owned(),
            instructions_dir: ".github/instructions".to_owned(),
            prompts_dir: ".github/prompts".to_owned(),
            bundle_root: "compound-v".to_owned(),
        }
    }
}

impl Layout {
    /// `<repo>/<config_dir>/<manifest_file>`
    pub fn manifest_path(&self, repo: &Path) -> PathBuf {
        resolve(repo, &join_rel(&self.config_dir, &self.manifest_file))
    }

    /// `<repo>/<config_dir>/<settings_file>`
    pub fn settings_path(&self, repo: &Path) -> PathBuf {
        resolve(repo, &join_rel(&self.config_dir, &self.settings_file))
    }

    /// `<repo>/<herds_dir>`
    pub fn herds_root(&self, repo: &Path) -> PathBuf {
        resolve(repo, &self.herds_dir)
    }

    /// `<repo>/<canonical_dir>`
    pub fn canonical_root(&self, repo: &Path) -> PathBuf {
        resolve(repo, &self.canonical_dir)
    }
}

/// Join two `/`-separated relative paths, tolerating empty halves.
pub fn join_rel(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_owned(),
        (_, true) => base.to_owned(),
        _ => format!("{base}/{rel}"),
    }
}

/// Resolve a `/`-separated repo-relative path against `repo` using the
/// platform separator.
pub fn resolve(repo: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|part| !part.is_empty())
        .fold(repo.to_path_buf(), |acc, part| acc.join(part))
}
