//! Archive-extraction target: bundled content unpacked into the canonical
//! source tree.
//!
//! The bundle is read-only and keyed by `/`-separated path. Files under
//! `<bundle_root>/` land at `<canonical_dir>/<rest>`, where a later full run
//! fans them out to the other targets.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use herder_core::layout::join_rel;

use super::{write_plan, PlanItem, Target, TargetConfig};
use crate::error::SyncError;
use crate::walk;

/// A read-only path → bytes collection.
pub trait BundledTree: Send + Sync {
    /// Every file path in the bundle, `/`-separated.
    fn paths(&self) -> Vec<String>;

    fn read(&self, path: &str) -> Option<&[u8]>;
}

/// A bundle compiled into the binary, e.g. from `include_bytes!`.
#[derive(Debug, Clone, Copy)]
pub struct StaticBundle(pub &'static [(&'static str, &'static [u8])]);

impl BundledTree for StaticBundle {
    fn paths(&self) -> Vec<String> {
        self.0.iter().map(|(path, _)| (*path).to_owned()).collect()
    }

    fn read(&self, path: &str) -> Option<&[u8]> {
        self.0.iter().find(|(p, _)| *p == path).map(|(_, data)| *data)
    }
}

/// An in-memory bundle assembled at runtime.
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle(BTreeMap<String, Vec<u8>>);

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.0.insert(path.into(), data.into());
        self
    }
}

impl BundledTree for MemoryBundle {
    fn paths(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    fn read(&self, path: &str) -> Option<&[u8]> {
        self.0.get(path).map(Vec::as_slice)
    }
}

/// Extracts `<bundle_root>/**` from a bundled tree into the canonical tree.
#[derive(Clone)]
pub struct BundledTarget {
    bundle: Option<Arc<dyn BundledTree>>,
}

impl BundledTarget {
    pub const NAME: &'static str = "compound-v";

    pub fn new(bundle: Arc<dyn BundledTree>) -> Self {
        Self {
            bundle: Some(bundle),
        }
    }

    /// A target with no bundle; installing it is a configuration error.
    pub fn unavailable() -> Self {
        Self { bundle: None }
    }

    fn plan(&self, cfg: &TargetConfig<'_>) -> Result<Vec<PlanItem>, SyncError> {
        let bundle = self.bundle.as_ref().ok_or_else(|| SyncError::MissingBundle {
            target: Self::NAME.to_owned(),
        })?;

        let prefix = format!("{}/", cfg.layout.bundle_root.trim_end_matches('/'));
        let mut paths: Vec<String> = bundle
            .paths()
            .into_iter()
            .filter(|p| p.starts_with(&prefix) && p.len() > prefix.len())
            .collect();
        paths.sort();

        let mut plan = Vec::with_capacity(paths.len());
        for path in paths {
            cfg.cancel.check()?;
            let Some(data) = bundle.read(&path) else {
                tracing::warn!(file = %path, "bundled file listed but unreadable, skipping");
                continue;
            };
            let rel = &path[prefix.len()..];
            if !walk::is_contained(rel) {
                tracing::warn!(file = %path, "bundled path escapes the canonical tree, skipping");
                continue;
            }
            plan.push(PlanItem {
                output: join_rel(&cfg.layout.canonical_dir, rel),
                content: data.to_vec(),
                sources: vec![path.clone()],
            });
        }
        Ok(plan)
    }
}

impl fmt::Debug for BundledTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundledTarget")
            .field("available", &self.bundle.is_some())
            .finish()
    }
}

impl Target for BundledTarget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn install(&self, cfg: &TargetConfig<'_>) -> Result<Vec<String>, SyncError> {
        let plan = self.plan(cfg)?;
        let installed = write_plan(cfg, plan)?;
        if !cfg.dry_run && !installed.is_empty() {
            tracing::info!(
                dir = %cfg.layout.canonical_dir,
                "{} installed, run `herder` to fan out to agent targets",
                Self::NAME
            );
        }
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Repo;
    use super::*;

    fn bundle() -> Arc<dyn BundledTree> {
        let mut b = MemoryBundle::new();
        b.insert("compound-v/rules/compound-v.md", "# Compound V\n")
            .insert("compound-v/skills/tdd/SKILL.md", "# TDD\n")
            .insert("elsewhere/ignored.md", "nope");
        Arc::new(b)
    }

    #[test]
    fn missing_bundle_is_a_hard_error() {
        let repo = Repo::new();
        let err = BundledTarget::unavailable()
            .install(&repo.cfg(false))
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingBundle { .. }));
    }

    #[test]
    fn empty_bundle_is_empty_success() {
        let repo = Repo::new();
        let out = BundledTarget::new(Arc::new(MemoryBundle::new()))
            .install(&repo.cfg(false))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn extracts_into_canonical_tree() {
        let repo = Repo::new();
        let out = BundledTarget::new(bundle()).install(&repo.cfg(false)).unwrap();
        assert_eq!(
            out,
            [
                ".promptherder/agent/rules/compound-v.md",
                ".promptherder/agent/skills/tdd/SKILL.md",
            ]
        );
        assert_eq!(repo.read(".promptherder/agent/skills/tdd/SKILL.md"), "# TDD\n");
        assert!(!repo.path(".promptherder/agent/ignored.md").exists());
    }

    #[test]
    fn escaping_bundle_paths_are_skipped() {
        let repo = Repo::new();
        let mut b = MemoryBundle::new();
        b.insert("compound-v/rules/ok.md", "# Ok\n")
            .insert("compound-v/../../outside.md", "nope")
            .insert("compound-v//etc/absolute.md", "nope");

        let out = BundledTarget::new(Arc::new(b))
            .install(&repo.cfg(false))
            .unwrap();
        assert_eq!(out, [".promptherder/agent/rules/ok.md"]);
        assert!(!repo.path("outside.md").exists());
    }

    #[test]
    fn protected_file_is_not_overwritten() {
        let mut repo = Repo::new();
        repo.manifest.generated.insert("compound-v.md".to_owned());
        repo.write(".promptherder/agent/rules/compound-v.md", "customized");

        let out = BundledTarget::new(bundle()).install(&repo.cfg(false)).unwrap();
        assert_eq!(out, [".promptherder/agent/skills/tdd/SKILL.md"]);
        assert_eq!(
            repo.read(".promptherder/agent/rules/compound-v.md"),
            "customized"
        );
    }

    #[test]
    fn static_bundle_lists_and_reads() {
        static FILES: &[(&str, &[u8])] = &[("compound-v/rules/a.md", b"a")];
        let b = StaticBundle(FILES);
        assert_eq!(b.paths(), ["compound-v/rules/a.md"]);
        assert_eq!(b.read("compound-v/rules/a.md"), Some(&b"a"[..]));
        assert_eq!(b.read("missing"), None);
    }
}
