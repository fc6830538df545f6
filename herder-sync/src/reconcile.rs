//! Run orchestration shared by every command.
//!
//! One run: load the previous manifest, merge herds into the canonical tree,
//! install each target in order, persist the new manifest, then delete what
//! the previous manifest owned and the new one does not. The first error
//! aborts the run before the manifest is written, so the previous manifest
//! stays the durable record.
//!
//! The engine assumes a single writer per repository. Two concurrent runs
//! against the same tree race on the manifest and on stale cleanup.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use herder_core::layout::resolve;
use herder_core::{HerdName, Layout, TargetName};

use crate::cancel::CancelToken;
use crate::error::{io_err, SyncError};
use crate::herd::{self, MergeConfig};
use crate::manifest::{self, Manifest};
use crate::target::{Target, TargetConfig};
use crate::walk;

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub repo: PathBuf,
    pub dry_run: bool,
    pub layout: Layout,
    pub cancel: CancelToken,
}

impl RunConfig {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            dry_run: false,
            layout: Layout::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Scope for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    /// Merge herds and run every target in the registry.
    All,
    /// Run a single named target from the registry, leaving every other
    /// manifest entry as it was.
    Target(String),
}

/// Paths one target (or the herd merge) recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub name: TargetName,
    pub files: Vec<String>,
}

/// A stale output deleted (or, in dry-run, due for deletion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removed { path: String },
    WouldRemove { path: String },
}

impl Removal {
    pub fn path(&self) -> &str {
        match self {
            Removal::Removed { path } | Removal::WouldRemove { path } => path,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Absolute repository root.
    pub repo: PathBuf,
    pub dry_run: bool,
    /// Herds merged this run, in merge order.
    pub herds: Vec<HerdName>,
    /// Per-target outcomes in execution order; the herd merge comes first
    /// under the reserved `herds` name when it ran.
    pub targets: Vec<TargetOutcome>,
    pub removed: Vec<Removal>,
}

/// Run `scope` against the registry `targets`.
pub fn run(
    targets: &[Box<dyn Target>],
    scope: RunScope,
    cfg: &RunConfig,
) -> Result<RunReport, SyncError> {
    match scope {
        RunScope::All => run_all(targets, cfg),
        RunScope::Target(name) => {
            let target = targets
                .iter()
                .find(|t| t.name() == name)
                .ok_or_else(|| SyncError::Validation(format!("unknown target {name:?}")))?;
            run_target(target.as_ref(), cfg)
        }
    }
}

/// Full reconciliation: herd merge, then every target in list order.
///
/// Manifest entries of named targets not in `targets` are carried over
/// unchanged, so content owned by a target that is only ever run on its own
/// survives a full run.
pub fn run_all(targets: &[Box<dyn Target>], cfg: &RunConfig) -> Result<RunReport, SyncError> {
    let repo = resolve_repo(&cfg.repo)?;
    let names = validate_names(targets.iter().map(|t| t.name()))?;
    let layout = &cfg.layout;

    let prev = manifest::load_at(&repo, layout);
    let mut cur = Manifest::next_from(&prev);
    let mut report = RunReport {
        repo: repo.clone(),
        dry_run: cfg.dry_run,
        herds: Vec::new(),
        targets: Vec::new(),
        removed: Vec::new(),
    };

    let herds = herd::discover(&repo, layout)?;
    if herds.is_empty() {
        tracing::info!(dir = %layout.herds_dir, "no herds found");
    } else {
        let merge_cfg = MergeConfig {
            repo: &repo,
            layout,
            dry_run: cfg.dry_run,
            cancel: &cfg.cancel,
        };
        herd::clean_merged(&merge_cfg, &prev)?;
        let files = herd::merge(&merge_cfg, &herds, &prev)?;
        cur.set_target_files(TargetName::herds(), files.clone());
        report.herds = herds.into_iter().map(|h| h.name).collect();
        report.targets.push(TargetOutcome {
            name: TargetName::herds(),
            files,
        });
    }

    let tcfg = TargetConfig {
        repo: &repo,
        layout,
        dry_run: cfg.dry_run,
        cancel: &cfg.cancel,
        manifest: &prev,
    };
    for (target, name) in targets.iter().zip(names) {
        let files = install_one(target.as_ref(), &tcfg)?;
        cur.set_target_files(name.clone(), files.clone());
        report.targets.push(TargetOutcome { name, files });
    }

    for (name, files) in &prev.targets {
        if !cur.has_target(name) {
            cur.set_target_files(name.clone(), files.clone());
        }
    }

    report.removed = finish(&repo, layout, &prev, &cur, cfg)?;
    Ok(report)
}

/// Partial reconciliation: run one target and replace only its manifest
/// entry. The herd merge does not run.
pub fn run_target(target: &dyn Target, cfg: &RunConfig) -> Result<RunReport, SyncError> {
    let repo = resolve_repo(&cfg.repo)?;
    let name = TargetName::parse(target.name())?;
    let layout = &cfg.layout;

    let prev = manifest::load_at(&repo, layout);
    let tcfg = TargetConfig {
        repo: &repo,
        layout,
        dry_run: cfg.dry_run,
        cancel: &cfg.cancel,
        manifest: &prev,
    };
    let files = install_one(target, &tcfg)?;

    let mut cur = Manifest::next_from(&prev);
    for (other, other_files) in &prev.targets {
        if *other != name {
            cur.set_target_files(other.clone(), other_files.clone());
        }
    }
    cur.set_target_files(name.clone(), files.clone());

    let removed = finish(&repo, layout, &prev, &cur, cfg)?;
    Ok(RunReport {
        repo,
        dry_run: cfg.dry_run,
        herds: Vec::new(),
        targets: vec![TargetOutcome { name, files }],
        removed,
    })
}

fn install_one(target: &dyn Target, cfg: &TargetConfig<'_>) -> Result<Vec<String>, SyncError> {
    cfg.cancel.check()?;
    tracing::info!(target_name = target.name(), "installing target");
    target.install(cfg).map_err(|source| SyncError::Target {
        name: target.name().to_owned(),
        source: Box::new(source),
    })
}

fn finish(
    repo: &Path,
    layout: &Layout,
    prev: &Manifest,
    cur: &Manifest,
    cfg: &RunConfig,
) -> Result<Vec<Removal>, SyncError> {
    if cfg.dry_run {
        tracing::info!(output = %layout.manifest_path(repo).display(), "would write manifest");
    } else {
        manifest::save_at(repo, layout, cur)?;
    }
    clean_stale(repo, prev, cur, cfg.dry_run)
}

/// Delete every path `prev` owned that `cur` does not.
///
/// Paths already gone are skipped silently. Protected basenames, absolute
/// paths and paths with `..` components are never deleted.
pub fn clean_stale(
    repo: &Path,
    prev: &Manifest,
    cur: &Manifest,
    dry_run: bool,
) -> Result<Vec<Removal>, SyncError> {
    let current: BTreeSet<String> = cur.all_files().into_iter().collect();
    let mut removed = Vec::new();

    for rel in prev.all_files() {
        if current.contains(&rel) {
            continue;
        }
        if !walk::is_contained(&rel) {
            tracing::warn!(file = %rel, "refusing to remove manifest entry outside the repository");
            continue;
        }
        if prev.is_protected_path(&rel) || cur.is_protected_path(&rel) {
            tracing::debug!(file = %rel, "keeping generated file");
            continue;
        }

        let path = resolve(repo, &rel);
        match std::fs::symlink_metadata(&path) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&path, err)),
        }

        if dry_run {
            tracing::info!(file = %rel, "would remove stale");
            removed.push(Removal::WouldRemove { path: rel });
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&path, err)),
        }
        tracing::info!(file = %rel, "removed stale");
        removed.push(Removal::Removed { path: rel });
    }

    Ok(removed)
}

/// Resolve `repo` to an absolute directory path.
///
/// Empty, unresolvable or non-directory paths are validation errors.
pub fn resolve_repo(repo: &Path) -> Result<PathBuf, SyncError> {
    if repo.as_os_str().is_empty() || repo.to_string_lossy().trim().is_empty() {
        return Err(SyncError::Validation("repo path is empty".to_owned()));
    }
    let abs = std::path::absolute(repo)
        .map_err(|e| SyncError::Validation(format!("resolve repo path {}: {e}", repo.display())))?;
    if !abs.is_dir() {
        return Err(SyncError::Validation(format!(
            "repo path {} is not a directory",
            abs.display()
        )));
    }
    Ok(abs)
}

fn validate_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<Vec<TargetName>, SyncError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for raw in names {
        let name = TargetName::parse(raw)?;
        if !seen.insert(name.clone()) {
            return Err(SyncError::Validation(format!("duplicate target {raw:?}")));
        }
        out.push(name);
    }
    Ok(out)
}
