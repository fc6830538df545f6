//! The per-consumer transformation contract.
//!
//! Every target turns the canonical source tree (or, for the archive target,
//! a bundled tree) into a list of [`PlanItem`]s, then hands that plan to
//! [`write_plan`]. Planning performs no writes, so dry-run and real runs
//! share every decision up to the writer.

pub mod bundled;
pub mod fanout;
pub mod mirror;

use std::path::Path;

use herder_core::layout::resolve;
use herder_core::Layout;

use crate::cancel::CancelToken;
use crate::error::{io_err, SyncError};
use crate::manifest::Manifest;
use crate::writer::{self, WriteResult};

pub use bundled::{BundledTarget, BundledTree, MemoryBundle, StaticBundle};
pub use fanout::FanoutTarget;
pub use mirror::MirrorTarget;

/// A consumer-specific output transformer.
///
/// `install` must be idempotent: unchanged inputs give byte-identical
/// outputs and the same returned path list, in the same order.
pub trait Target {
    /// Stable identifier used in the manifest and on the command line.
    fn name(&self) -> &str;

    /// Write this target's outputs and return their repo-relative paths.
    fn install(&self, cfg: &TargetConfig<'_>) -> Result<Vec<String>, SyncError>;
}

/// Everything a target needs for one install.
#[derive(Debug, Clone, Copy)]
pub struct TargetConfig<'a> {
    /// Absolute repository root.
    pub repo: &'a Path,
    pub layout: &'a Layout,
    pub dry_run: bool,
    pub cancel: &'a CancelToken,
    /// Manifest from the previous run; supplies the protected filenames.
    pub manifest: &'a Manifest,
}

impl TargetConfig<'_> {
    /// True when `output` is protected and already exists on disk, in which
    /// case it must not be written.
    pub fn skip_protected(&self, output: &str) -> bool {
        if !self.manifest.is_protected_path(output) {
            return false;
        }
        let exists = resolve(self.repo, output).exists();
        if exists {
            tracing::debug!(file = output, "skipping generated file");
        }
        exists
    }
}

/// One output file, fully rendered but not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanItem {
    /// Repo-relative, `/`-separated output path.
    pub output: String,
    pub content: Vec<u8>,
    /// Labels of the source documents that produced this output.
    pub sources: Vec<String>,
}

/// Write every item in order and return the recorded output paths.
///
/// Protected outputs that already exist are skipped and not recorded.
pub fn write_plan(cfg: &TargetConfig<'_>, plan: Vec<PlanItem>) -> Result<Vec<String>, SyncError> {
    let mut installed = Vec::with_capacity(plan.len());
    for item in plan {
        cfg.cancel.check()?;
        if cfg.skip_protected(&item.output) {
            continue;
        }
        let path = resolve(cfg.repo, &item.output);
        let result = writer::atomic_write(&path, &item.content, cfg.dry_run)?;
        log_write(&result, &item.output, &item.sources.join(", "));
        installed.push(item.output);
    }
    Ok(installed)
}

pub(crate) fn log_write(result: &WriteResult, output: &str, source: &str) {
    match result {
        WriteResult::Written { .. } => tracing::info!(output, source, "wrote"),
        WriteResult::WouldWrite { .. } => tracing::info!(output, source, "would write"),
        WriteResult::Unchanged { .. } => tracing::debug!(output, source, "unchanged"),
    }
}

pub(crate) fn read_source(path: &Path) -> Result<Vec<u8>, SyncError> {
    std::fs::read(path).map_err(|e| io_err(path, e))
}
