//! # herder-sync
//!
//! The reconciliation engine: ownership manifest, herd merge, per-target
//! transformation and stale-file cleanup.
//!
//! Call [`run_all`] to merge herds and install every registered target, or
//! [`run_target`] to refresh a single target's outputs while leaving every
//! other manifest entry untouched.

pub mod cancel;
pub mod error;
pub mod frontmatter;
pub mod herd;
pub mod manifest;
pub mod reconcile;
pub mod target;
pub mod variant;
pub mod walk;
pub mod writer;

pub use cancel::CancelToken;
pub use error::SyncError;
pub use manifest::Manifest;
pub use reconcile::{
    resolve_repo, run, run_all, run_target, Removal, RunConfig, RunReport, RunScope, TargetOutcome,
};
pub use target::{
    BundledTarget, BundledTree, FanoutTarget, MemoryBundle, MirrorTarget, PlanItem, StaticBundle,
    Target, TargetConfig,
};
pub use writer::WriteResult;
