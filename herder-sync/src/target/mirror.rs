//! Mirror target: the canonical tree copied verbatim under `mirror_dir`.

use std::fmt;

use herder_core::layout::{join_rel, resolve};
use herder_core::Settings;

use super::{read_source, write_plan, PlanItem, Target, TargetConfig};
use crate::error::SyncError;
use crate::variant;
use crate::walk::{self, base_name, parent_rel};

type Rename = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Copies `<canonical_dir>/**` to `<mirror_dir>/**`, applying skill variant
/// selection and an optional workflow filename transform, then copies the
/// hard-rules file to `<mirror_dir>/rules/hard-rules.md` when present.
pub struct MirrorTarget {
    rename_workflow: Rename,
}

impl MirrorTarget {
    pub const NAME: &'static str = "antigravity";

    /// Mirror with workflow filenames left unchanged.
    pub fn new() -> Self {
        Self::with_workflow_rename(|name| name.to_owned())
    }

    /// Mirror applying `rename` to the basename of every workflow file.
    pub fn with_workflow_rename(rename: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            rename_workflow: Box::new(rename),
        }
    }

    /// Mirror using the user's command prefix setting.
    pub fn from_settings(settings: Settings) -> Self {
        Self::with_workflow_rename(move |name| settings.prefix_command(name))
    }

    fn plan(&self, cfg: &TargetConfig<'_>) -> Result<Vec<PlanItem>, SyncError> {
        let layout = cfg.layout;
        let src_root = layout.canonical_root(cfg.repo);
        if !src_root.is_dir() {
            tracing::info!(dir = %layout.canonical_dir, "no source directory found");
            return Ok(vec![]);
        }

        let entries = walk::collect_all(&src_root, cfg.cancel)?;
        let rels: Vec<&str> = entries.iter().map(|e| e.rel.as_str()).collect();

        let mut plan = Vec::with_capacity(entries.len() + 1);
        for selected in variant::select(&rels, Self::NAME) {
            cfg.cancel.check()?;
            let output_rel = if variant::is_in_workflow_dir(&selected.output) {
                join_rel(
                    parent_rel(&selected.output),
                    &(self.rename_workflow)(base_name(&selected.output)),
                )
            } else {
                selected.output
            };
            let source = join_rel(&layout.canonical_dir, selected.source);
            plan.push(PlanItem {
                output: join_rel(&layout.mirror_dir, &output_rel),
                content: read_source(&resolve(cfg.repo, &source))?,
                sources: vec![source],
            });
        }

        let hard_rules = resolve(cfg.repo, &layout.hard_rules_file);
        if hard_rules.is_file() {
            plan.push(PlanItem {
                output: join_rel(&layout.mirror_dir, "rules/hard-rules.md"),
                content: read_source(&hard_rules)?,
                sources: vec![layout.hard_rules_file.clone()],
            });
        }

        Ok(plan)
    }
}

impl Default for MirrorTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MirrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorTarget").finish_non_exhaustive()
    }
}

impl Target for MirrorTarget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn install(&self, cfg: &TargetConfig<'_>) -> Result<Vec<String>, SyncError> {
        let plan = self.plan(cfg)?;
        write_plan(cfg, plan)
    }
}
