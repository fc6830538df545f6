//! `herder [target]`: merge herds and install targets.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use herder_core::{Layout, Settings};
use herder_sync::{
    resolve_repo, run, BundledTarget, FanoutTarget, MirrorTarget, Removal, RunConfig, RunReport,
    RunScope, Target,
};

use crate::bundle;

/// Options shared by the full run and every single-target run.
#[derive(Debug, Clone)]
pub struct SyncArgs {
    pub repo: PathBuf,
    pub dry_run: bool,
    /// Rule include globs for the fan-out target; empty means all.
    pub include: Vec<String>,
    /// Run only this target; `None` runs the full reconciliation.
    pub target: Option<String>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let repo = resolve_repo(&self.repo).context("invalid --repo")?;
        let layout = Layout::default();
        let settings = Settings::load_at(&repo, &layout)
            .with_context(|| format!("failed to load settings under {}", repo.display()))?;
        let fanout = FanoutTarget::new()
            .with_include(&self.include)
            .context("invalid --include")?;
        let cfg = RunConfig::new(repo)
            .with_dry_run(self.dry_run)
            .with_layout(layout);

        let report = match self.target {
            None => run(&full_registry(settings, fanout), RunScope::All, &cfg)
                .context("sync failed")?,
            Some(name) => {
                let mut targets = full_registry(settings, fanout);
                targets.push(Box::new(BundledTarget::new(Arc::new(bundle::COMPOUND_V))));
                run(&targets, RunScope::Target(name.clone()), &cfg)
                    .with_context(|| format!("sync failed for target '{name}'"))?
            }
        };

        print_report(&report);
        Ok(())
    }
}

/// Targets a full run installs, in order.
fn full_registry(settings: Settings, fanout: FanoutTarget) -> Vec<Box<dyn Target>> {
    vec![
        Box::new(MirrorTarget::from_settings(settings)),
        Box::new(fanout),
    ]
}

/// Split a comma-separated `--include` value, dropping blank entries.
pub fn parse_include_patterns(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let check = "✓".green();

    for outcome in &report.targets {
        if outcome.files.is_empty() {
            println!("{prefix}{check} '{}': nothing to do", outcome.name);
            continue;
        }
        println!(
            "{prefix}{check} '{}' synced ({} files)",
            outcome.name,
            outcome.files.len()
        );
        for file in &outcome.files {
            println!("  ✎  {file}");
        }
    }

    if !report.removed.is_empty() {
        println!(
            "{prefix}{check} {} stale file(s) removed",
            report.removed.len()
        );
        for removal in &report.removed {
            match removal {
                Removal::Removed { path } => println!("  ✗  {path}"),
                Removal::WouldRemove { path } => println!("  ~  {path}"),
            }
        }
    }
}
