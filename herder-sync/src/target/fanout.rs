//! Fan-out target: canonical documents reshaped for a consumer that reads
//! one combined instructions file, per-scope instruction files and prompts.
//!
//! ```text
//! <canonical>/rules/*             → <instructions_file>           (no applyTo)
//!                                 → <instructions_dir>/<n>.instructions.md
//! <canonical>/workflows/<n>.md    → <prompts_dir>/<n>.prompt.md
//! <canonical>/skills/<d>/<doc>    → <prompts_dir>/<d>.prompt.md
//! ```
//!
//! Rule sources can be narrowed with include globs matched against their
//! path relative to the rules directory (`**/*.md`).

use std::collections::{BTreeMap, BTreeSet};

use glob::{MatchOptions, Pattern};
use herder_core::layout::join_rel;

use super::{read_source, write_plan, PlanItem, Target, TargetConfig};
use crate::error::SyncError;
use crate::frontmatter::{
    concat_with_header, extract_description, parse_frontmatter, strip_annotations, trim_bytes,
    SourceFile,
};
use crate::variant;
use crate::walk::{self, file_stem, WalkEntry};

/// `*` stops at `/`; `**` spans directories.
const INCLUDE_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Splits rules by scope and converts workflows and skills to prompts.
#[derive(Debug, Clone, Default)]
pub struct FanoutTarget {
    /// Empty means every rule file.
    include: Vec<Pattern>,
}

impl FanoutTarget {
    pub const NAME: &'static str = "copilot";

    pub fn new() -> Self {
        Self::default()
    }

    /// Only read rule files matching at least one of `patterns`.
    pub fn with_include<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, SyncError> {
        self.include = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|err| {
                    SyncError::Validation(format!("invalid include pattern {p:?}: {err}"))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    fn includes(&self, rel: &str) -> bool {
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| pattern.matches_with(rel, INCLUDE_MATCH))
    }

    fn plan(&self, cfg: &TargetConfig<'_>) -> Result<Vec<PlanItem>, SyncError> {
        let src_root = cfg.layout.canonical_root(cfg.repo);
        if !src_root.is_dir() {
            tracing::info!(dir = %cfg.layout.canonical_dir, "no source directory found");
            return Ok(vec![]);
        }

        let mut plan = self.plan_rules(cfg)?;
        plan.extend(self.plan_workflows(cfg)?);
        plan.extend(self.plan_skills(cfg)?);

        let mut seen = BTreeSet::new();
        for item in &plan {
            if !seen.insert(item.output.as_str()) {
                return Err(SyncError::DuplicateOutput {
                    path: item.output.clone(),
                });
            }
        }
        Ok(plan)
    }

    fn plan_rules(&self, cfg: &TargetConfig<'_>) -> Result<Vec<PlanItem>, SyncError> {
        let layout = cfg.layout;
        let rules_dir = join_rel(&layout.canonical_dir, "rules");
        let entries = walk::collect_all(&layout.canonical_root(cfg.repo).join("rules"), cfg.cancel)?;

        let mut sources = Vec::with_capacity(entries.len());
        for entry in entries.iter().filter(|e| self.includes(&e.rel)) {
            cfg.cancel.check()?;
            let data = read_source(&entry.path)?;
            sources.push(SourceFile::parse(file_stem(&entry.rel), &data));
        }

        let mut plan = Vec::new();
        let (global, scoped): (Vec<&SourceFile>, Vec<&SourceFile>) =
            sources.iter().partition(|s| s.apply_to.is_empty());

        if !global.is_empty() {
            let header = format!("<!-- Auto-generated by herder from {rules_dir}/ - do not edit -->\n");
            let parts: Vec<&[u8]> = global.iter().map(|s| s.body.as_slice()).collect();
            plan.push(PlanItem {
                output: layout.instructions_file.clone(),
                content: concat_with_header(&header, &parts),
                sources: global.iter().map(|s| s.name.clone()).collect(),
            });
        }

        for source in scoped {
            let mut content = format!(
                "---\napplyTo: {:?}\n---\n<!-- Auto-generated by herder from {rules_dir}/{}.md - do not edit -->\n\n",
                source.apply_to, source.name
            )
            .into_bytes();
            content.extend_from_slice(trim_bytes(&source.body));
            content.push(b'\n');
            plan.push(PlanItem {
                output: join_rel(
                    &layout.instructions_dir,
                    &format!("{}.instructions.md", source.name),
                ),
                content,
                sources: vec![source.name.clone()],
            });
        }

        Ok(plan)
    }

    fn plan_workflows(&self, cfg: &TargetConfig<'_>) -> Result<Vec<PlanItem>, SyncError> {
        let root = cfg.layout.canonical_root(cfg.repo).join("workflows");
        let entries = walk::collect_files(&root, cfg.cancel, |_| false)?;

        let mut plan = Vec::with_capacity(entries.len());
        for entry in entries {
            cfg.cancel.check()?;
            let label = format!("workflows/{}", entry.rel);
            let name = file_stem(&entry.rel).to_owned();
            plan.push(self.prompt_item(cfg, &name, &label, &entry)?);
        }
        Ok(plan)
    }

    fn plan_skills(&self, cfg: &TargetConfig<'_>) -> Result<Vec<PlanItem>, SyncError> {
        let root = cfg.layout.canonical_root(cfg.repo).join("skills");
        let entries = walk::collect_files(&root, cfg.cancel, |rel| !rel.contains('/'))?;

        let mut by_skill: BTreeMap<&str, Vec<&WalkEntry>> = BTreeMap::new();
        for entry in &entries {
            if let Some((dir, _)) = entry.rel.split_once('/') {
                by_skill.entry(dir).or_default().push(entry);
            }
        }

        let mut chosen: Vec<(&str, &WalkEntry)> = Vec::with_capacity(by_skill.len());
        for (dir, files) in by_skill {
            let names = files.iter().map(|e| walk::base_name(&e.rel));
            let Some(doc) = variant::resolve_skill_doc(names, Self::NAME) else {
                tracing::debug!(dir, "skill has no usable document, skipping");
                continue;
            };
            if let Some(entry) = files.iter().find(|e| walk::base_name(&e.rel) == doc).copied() {
                chosen.push((dir, entry));
            }
        }
        chosen.sort_by(|a, b| a.1.rel.cmp(&b.1.rel));

        let mut plan = Vec::with_capacity(chosen.len());
        for (dir, entry) in chosen {
            cfg.cancel.check()?;
            let label = format!("skills/{}", entry.rel);
            plan.push(self.prompt_item(cfg, dir, &label, entry)?);
        }
        Ok(plan)
    }

    fn prompt_item(
        &self,
        cfg: &TargetConfig<'_>,
        name: &str,
        label: &str,
        entry: &WalkEntry,
    ) -> Result<PlanItem, SyncError> {
        let data = read_source(&entry.path)?;
        Ok(PlanItem {
            output: join_rel(&cfg.layout.prompts_dir, &format!("{name}.prompt.md")),
            content: render_prompt(&data, label),
            sources: vec![label.to_owned()],
        })
    }
}

/// Render a workflow or skill document as a prompt file.
pub fn render_prompt(data: &[u8], label: &str) -> Vec<u8> {
    let description = extract_description(data);
    let (_, body) = parse_frontmatter(data);
    let body = strip_annotations(&body);

    let mut out = String::from("---\nmode: \"agent\"\n");
    if !description.is_empty() {
        out.push_str(&format!("description: {description:?}\n"));
    }
    out.push_str(&format!(
        "---\n<!-- Auto-generated by herder from {label} - do not edit -->\n\n"
    ));
    let mut out = out.into_bytes();
    out.extend_from_slice(trim_bytes(&body));
    out.push(b'\n');
    out
}

impl Target for FanoutTarget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn install(&self, cfg: &TargetConfig<'_>) -> Result<Vec<String>, SyncError> {
        let plan = self.plan(cfg)?;
        write_plan(cfg, plan)
    }
}
