//! Skill variant selection.
//!
//! A skill directory holds a generic `SKILL.md` and, optionally, uppercase
//! per-target variants registered in [`VARIANT_FILES`]. For a target T the
//! T variant wins over the generic document and takes its name in the
//! output; variants registered for other targets never reach T.

use std::collections::BTreeSet;

use crate::walk::{base_name, parent_rel};

/// Generic skill document name; variants are renamed to this on output.
pub const GENERIC_SKILL: &str = "SKILL.md";

/// Variant filename → target name. One entry per target.
pub const VARIANT_FILES: &[(&str, &str)] = &[
    ("ANTIGRAVITY.md", "antigravity"),
    ("COPILOT.md", "copilot"),
];

/// Target a variant filename is registered for, if any.
pub fn variant_target(filename: &str) -> Option<&'static str> {
    VARIANT_FILES
        .iter()
        .find(|(file, _)| *file == filename)
        .map(|(_, target)| *target)
}

/// Variant filename registered for `target`, if any.
pub fn variant_file_for(target: &str) -> Option<&'static str> {
    VARIANT_FILES
        .iter()
        .find(|(_, t)| *t == target)
        .map(|(file, _)| *file)
}

/// True for paths inside `skills/<name>/`, e.g. `skills/tdd/SKILL.md`.
pub fn is_in_skill_dir(rel: &str) -> bool {
    rel.starts_with("skills/") && rel.matches('/').count() >= 2
}

/// True for paths under `workflows/`.
pub fn is_in_workflow_dir(rel: &str) -> bool {
    rel.starts_with("workflows/")
}

/// Pick the document `target` should use among the filenames of one skill
/// directory: its own variant, else the generic document, else nothing.
pub fn resolve_skill_doc<'a>(
    names: impl IntoIterator<Item = &'a str>,
    target: &str,
) -> Option<&'a str> {
    let own = variant_file_for(target);
    let mut generic = None;
    for name in names {
        if Some(name) == own {
            return Some(name);
        }
        if name == GENERIC_SKILL {
            generic = Some(name);
        }
    }
    generic
}

/// A source file kept for a target and the relative path it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected<'a> {
    pub source: &'a str,
    pub output: String,
}

/// Apply variant selection to a sorted listing of relative paths.
///
/// Files outside skill directories pass through unchanged. Inside a skill
/// directory the target's own variant is emitted as [`GENERIC_SKILL`], the
/// generic document is dropped when that variant is present, and other
/// targets' variants are dropped. Input order is preserved.
pub fn select<'a>(rels: &[&'a str], target: &str) -> Vec<Selected<'a>> {
    let present: BTreeSet<&str> = rels.iter().copied().collect();
    let own = variant_file_for(target);

    rels.iter()
        .filter_map(|&rel| {
            if !is_in_skill_dir(rel) {
                return Some(Selected {
                    source: rel,
                    output: rel.to_owned(),
                });
            }
            let dir = parent_rel(rel);
            let name = base_name(rel);
            if let Some(owner) = variant_target(name) {
                if owner != target {
                    return None;
                }
                return Some(Selected {
                    source: rel,
                    output: format!("{dir}/{GENERIC_SKILL}"),
                });
            }
            if name == GENERIC_SKILL {
                if let Some(own) = own {
                    if present.contains(format!("{dir}/{own}").as_str()) {
                        tracing::debug!(file = rel, "skipping generic skill (variant exists)");
                        return None;
                    }
                }
            }
            Some(Selected {
                source: rel,
                output: rel.to_owned(),
            })
        })
        .collect()
}
