//! Compound V content compiled into the binary.

use herder_sync::StaticBundle;

const RULE: &[u8] = include_bytes!("../bundled/compound-v/rules/compound-v.md");
const SKILL_TDD: &[u8] = include_bytes!("../bundled/compound-v/skills/compound-v-tdd/SKILL.md");
const SKILL_DEBUG: &[u8] =
    include_bytes!("../bundled/compound-v/skills/compound-v-debug/SKILL.md");
const WORKFLOW_PLAN: &[u8] = include_bytes!("../bundled/compound-v/workflows/plan.md");
const WORKFLOW_EXECUTE: &[u8] = include_bytes!("../bundled/compound-v/workflows/execute.md");
const WORKFLOW_REVIEW: &[u8] = include_bytes!("../bundled/compound-v/workflows/review.md");

const FILES: &[(&str, &[u8])] = &[
    ("compound-v/rules/compound-v.md", RULE),
    ("compound-v/skills/compound-v-tdd/SKILL.md", SKILL_TDD),
    ("compound-v/skills/compound-v-debug/SKILL.md", SKILL_DEBUG),
    ("compound-v/workflows/plan.md", WORKFLOW_PLAN),
    ("compound-v/workflows/execute.md", WORKFLOW_EXECUTE),
    ("compound-v/workflows/review.md", WORKFLOW_REVIEW),
];

pub const COMPOUND_V: StaticBundle = StaticBundle(FILES);
