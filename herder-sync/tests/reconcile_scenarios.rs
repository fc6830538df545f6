//! End-to-end reconciliation scenarios against scratch repositories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use tempfile::TempDir;

use herder_core::layout::resolve;
use herder_core::{Layout, TargetName};
use herder_sync::manifest;
use herder_sync::{
    run, run_all, run_target, BundledTarget, CancelToken, FanoutTarget, MemoryBundle,
    MirrorTarget, Removal, RunConfig, RunScope, SyncError, Target, TargetConfig,
};

struct Repo {
    tmp: TempDir,
}

impl Repo {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().expect("tempdir"),
        }
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn path(&self, rel: &str) -> PathBuf {
        resolve(self.root(), rel)
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    fn herd(&self, dir: &str, name: &str) {
        self.write(
            &format!(".promptherder/herds/{dir}/herd.json"),
            &format!("{{\"name\": \"{name}\"}}"),
        );
    }

    fn cfg(&self) -> RunConfig {
        RunConfig::new(self.root())
    }

    fn manifest(&self) -> herder_sync::Manifest {
        manifest::load_at(self.root(), &Layout::default())
    }

    fn owned(&self, target: &str) -> Vec<String> {
        self.manifest()
            .target_files(&TargetName::from(target))
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    fn mtime(&self, rel: &str) -> FileTime {
        FileTime::from_last_modification_time(&fs::metadata(self.path(rel)).unwrap())
    }
}

fn registry() -> Vec<Box<dyn Target>> {
    vec![Box::new(MirrorTarget::new()), Box::new(FanoutTarget::new())]
}

fn mirror_only() -> Vec<Box<dyn Target>> {
    vec![Box::new(MirrorTarget::new())]
}

/// A target that always fails, for abort behaviour.
struct Broken;

impl Target for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn install(&self, _cfg: &TargetConfig<'_>) -> Result<Vec<String>, SyncError> {
        Err(SyncError::Validation("broken on purpose".to_owned()))
    }
}

#[test]
fn full_run_merges_herds_and_fans_out() {
    let repo = Repo::new();
    repo.herd("cv", "compound-v");
    repo.write(".promptherder/herds/cv/rules/00-general.md", "# General\n");
    repo.write(
        ".promptherder/herds/cv/rules/01-shell.md",
        "---\napplyTo: \"**/*.sh\"\n---\n# Shell\n",
    );
    repo.write(".promptherder/herds/cv/workflows/plan.md", "# Plan\n");
    repo.write(".promptherder/herds/cv/skills/tdd/SKILL.md", "# TDD\n");

    let report = run_all(&registry(), &repo.cfg()).unwrap();
    assert_eq!(report.herds.len(), 1);
    let names: Vec<&str> = report.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["herds", "antigravity", "copilot"]);

    assert_eq!(repo.read(".agent/rules/00-general.md"), "# General\n");
    assert_eq!(repo.read(".agent/skills/tdd/SKILL.md"), "# TDD\n");
    assert!(repo.read(".github/copilot-instructions.md").contains("# General"));
    assert!(repo.path(".github/instructions/01-shell.instructions.md").exists());
    assert!(repo.path(".github/prompts/plan.prompt.md").exists());
    assert!(repo.path(".github/prompts/tdd.prompt.md").exists());

    let m = repo.manifest();
    assert_eq!(m.version, 2);
    assert_eq!(repo.owned("herds").len(), 4);
    assert!(repo.owned("antigravity").contains(&".agent/workflows/plan.md".to_owned()));
}

#[test]
fn second_run_changes_nothing() {
    let repo = Repo::new();
    repo.herd("cv", "compound-v");
    repo.write(".promptherder/herds/cv/rules/a.md", "# A\n");
    repo.write(".promptherder/herds/cv/workflows/plan.md", "# Plan\n");

    let first = run_all(&registry(), &repo.cfg()).unwrap();
    let before_manifest = repo.manifest();
    let before = [
        repo.mtime(".agent/rules/a.md"),
        repo.mtime(".github/copilot-instructions.md"),
        repo.mtime(".github/prompts/plan.prompt.md"),
    ];

    let second = run_all(&registry(), &repo.cfg()).unwrap();
    let after_manifest = repo.manifest();
    let after = [
        repo.mtime(".agent/rules/a.md"),
        repo.mtime(".github/copilot-instructions.md"),
        repo.mtime(".github/prompts/plan.prompt.md"),
    ];

    assert_eq!(first.targets, second.targets);
    assert!(second.removed.is_empty());
    assert_eq!(before, after);
    assert_eq!(before_manifest.targets, after_manifest.targets);
    assert_eq!(before_manifest.generated, after_manifest.generated);
}

#[test]
fn removing_every_herd_keeps_merged_tree_and_ownership() {
    let repo = Repo::new();
    repo.herd("cv", "compound-v");
    repo.write(".promptherder/herds/cv/rules/a.md", "# A\n");

    run_all(&mirror_only(), &repo.cfg()).unwrap();
    assert_eq!(repo.owned("herds"), [".promptherder/agent/rules/a.md"]);

    fs::remove_dir_all(repo.path(".promptherder/herds")).unwrap();
    let report = run_all(&mirror_only(), &repo.cfg()).unwrap();

    assert!(report.herds.is_empty());
    assert!(report.removed.is_empty());
    let names: Vec<&str> = report.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["antigravity"]);
    assert_eq!(repo.read(".promptherder/agent/rules/a.md"), "# A\n");
    assert_eq!(repo.read(".agent/rules/a.md"), "# A\n");
    assert_eq!(repo.owned("herds"), [".promptherder/agent/rules/a.md"]);
}

#[test]
#[cfg(unix)]
fn symlinked_herd_files_are_merged() {
    let repo = Repo::new();
    repo.herd("cv", "compound-v");
    repo.write("shared/linked.md", "# Linked\n");
    fs::create_dir_all(repo.path(".promptherder/herds/cv/rules")).unwrap();
    std::os::unix::fs::symlink(
        repo.path("shared/linked.md"),
        repo.path(".promptherder/herds/cv/rules/linked.md"),
    )
    .unwrap();

    let report = run_all(&mirror_only(), &repo.cfg()).unwrap();

    assert_eq!(report.targets[0].files, [".promptherder/agent/rules/linked.md"]);
    assert_eq!(repo.read(".promptherder/agent/rules/linked.md"), "# Linked\n");
    assert_eq!(repo.read(".agent/rules/linked.md"), "# Linked\n");
}

#[test]
fn removed_source_output_is_cleaned_up() {
    let repo = Repo::new();
    repo.write(".promptherder/agent/rules/a.md", "# A\n");
    repo.write(".promptherder/agent/rules/b.md", "# B\n");

    run_all(&mirror_only(), &repo.cfg()).unwrap();
    assert_eq!(repo.owned("antigravity"), [".agent/rules/a.md", ".agent/rules/b.md"]);

    fs::remove_file(repo.path(".promptherder/agent/rules/b.md")).unwrap();
    let report = run_all(&mirror_only(), &repo.cfg()).unwrap();

    assert_eq!(
        report.removed,
        [Removal::Removed {
            path: ".agent/rules/b.md".to_owned()
        }]
    );
    assert!(!repo.path(".agent/rules/b.md").exists());
    assert_eq!(repo.read(".agent/rules/a.md"), "# A\n");
    assert_eq!(repo.owned("antigravity"), [".agent/rules/a.md"]);
}

#[test]
fn unowned_files_are_never_deleted() {
    let repo = Repo::new();
    repo.write(".agent/rules/mine.md", "hand-written");
    repo.write(".promptherder/agent/rules/a.md", "# A\n");
    run_all(&mirror_only(), &repo.cfg()).unwrap();

    fs::remove_dir_all(repo.path(".promptherder/agent")).unwrap();
    run_all(&mirror_only(), &repo.cfg()).unwrap();

    assert!(!repo.path(".agent/rules/a.md").exists());
    assert_eq!(repo.read(".agent/rules/mine.md"), "hand-written");
}

#[test]
fn protected_output_keeps_its_bytes() {
    let repo = Repo::new();
    repo.write(
        ".promptherder/manifest.json",
        r#"{"version":2,"generated_at":"2024-01-01T00:00:00Z","targets":{},"generated":["stack.md"]}"#,
    );
    repo.write(".promptherder/agent/rules/stack.md", "template");
    repo.write(".agent/rules/stack.md", "filled in by the agent");

    run_all(&mirror_only(), &repo.cfg()).unwrap();
    assert_eq!(repo.read(".agent/rules/stack.md"), "filled in by the agent");
    assert!(repo.manifest().is_protected("stack.md"));
}

#[test]
fn protected_output_is_created_when_absent() {
    let repo = Repo::new();
    repo.write(
        ".promptherder/manifest.json",
        r#"{"version":2,"generated_at":"2024-01-01T00:00:00Z","targets":{},"generated":["stack.md"]}"#,
    );
    repo.write(".promptherder/agent/rules/stack.md", "template");

    run_all(&mirror_only(), &repo.cfg()).unwrap();
    assert_eq!(repo.read(".agent/rules/stack.md"), "template");
}

#[test]
fn conflicting_herds_abort_the_run() {
    let repo = Repo::new();
    repo.herd("one", "alpha");
    repo.herd("two", "beta");
    repo.write(".promptherder/herds/one/rules/a.md", "alpha");
    repo.write(".promptherder/herds/two/rules/a.md", "beta");

    let err = run_all(&registry(), &repo.cfg()).unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, SyncError::Conflict { .. }));
    assert!(msg.contains("rules/a.md"));
    assert!(msg.contains("alpha") && msg.contains("beta"));
    assert!(!repo.path(".promptherder/agent/rules/a.md").exists());
    assert!(!repo.path(".promptherder/manifest.json").exists());
    assert!(!repo.path(".agent").exists());
}

#[test]
fn dry_run_touches_nothing() {
    let repo = Repo::new();
    repo.write(".promptherder/agent/rules/a.md", "# A\n");
    repo.write(".promptherder/agent/rules/b.md", "# B\n");
    run_all(&registry(), &repo.cfg()).unwrap();
    let manifest_before = repo.read(".promptherder/manifest.json");

    fs::remove_file(repo.path(".promptherder/agent/rules/b.md")).unwrap();
    repo.write(".promptherder/agent/rules/c.md", "# C\n");
    let report = run_all(&registry(), &repo.cfg().with_dry_run(true)).unwrap();

    assert!(report.dry_run);
    assert_eq!(repo.read(".promptherder/manifest.json"), manifest_before);
    assert!(repo.path(".agent/rules/b.md").exists());
    assert!(!repo.path(".agent/rules/c.md").exists());
    assert!(report
        .removed
        .iter()
        .all(|r| matches!(r, Removal::WouldRemove { .. })));
    assert!(report.removed.iter().any(|r| r.path() == ".agent/rules/b.md"));
    let mirror = report
        .targets
        .iter()
        .find(|t| t.name.as_str() == "antigravity")
        .unwrap();
    assert!(mirror.files.contains(&".agent/rules/c.md".to_owned()));
}

#[test]
fn dry_run_on_fresh_repo_leaves_no_manifest() {
    let repo = Repo::new();
    repo.herd("cv", "compound-v");
    repo.write(".promptherder/herds/cv/rules/a.md", "# A\n");

    let report = run_all(&registry(), &repo.cfg().with_dry_run(true)).unwrap();
    assert_eq!(report.targets[0].files, [".promptherder/agent/rules/a.md"]);
    assert!(!repo.path(".promptherder/manifest.json").exists());
    assert!(!repo.path(".promptherder/agent").exists());
    assert!(!repo.path(".agent").exists());
    assert!(!repo.path(".github").exists());
}

#[test]
fn variant_replaces_generic_for_its_target_only() {
    let repo = Repo::new();
    repo.write(".promptherder/agent/skills/tdd/SKILL.md", "generic\n");
    repo.write(".promptherder/agent/skills/tdd/ANTIGRAVITY.md", "antigravity variant\n");

    let report = run_all(&registry(), &repo.cfg()).unwrap();
    assert_eq!(repo.read(".agent/skills/tdd/SKILL.md"), "antigravity variant\n");
    assert!(!repo.path(".agent/skills/tdd/ANTIGRAVITY.md").exists());
    for outcome in &report.targets {
        assert!(outcome.files.iter().all(|f| !f.ends_with("ANTIGRAVITY.md")));
    }
    let prompt = repo.read(".github/prompts/tdd.prompt.md");
    assert!(prompt.contains("generic"));
    assert!(!prompt.contains("antigravity variant"));
}

#[test]
fn single_target_run_preserves_other_entries() {
    let repo = Repo::new();
    repo.herd("cv", "compound-v");
    repo.write(".promptherder/herds/cv/rules/a.md", "# A\n");
    run_all(&registry(), &repo.cfg()).unwrap();
    let herds_before = repo.owned("herds");
    let mirror_before = repo.owned("antigravity");

    repo.write(".promptherder/agent/workflows/new.md", "# New\n");
    let report = run(&registry(), RunScope::Target("copilot".to_owned()), &repo.cfg()).unwrap();

    assert_eq!(report.targets.len(), 1);
    assert_eq!(repo.owned("herds"), herds_before);
    assert_eq!(repo.owned("antigravity"), mirror_before);
    assert!(repo
        .owned("copilot")
        .contains(&".github/prompts/new.prompt.md".to_owned()));
    assert!(!repo.path(".agent/workflows/new.md").exists());
}

#[test]
fn unknown_target_is_a_validation_error() {
    let repo = Repo::new();
    let err = run(&registry(), RunScope::Target("cursor".to_owned()), &repo.cfg()).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn failing_target_aborts_before_later_targets_and_manifest() {
    let repo = Repo::new();
    repo.write(".promptherder/agent/rules/a.md", "# A\n");
    let targets: Vec<Box<dyn Target>> = vec![Box::new(Broken), Box::new(MirrorTarget::new())];

    let err = run_all(&targets, &repo.cfg()).unwrap_err();
    assert!(matches!(err, SyncError::Target { ref name, .. } if name == "broken"));
    assert!(!repo.path(".agent").exists());
    assert!(!repo.path(".promptherder/manifest.json").exists());
}

#[test]
fn cancelled_run_writes_nothing() {
    let repo = Repo::new();
    repo.write(".promptherder/agent/rules/a.md", "# A\n");
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = run_all(&registry(), &repo.cfg().with_cancel(cancel)).unwrap_err();
    assert!(err.is_cancelled());
    assert!(!repo.path(".agent").exists());
    assert!(!repo.path(".promptherder/manifest.json").exists());
}

#[test]
fn bundled_content_survives_a_full_run() {
    let repo = Repo::new();
    let mut bundle = MemoryBundle::new();
    bundle.insert("compound-v/rules/compound-v.md", "# Compound V\n");
    let bundled = BundledTarget::new(Arc::new(bundle));

    run_target(&bundled, &repo.cfg()).unwrap();
    assert_eq!(
        repo.owned("compound-v"),
        [".promptherder/agent/rules/compound-v.md"]
    );

    run_all(&registry(), &repo.cfg()).unwrap();
    assert_eq!(repo.read(".agent/rules/compound-v.md"), "# Compound V\n");
    assert!(repo.path(".promptherder/agent/rules/compound-v.md").exists());
    assert_eq!(
        repo.owned("compound-v"),
        [".promptherder/agent/rules/compound-v.md"]
    );
}

#[test]
fn legacy_flat_manifest_entries_are_cleaned() {
    let repo = Repo::new();
    repo.write(".github/copilot-instructions.md", "old output");
    repo.write(
        ".promptherder/manifest.json",
        r#"{"version":1,"source_dir":".agent/rules","generated_at":"2024-01-01T00:00:00Z","files":[".github/copilot-instructions.md"]}"#,
    );

    let report = run_all(&mirror_only(), &repo.cfg()).unwrap();
    assert_eq!(report.removed[0].path(), ".github/copilot-instructions.md");
    assert!(!repo.path(".github/copilot-instructions.md").exists());
    assert_eq!(repo.manifest().version, 2);
    assert!(repo.manifest().legacy_files.is_empty());
}

#[test]
fn corrupt_manifest_is_treated_as_empty() {
    let repo = Repo::new();
    repo.write(".promptherder/manifest.json", "{ not json");
    repo.write(".promptherder/agent/rules/a.md", "# A\n");

    run_all(&mirror_only(), &repo.cfg()).unwrap();
    assert_eq!(repo.owned("antigravity"), [".agent/rules/a.md"]);
}

#[test]
fn empty_repo_path_is_a_validation_error() {
    let err = run_all(&registry(), &RunConfig::new("")).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn custom_layout_is_honoured() {
    let repo = Repo::new();
    let layout = Layout {
        canonical_dir: "src-agent".to_owned(),
        mirror_dir: "out".to_owned(),
        ..Layout::default()
    };
    repo.write("src-agent/rules/a.md", "# A\n");

    run_all(&mirror_only(), &repo.cfg().with_layout(layout.clone())).unwrap();
    assert_eq!(repo.read("out/rules/a.md"), "# A\n");
    let m = manifest::load_at(repo.root(), &layout);
    assert_eq!(
        m.target_files(&TargetName::from("antigravity")).unwrap(),
        ["out/rules/a.md"]
    );
}
