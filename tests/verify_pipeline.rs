//! End-to-end verification pipeline tests over real git repositories.

use git2::{Repository, Signature};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use swarmgate_lib::models::ComplexityClass;
use swarmgate_lib::verify::{self, GateConfig, VerifyDecision};
use swarmgate_lib::workspace::Workspace;
use tempfile::TempDir;

fn setup_repo() -> (TempDir, Workspace) {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    fs::write(temp.path().join("README.md"), "# project\n").unwrap();
    {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("test", "test@localhost").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }
    drop(repo);
    let workspace = Workspace::open(temp.path()).unwrap();
    (temp, workspace)
}

fn declared(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn clean_change_is_accepted_and_committed() {
    let (temp, workspace) = setup_repo();
    fs::write(temp.path().join("feature.txt"), "new feature\n").unwrap();

    let report = verify::evaluate(
        &workspace,
        &declared(&["feature.txt"]),
        ComplexityClass::Medium,
        &GateConfig::default(),
    )
    .unwrap();

    assert!(report.decision.is_accepted());
    assert_eq!(report.numeric_score(), 10);

    let commit = workspace.accept("accept feature").unwrap();
    assert!(!commit.is_empty());

    // Nothing left uncommitted after accept
    let change = workspace.change_set().unwrap();
    assert!(change.files.is_empty());
}

#[test]
fn rogue_edit_rejects_and_enforce_reverts() {
    let (temp, workspace) = setup_repo();
    fs::write(temp.path().join("declared.txt"), "fine\n").unwrap();
    fs::write(temp.path().join("rogue.txt"), "sneaky\n").unwrap();

    let report = verify::evaluate(
        &workspace,
        &declared(&["declared.txt"]),
        ComplexityClass::Medium,
        &GateConfig::default(),
    )
    .unwrap();

    assert!(matches!(report.decision, VerifyDecision::Rejected { .. }));
    assert_eq!(report.rogue_edits, vec!["rogue.txt".to_string()]);
    assert_eq!(report.decision.exit_code(), 1);

    verify::enforce(&workspace, &report).unwrap();
    assert!(!temp.path().join("declared.txt").exists());
    assert!(!temp.path().join("rogue.txt").exists());
    // The committed baseline survives the revert
    assert!(temp.path().join("README.md").exists());
}

#[test]
fn secret_in_added_line_blocks_with_redacted_finding() {
    let (temp, workspace) = setup_repo();
    fs::write(
        temp.path().join("config.ts"),
        "const password = \"supersecretvalue123\";\n",
    )
    .unwrap();

    let report = verify::evaluate(
        &workspace,
        &declared(&["config.ts"]),
        ComplexityClass::Small,
        &GateConfig::default(),
    )
    .unwrap();

    match &report.decision {
        VerifyDecision::SecretsBlocked { findings } => {
            assert_eq!(findings.len(), 1);
            assert!(!findings[0].redacted_line.contains("supersecretvalue123"));
        }
        other => panic!("expected secrets block, got {:?}", other),
    }
    assert_eq!(report.decision.exit_code(), 2);

    let results = temp.path().join("results");
    report.write_artifacts(&results).unwrap();
    let status = fs::read_to_string(results.join("status.txt")).unwrap();
    assert_eq!(status.trim(), "SECRETS_FOUND");
    let findings_json = fs::read_to_string(results.join("findings.json")).unwrap();
    assert!(!findings_json.contains("supersecretvalue123"));

    verify::enforce(&workspace, &report).unwrap();
    assert!(!temp.path().join("config.ts").exists());
}

#[test]
fn allowlisted_env_reference_passes() {
    let (temp, workspace) = setup_repo();
    fs::write(
        temp.path().join("config.ts"),
        "const token = process.env.API_TOKEN;\n",
    )
    .unwrap();

    let report = verify::evaluate(
        &workspace,
        &declared(&["config.ts"]),
        ComplexityClass::Small,
        &GateConfig::default(),
    )
    .unwrap();

    assert!(report.secret_findings.is_empty());
    assert!(report.decision.is_accepted());
}

#[test]
fn oversized_diff_rejects_at_phase_zero() {
    let (temp, workspace) = setup_repo();
    let big: String = (0..150).map(|i| format!("line {}\n", i)).collect();
    fs::write(temp.path().join("big.txt"), big).unwrap();

    let report = verify::evaluate(
        &workspace,
        &declared(&["big.txt"]),
        ComplexityClass::Small,
        &GateConfig::default(),
    )
    .unwrap();

    assert!(matches!(report.decision, VerifyDecision::Rejected { .. }));
    // Phase 0 short-circuits the quality gate
    assert!(report.quality.is_none());
    assert_eq!(report.numeric_score(), 0);
}

#[test]
fn verifying_unchanged_diff_twice_is_identical() {
    let (temp, workspace) = setup_repo();
    fs::write(temp.path().join("feature.txt"), "same content\n").unwrap();

    let config = GateConfig::default();
    let first = verify::evaluate(
        &workspace,
        &declared(&["feature.txt"]),
        ComplexityClass::Medium,
        &config,
    )
    .unwrap();
    let second = verify::evaluate(
        &workspace,
        &declared(&["feature.txt"]),
        ComplexityClass::Medium,
        &config,
    )
    .unwrap();

    assert_eq!(first.numeric_score(), second.numeric_score());
    assert_eq!(first.changed_lines, second.changed_lines);
    assert_eq!(first.secret_findings, second.secret_findings);
    assert_eq!(first.rogue_edits, second.rogue_edits);
}

#[test]
fn revert_is_idempotent() {
    let (temp, workspace) = setup_repo();
    fs::write(temp.path().join("scratch.txt"), "temp\n").unwrap();

    workspace.revert().unwrap();
    workspace.revert().unwrap();

    assert!(!temp.path().join("scratch.txt").exists());
    assert!(temp.path().join("README.md").exists());
    assert!(workspace.change_set().unwrap().files.is_empty());
}
