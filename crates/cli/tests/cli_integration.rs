//! CLI integration tests for the graph, tree, and resolve subcommands.
//!
//! Uses `assert_cmd` to spawn the `procmap` binary and verify exit codes,
//! stdout content, and stderr content. Corpora are copied from `fixtures/`
//! into a temp directory so that write-back tests never touch the fixtures.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `procmap` binary, rooted at `dir`.
fn procmap(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("procmap");
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Copy the order_flow corpus and its reference map into a temp dir.
fn order_flow() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    let src = workspace_root().join("fixtures/order_flow");
    for entry in fs::read_dir(&src).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, corpus.join(path.file_name().unwrap())).unwrap();
    }
    fs::copy(
        workspace_root().join("fixtures/maps/order_flow.json"),
        tmp.path().join("map.json"),
    )
    .unwrap();
    tmp
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    procmap(&workspace_root())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cross-file process map builder"));
}

#[test]
fn version_exits_0() {
    procmap(&workspace_root())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("procmap"));
}

// ──────────────────────────────────────────────
// 2. Graph subcommand
// ──────────────────────────────────────────────

#[test]
fn graph_text_summary() {
    let tmp = order_flow();
    procmap(tmp.path())
        .args(["graph", "corpus", "--map", "map.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Process Graph"))
        .stdout(predicate::str::contains("Roots: process:order.bpmn"))
        .stdout(predicate::str::contains("Auto-accepted (2)"));
}

#[test]
fn graph_json_has_invocation_edges() {
    let tmp = order_flow();
    let output = procmap(tmp.path())
        .args(["--output", "json", "graph", "corpus", "--map", "map.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output);
    let edges = graph["edges"].as_object().unwrap();
    assert!(edges.contains_key(
        "invocation:invocationPoint:order.bpmn:ca_billing->process:invoicing.bpmn"
    ));
    assert_eq!(graph["roots"][0], "process:order.bpmn");
    assert_eq!(graph["unresolved"].as_array().unwrap().len(), 0);
    assert_eq!(graph["acceptedMatches"].as_array().unwrap().len(), 2);
}

#[test]
fn graph_without_map_reports_unresolved() {
    let tmp = order_flow();
    let output = procmap(tmp.path())
        .args(["--output", "json", "graph", "corpus"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output);
    let unresolved = graph["unresolved"].as_array().unwrap();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0]["elementId"], "ca_billing");
    assert_eq!(unresolved[0]["reason"], "no-candidates");
}

#[test]
fn graph_write_back_is_idempotent() {
    let tmp = order_flow();
    let map_path = tmp.path().join("map.json");

    procmap(tmp.path())
        .args(["graph", "corpus", "--map", "map.json", "--write-back"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entries written"));

    let first = fs::read_to_string(&map_path).unwrap();
    let map: serde_json::Value = serde_json::from_str(&first).unwrap();
    let points = map["files"][0]["invocationPoints"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    // the curated entry is left as it was
    assert_eq!(points[0]["id"], "ca_billing");
    assert_eq!(points[0]["targetFile"], "invoicing.bpmn");

    procmap(tmp.path())
        .args(["graph", "corpus", "--map", "map.json", "--write-back"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&map_path).unwrap(), first);
}

#[test]
fn graph_write_back_creates_missing_map() {
    let tmp = order_flow();
    procmap(tmp.path())
        .args(["graph", "corpus", "--map", "new-map.json", "--write-back"])
        .assert()
        .success();

    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("new-map.json")).unwrap())
            .unwrap();
    assert_eq!(map["files"][0]["file"], "order.bpmn");
    assert_eq!(map["files"][0]["processId"], "Process_Order");
}

#[test]
fn graph_write_back_requires_map() {
    let tmp = order_flow();
    procmap(tmp.path())
        .args(["graph", "corpus", "--write-back"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--write-back requires --map"));
}

#[test]
fn graph_missing_directory_exits_1() {
    let tmp = TempDir::new().unwrap();
    procmap(tmp.path())
        .args(["graph", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn graph_invalid_map_exits_1() {
    let tmp = order_flow();
    fs::write(tmp.path().join("map.json"), "[1, 2").unwrap();
    procmap(tmp.path())
        .args(["--output", "json", "graph", "corpus", "--map", "map.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("invalid reference map"));
}

#[test]
fn malformed_member_is_skipped() {
    let tmp = order_flow();
    fs::write(tmp.path().join("corpus/zz_partial.json"), "{\"fileName\": ").unwrap();

    let output = procmap(tmp.path())
        .args(["--output", "json", "graph", "corpus", "--map", "map.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output);
    let diagnostics = graph["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["code"], "invalid-file");
    assert_eq!(graph["roots"][0], "process:order.bpmn");
}

#[test]
fn graph_duplicate_file_name_reported_not_replaced() {
    let tmp = order_flow();
    fs::write(
        tmp.path().join("corpus/order_copy.json"),
        r#"{"fileName": "order.bpmn", "process": {"id": "Process_Order_Copy"}}"#,
    )
    .unwrap();
    let output = procmap(tmp.path())
        .args(["--output", "json", "graph", "corpus", "--map", "map.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output);
    assert_eq!(graph["nodes"]["process:order.bpmn"]["elementId"], "Process_Order");
    let diagnostics = graph["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["code"], "invalid-file");
    assert!(diagnostics[0]["message"]
        .as_str()
        .unwrap()
        .contains("duplicate fileName 'order.bpmn'"));
}

// ──────────────────────────────────────────────
// 3. Tree subcommand
// ──────────────────────────────────────────────

#[test]
fn tree_text_is_indented_in_reading_order() {
    let tmp = order_flow();
    let output = procmap(tmp.path())
        .args(["tree", "corpus", "--map", "map.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("Order handling [process]"));
    assert!(lines[1].starts_with("  Review order [userTask]"));
    assert!(lines[2].starts_with("  Credit check [invocationPoint]"));
    assert!(lines[3].starts_with("    Credit check [process]"));
    assert!(text.contains("Shipping [invocationPoint]  #4 main-branch-1"));
}

#[test]
fn tree_json_with_root() {
    let tmp = order_flow();
    let output = procmap(tmp.path())
        .args(["--output", "json", "tree", "corpus", "--root", "Process_Credit"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tree = stdout_json(&output);
    assert_eq!(tree["id"], "process:credit.bpmn");
    assert_eq!(tree["children"][0]["label"], "Score applicant");
    assert_eq!(tree["children"][0]["kind"], "businessRuleTask");
}

#[test]
fn tree_unknown_root_prints_sentinel() {
    let tmp = order_flow();
    procmap(tmp.path())
        .args(["tree", "corpus", "--root", "nothing-here"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(empty tree)"))
        .stdout(predicate::str::contains("root-not-found"));
}

#[test]
fn tree_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("corpus")).unwrap();
    procmap(tmp.path())
        .args(["tree", "corpus"])
        .assert()
        .success()
        .stdout(predicate::str::contains("empty-corpus"));
}

#[test]
fn tree_cycle_is_reported() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    fs::write(
        corpus.join("a.json"),
        r#"{"process": {"id": "Process_A", "name": "A"},
            "callActivities": [{"id": "callB", "name": "Call B", "calledElement": "Process_B"}]}"#,
    )
    .unwrap();
    fs::write(
        corpus.join("b.json"),
        r#"{"process": {"id": "Process_B", "name": "B"},
            "callActivities": [{"id": "callA", "name": "Call A", "calledElement": "Process_A"}]}"#,
    )
    .unwrap();

    procmap(tmp.path())
        .args(["tree", "corpus", "--root", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cycle-detected"));
}

// ──────────────────────────────────────────────
// 4. Resolve subcommand
// ──────────────────────────────────────────────

#[test]
fn resolve_json_lists_every_invocation_point() {
    let tmp = order_flow();
    let output = procmap(tmp.path())
        .args(["--output", "json", "resolve", "corpus", "--map", "map.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows = stdout_json(&output);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let billing = rows
        .iter()
        .find(|r| r["invocationPointId"] == "ca_billing")
        .unwrap();
    assert_eq!(billing["status"], "matched");
    assert_eq!(billing["source"], "referenceMap");
    assert_eq!(billing["confidence"], 1.0);
    let credit = rows
        .iter()
        .find(|r| r["invocationPointId"] == "ca_credit")
        .unwrap();
    assert_eq!(credit["targetFile"], "credit.bpmn");
    assert_eq!(credit["accepted"], true);
}

#[test]
fn resolve_text_shows_reason() {
    let tmp = order_flow();
    procmap(tmp.path())
        .args(["resolve", "corpus"])
        .assert()
        .success()
        .stdout(predicate::str::contains("order.bpmn#ca_billing  unmatched  -"))
        .stdout(predicate::str::contains("[no-candidates]"));
}

#[test]
fn resolve_skips_files_the_graph_rejects() {
    let tmp = order_flow();
    fs::write(
        tmp.path().join("corpus/broken.json"),
        r#"{"fileName": "broken.bpmn", "process": {"id": "Process_Broken"},
            "callActivities": [{"id": " ", "name": "Credit", "calledElement": "Process_Credit"}]}"#,
    )
    .unwrap();
    let output = procmap(tmp.path())
        .args(["--output", "json", "resolve", "corpus", "--map", "map.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows = stdout_json(&output);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["file"] == "order.bpmn"));
}

// ──────────────────────────────────────────────
// 5. Configuration
// ──────────────────────────────────────────────

#[test]
fn config_threshold_disables_auto_accept() {
    let tmp = order_flow();
    fs::write(
        tmp.path().join("procmap.toml"),
        "[resolver]\nauto_accept_threshold = 1.0\n",
    )
    .unwrap();

    let output = procmap(tmp.path())
        .args(["--output", "json", "graph", "corpus"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let graph = stdout_json(&output);
    assert_eq!(graph["acceptedMatches"].as_array().unwrap().len(), 0);
    let reasons: Vec<&str> = graph["unresolved"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["reason"].as_str().unwrap())
        .collect();
    assert!(reasons.contains(&"low-confidence-match"));
}

#[test]
fn config_out_of_range_exits_1() {
    let tmp = order_flow();
    fs::write(
        tmp.path().join("custom.toml"),
        "[resolver]\nauto_accept_threshold = 2.0\n",
    )
    .unwrap();
    procmap(tmp.path())
        .args(["--config", "custom.toml", "graph", "corpus"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("auto_accept_threshold"));
}

#[test]
fn config_tree_root_is_used() {
    let tmp = order_flow();
    fs::write(tmp.path().join("procmap.toml"), "[tree]\nroot = \"shipping.bpmn\"\n").unwrap();
    procmap(tmp.path())
        .args(["tree", "corpus"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Shipping [process]"));
}

#[test]
fn quiet_suppresses_output() {
    let tmp = order_flow();
    procmap(tmp.path())
        .args(["--quiet", "tree", "corpus"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
