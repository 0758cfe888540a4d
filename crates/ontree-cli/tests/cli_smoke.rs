use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(rel: &str) -> String {
    let path = repo_root().join("fixtures").join(rel);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path.to_string_lossy().to_string()
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("ontree-cli"));
    cmd.current_dir(repo_root());
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run ontree-cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 stdout")
}

#[test]
fn tree_prints_the_visible_outline() {
    let text = stdout_of(cli().args([
        "tree",
        "--measurements",
        &fixture("measurements/caffeic_acid.tsv"),
        &fixture("ontology/gfop_small.json"),
    ]));
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("- GFOP [matches=42 group=240 fraction=0.4"));
    assert_eq!(lines[1], "  + animal");
    assert!(lines.contains(&"        coffee [matches=30 group=120 fraction=0.25]"));
    let total = lines.last().copied().unwrap_or_default();
    assert!(total.starts_with("total matches=42 group=240 "), "{total}");
}

#[test]
fn layout_emits_json_nodes_and_links() {
    let text = stdout_of(cli().args([
        "layout",
        "--expand-all",
        &fixture("ontology/gfop_small.json"),
    ]));
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    let nodes = value["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 18);
    assert_eq!(value["links"].as_array().expect("links").len(), 17);
    assert_eq!(nodes[0]["name"], "GFOP");
    assert_eq!(nodes[0]["x"], 0.0);
}

#[test]
fn render_writes_well_formed_svg() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("tree.svg");
    cli()
        .args([
            "render",
            "--measurements",
            &fixture("measurements/caffeic_acid.tsv"),
            "--background",
            "white",
            "--out",
            out.to_string_lossy().as_ref(),
            &fixture("ontology/gfop_small.json"),
        ])
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read svg");
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let nodes = doc
        .descendants()
        .filter(|n| n.has_tag_name("g") && n.attribute("class") == Some("node"))
        .count();
    assert_eq!(nodes, 10);
}

#[test]
fn render_png_defaults_next_to_the_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("gfop.json");
    fs::copy(fixture("ontology/gfop_small.json"), &input).expect("copy fixture");

    cli()
        .args([
            "render",
            "--format",
            "png",
            "--expand-all",
            input.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(input.with_extension("png")).expect("read png");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "output is not a PNG"
    );
}

#[test]
fn counts_then_merge_attaches_counts_to_taxa() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let counts = tmp.path().join("counts.tsv");
    cli()
        .args([
            "counts",
            "--out",
            counts.to_string_lossy().as_ref(),
            &fixture("microbe/metadata.csv"),
            &fixture("microbe/masst_matches.tsv"),
        ])
        .assert()
        .success();
    let text = fs::read_to_string(&counts).expect("read counts");
    assert_eq!(text, "ncbi\tmatched_size\n562\t2\n1280\t1\n");

    let merged = stdout_of(cli().args([
        "merge",
        "--node-field",
        "NCBI",
        "--data-field",
        "ncbi",
        &fixture("microbe/taxonomy.json"),
        counts.to_string_lossy().as_ref(),
    ]));
    let value: serde_json::Value = serde_json::from_str(&merged).expect("json");
    let ecoli = &value["children"][1]["children"][0];
    assert_eq!(ecoli["name"], "Escherichia coli");
    assert_eq!(ecoli["matched_size"], 2);
}

#[test]
fn convert_builds_a_nested_tree() {
    let text = stdout_of(cli().args(["convert", &fixture("classyfire/terms.json")]));
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["name"], "Organic compounds");
    assert_eq!(value["children"].as_array().expect("children").len(), 2);
}

#[test]
fn usage_text_explains_how_to_merge_counts() {
    let output = cli().args(["counts"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--data-field ncbi"), "{stderr}");
}

#[test]
fn usage_errors_exit_with_two() {
    cli().args(["render"]).assert().code(2);
    cli()
        .args(["render", "--format", "gif", "x.json"])
        .assert()
        .code(2);
}

#[test]
fn load_errors_exit_with_one() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"{"children": []}"#).expect("write");
    cli()
        .args(["tree", bad.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}

#[test]
fn tree_json_exports_stats_on_every_node() {
    let text = stdout_of(cli().args([
        "tree",
        "--json",
        "--measurements",
        &fixture("measurements/caffeic_acid.tsv"),
        &fixture("ontology/gfop_small.json"),
    ]));
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["matched_size"], 42.0);
    let animal = &value["children"][0];
    assert_eq!(animal["name"], "animal");
    assert_eq!(animal["matched_size"], 0.0);
    // Collapsed branches are exported too.
    assert_eq!(animal["children"].as_array().expect("children").len(), 2);
}
