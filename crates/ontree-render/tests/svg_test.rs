use ontree_core::{MatchKey, MeasurementTable, Ontology, annotate};
use ontree_render::layout::layout_tree;
use ontree_render::svg::{SvgOptions, fit_transform, render_html, render_svg};
use ontree_render::DiagramConfig;
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn annotated_fixture() -> Ontology {
    let root = workspace_root().join("fixtures");
    let text = std::fs::read_to_string(root.join("ontology/gfop_small.json")).expect("ontology");
    let mut ontology = Ontology::from_json_str(&text).expect("parse ontology");
    let tsv = std::fs::read_to_string(root.join("measurements/caffeic_acid.tsv")).expect("tsv");
    let table = MeasurementTable::parse_tsv(&tsv).expect("parse tsv");
    annotate(&mut ontology, &table, &MatchKey::default());
    ontology
}

fn node_group<'a, 'i>(
    doc: &'a roxmltree::Document<'i>,
    name: &str,
) -> roxmltree::Node<'a, 'i> {
    doc.descendants()
        .filter(|n| n.has_tag_name("g") && n.attribute("class") == Some("node"))
        .find(|g| {
            g.children()
                .any(|c| c.has_tag_name("text") && c.text() == Some(name))
        })
        .unwrap_or_else(|| panic!("no node labelled {name}"))
}

fn fill_of(doc: &roxmltree::Document<'_>, name: &str) -> String {
    node_group(doc, name)
        .children()
        .find(|c| c.has_tag_name("circle"))
        .and_then(|c| c.attribute("fill"))
        .expect("circle fill")
        .to_string()
}

#[test]
fn fixture_renders_visible_nodes_and_links() {
    let ontology = annotated_fixture();
    let config = DiagramConfig::default();
    let layout = layout_tree(&ontology, &config);
    let svg = render_svg(&ontology, &layout, &config, &SvgOptions::default());
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");

    let groups = doc
        .descendants()
        .filter(|n| n.has_tag_name("g") && n.attribute("class") == Some("node"))
        .count();
    let links = doc
        .descendants()
        .filter(|n| n.has_tag_name("path") && n.attribute("class") == Some("link"))
        .count();
    assert_eq!(groups, 10);
    assert_eq!(links, 9);

    assert_eq!(fill_of(&doc, "GFOP"), "gold");
    assert_eq!(fill_of(&doc, "coffee"), "gold");
    assert_eq!(fill_of(&doc, "animal"), "lightsteelblue");
    assert_eq!(fill_of(&doc, "vegetable"), "lightsteelblue");
    assert_eq!(fill_of(&doc, "Grape"), "#fff");

    let title = node_group(&doc, "coffee")
        .children()
        .find(|c| c.has_tag_name("title"))
        .and_then(|c| c.text())
        .expect("tooltip");
    assert_eq!(
        title,
        "Name: coffee\nMatches: 30\nOccurrence fraction: 0.25\nGroup size: 120"
    );
}

#[test]
fn labels_sit_on_the_side_away_from_children() {
    let ontology = annotated_fixture();
    let config = DiagramConfig::default();
    let layout = layout_tree(&ontology, &config);
    let svg = render_svg(&ontology, &layout, &config, &SvgOptions::default());
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");

    let anchor = |name: &str| {
        node_group(&doc, name)
            .children()
            .find(|c| c.has_tag_name("text"))
            .and_then(|t| t.attribute("text-anchor"))
            .map(str::to_string)
    };
    assert_eq!(anchor("beverage").as_deref(), Some("end"));
    assert_eq!(anchor("tea").as_deref(), Some("start"));
}

#[test]
fn names_are_escaped() {
    let ontology = Ontology::from_json_str(r#"{"name": "Fish & <Chips>"}"#).expect("ontology");
    let config = DiagramConfig::default();
    let layout = layout_tree(&ontology, &config);
    let options = SvgOptions {
        background: Some("white".to_string()),
        tooltips: false,
        ..SvgOptions::default()
    };
    let svg = render_svg(&ontology, &layout, &config, &options);
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    node_group(&doc, "Fish & <Chips>");
    assert!(!doc.descendants().any(|n| n.has_tag_name("title")));
    assert!(doc
        .descendants()
        .any(|n| n.has_tag_name("rect") && n.attribute("fill") == Some("white")));
}

#[test]
fn fit_transform_keeps_every_node_in_view() {
    let ontology = annotated_fixture();
    let mut config = DiagramConfig::default();
    config.viewport_width = 300.0;
    config.viewport_height = 200.0;
    let layout = layout_tree(&ontology, &config);
    let t = fit_transform(&layout, &config);
    assert!(t.scale <= 1.0 && t.scale >= config.min_zoom);
    for node in &layout.nodes {
        let p = t.apply(node.position());
        assert!((0.0..=300.0).contains(&p.x), "{p:?}");
        assert!((0.0..=200.0).contains(&p.y), "{p:?}");
    }
}

#[test]
fn html_page_wraps_the_svg() {
    let ontology = annotated_fixture();
    let config = DiagramConfig::default();
    let layout = layout_tree(&ontology, &config);
    let html = render_html(
        &ontology,
        &layout,
        &config,
        &SvgOptions::default(),
        "caffeic acid & friends",
    );
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>caffeic acid &amp; friends</title>"));
    assert!(html.contains(r#"<div id="tree-container"><svg"#));
}
