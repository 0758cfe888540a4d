use ontree_core::{NodeId, Ontology};
use ontree_render::layout::{layout_tree, level_widths};
use ontree_render::DiagramConfig;
use serde_json::json;

fn tree(value: serde_json::Value) -> Ontology {
    Ontology::from_value(&value).expect("ontology")
}

fn id(t: &Ontology, path: &[&str]) -> NodeId {
    t.find_path(path).expect("node")
}

#[test]
fn two_leaves_share_the_breadth_evenly() {
    let t = tree(json!({ "name": "r", "children": [{ "name": "a" }, { "name": "b" }] }));
    let layout = layout_tree(&t, &DiagramConfig::default());

    assert_eq!(layout.breadth, 50.0);
    assert_eq!(layout.depth_step, 10.0);
    let a = layout.get(id(&t, &["r", "a"])).unwrap();
    let b = layout.get(id(&t, &["r", "b"])).unwrap();
    let r = layout.get(t.root()).unwrap();
    assert_eq!((r.x, r.y), (0.0, 25.0));
    assert_eq!((a.x, a.y), (10.0, 12.5));
    assert_eq!((b.x, b.y), (10.0, 37.5));
    assert_eq!(layout.links.len(), 2);
}

#[test]
fn single_node_sits_in_the_middle_of_its_level() {
    let t = tree(json!({ "name": "only" }));
    let layout = layout_tree(&t, &DiagramConfig::default());
    let r = layout.get(t.root()).unwrap();
    assert_eq!((r.x, r.y), (0.0, 12.5));
    assert!(layout.links.is_empty());
}

#[test]
fn cousins_are_twice_as_far_apart_as_siblings() {
    let t = tree(json!({
        "name": "r",
        "children": [
            { "name": "A", "children": [{ "name": "a1" }, { "name": "a2" }] },
            { "name": "B", "children": [{ "name": "b1" }] }
        ]
    }));
    let layout = layout_tree(&t, &DiagramConfig::default());
    let y = |path: &[&str]| layout.get(id(&t, path)).unwrap().y;

    let a1 = y(&["r", "A", "a1"]);
    let a2 = y(&["r", "A", "a2"]);
    let b1 = y(&["r", "B", "b1"]);
    let sibling_gap = a2 - a1;
    assert!(sibling_gap > 0.0);
    assert!(((b1 - a2) - 2.0 * sibling_gap).abs() < 1e-9);

    // Parents are centered over their children.
    assert!((y(&["r", "A"]) - (a1 + a2) / 2.0).abs() < 1e-9);
    assert!((y(&["r", "B"]) - b1).abs() < 1e-9);

    for node in &layout.nodes {
        assert!(node.y >= 0.0 && node.y <= layout.breadth, "{node:?}");
    }
    assert_eq!(layout.breadth, 75.0);
}

#[test]
fn collapsed_children_take_no_part_in_layout() {
    let mut t = tree(json!({
        "name": "r",
        "children": [
            { "name": "A", "children": [{ "name": "a1" }, { "name": "a2" }] },
            { "name": "B" }
        ]
    }));
    let a = id(&t, &["r", "A"]);
    t.toggle(a).unwrap();

    assert_eq!(level_widths(&t), vec![1, 2]);
    let layout = layout_tree(&t, &DiagramConfig::default());
    assert_eq!(layout.len(), 3);
    assert!(layout.contains(a));
    assert!(!layout.contains(id(&t, &["r", "A", "a1"])));
    assert_eq!(layout.links.len(), 2);
}

#[test]
fn depth_step_follows_the_longest_label_including_hidden_ones() {
    let mut t = tree(json!({
        "name": "r",
        "children": [{ "name": "A", "children": [{ "name": "a rather long name" }] }]
    }));
    let a = id(&t, &["r", "A"]);
    t.toggle(a).unwrap();

    let cfg = DiagramConfig::default();
    let layout = layout_tree(&t, &cfg);
    assert_eq!(layout.depth_step, 18.0 * cfg.label_char_width);
    assert_eq!(layout.get(a).unwrap().x, layout.depth_step);
}

#[test]
fn layout_nodes_come_in_preorder() {
    let t = tree(json!({
        "name": "r",
        "children": [
            { "name": "b", "children": [{ "name": "b1" }] },
            { "name": "a" }
        ]
    }));
    let layout = layout_tree(&t, &DiagramConfig::default());
    let names: Vec<&str> = layout.nodes.iter().map(|n| t[n.id].name()).collect();
    assert_eq!(names, ["r", "a", "b", "b1"]);
    let depths: Vec<usize> = layout.nodes.iter().map(|n| n.depth).collect();
    assert_eq!(depths, [0, 1, 1, 2]);
}
