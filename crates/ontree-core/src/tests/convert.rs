use crate::Error;
use crate::convert::classyfire_to_ontology;
use serde_json::json;

#[test]
fn classyfire_terms_become_a_nested_tree() {
    let text = json!([
        { "chemont_id": "C1", "name": "Chemical entities", "parent_chemont_id": null },
        { "chemont_id": "C3", "name": "Organic compounds", "parent_chemont_id": "C1" },
        { "chemont_id": "C2", "name": "Inorganic compounds", "parent_chemont_id": "null" },
        { "chemont_id": "C4", "name": "Lipids", "parent_chemont_id": "C3" }
    ])
    .to_string();

    let err = classyfire_to_ontology(&text).unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }), "two roots: {err}");

    let text = json!([
        { "chemont_id": "C1", "name": "Chemical entities", "parent_chemont_id": null },
        { "chemont_id": "C3", "name": "Organic compounds", "parent_chemont_id": "C1" },
        { "chemont_id": "C2", "name": "Inorganic compounds", "parent_chemont_id": "C1" },
        { "chemont_id": "C4", "name": "Lipids", "parent_chemont_id": "C3" }
    ])
    .to_string();
    let o = classyfire_to_ontology(&text).unwrap();

    assert_eq!(o.len(), 4);
    let lipids = o
        .find_path(&["Chemical entities", "Organic compounds", "Lipids"])
        .unwrap();
    assert_eq!(o[lipids].attributes().get("id"), Some(&json!("C4")));
    let root_children: Vec<&str> = o[o.root()]
        .branch()
        .all_children()
        .iter()
        .map(|&c| o[c].name())
        .collect();
    assert_eq!(root_children, ["Inorganic compounds", "Organic compounds"]);
}

#[test]
fn unknown_parents_and_cycles_are_rejected() {
    let dangling = json!([
        { "chemont_id": "C1", "name": "root", "parent_chemont_id": null },
        { "chemont_id": "C2", "name": "orphan", "parent_chemont_id": "C9" }
    ])
    .to_string();
    assert!(matches!(
        classyfire_to_ontology(&dangling),
        Err(Error::Conversion { .. })
    ));

    let cyclic = json!([
        { "chemont_id": "C1", "name": "root", "parent_chemont_id": null },
        { "chemont_id": "C2", "name": "a", "parent_chemont_id": "C3" },
        { "chemont_id": "C3", "name": "b", "parent_chemont_id": "C2" }
    ])
    .to_string();
    assert!(matches!(
        classyfire_to_ontology(&cyclic),
        Err(Error::Conversion { .. })
    ));
}
