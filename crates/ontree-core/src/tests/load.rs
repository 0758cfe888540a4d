use super::SAMPLE_TSV;
use crate::Error;
use crate::load::{FileSource, InlineSource, LoadOptions, TextSource, load_tree};
use futures::FutureExt;
use futures::executor::block_on;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};

const ONTOLOGY: &str = r#"{
  "name": "root",
  "children": [
    { "name": "Phenols", "children": [{ "name": "Caffeic acid" }] },
    { "name": "Alkaloids", "children": [{ "name": "Morphine" }] }
  ]
}"#;

struct CountingSource<'a> {
    inner: InlineSource,
    fetches: &'a AtomicUsize,
}

impl TextSource for CountingSource<'_> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn fetch(&self) -> BoxFuture<'_, std::io::Result<String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch()
    }
}

#[test]
fn load_tree_annotates_and_sets_visibility() {
    let ontology = InlineSource::new("ontology", ONTOLOGY);
    let rows = InlineSource::new("rows", SAMPLE_TSV);

    let loaded = block_on(load_tree(&ontology, &rows, &LoadOptions::default())).unwrap();

    assert_eq!(loaded.measurements.len(), 3);
    assert_eq!(loaded.totals.matched_count, 5.0);
    let o = &loaded.ontology;
    assert!(o[o.find_by_name("Phenols").unwrap()].branch().is_expanded());
    assert!(o[o.find_by_name("Alkaloids").unwrap()].branch().is_collapsed());
}

#[test]
fn ontology_failure_aborts_before_measurements_are_fetched() {
    let fetches = AtomicUsize::new(0);
    let ontology = InlineSource::new("broken", "{ not json");
    let rows = CountingSource {
        inner: InlineSource::new("rows", SAMPLE_TSV),
        fetches: &fetches,
    };

    let err = block_on(load_tree(&ontology, &rows, &LoadOptions::default())).unwrap_err();

    assert!(matches!(err, Error::Load { what: "ontology", .. }));
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[test]
fn measurement_failure_is_reported_as_such() {
    let ontology = InlineSource::new("ontology", ONTOLOGY);
    let rows = FileSource::new("/definitely/not/here.tsv");

    let err = block_on(load_tree(&ontology, &rows, &LoadOptions::default())).unwrap_err();

    match err {
        Error::Load { what, source } => {
            assert_eq!(what, "measurements");
            assert!(matches!(*source, Error::Io(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_numeric_measurement_cells_do_not_abort_loading() {
    let ontology = InlineSource::new("ontology", ONTOLOGY);
    let rows = InlineSource::new(
        "rows",
        "group_value\tgroup_size\tmatched_size\nCaffeic acid\t10\tfive\nMorphine\t4\t2\n",
    );

    let loaded = block_on(load_tree(&ontology, &rows, &LoadOptions::default())).unwrap();

    assert_eq!(loaded.measurements.len(), 2);
    assert_eq!(loaded.totals.matched_count, 2.0);
    let o = &loaded.ontology;
    let phenols = &o[o.find_by_name("Phenols").unwrap()];
    assert_eq!(phenols.stats().matched_count, 0.0);
    assert!(phenols.branch().is_collapsed());
    assert!(o[o.find_by_name("Alkaloids").unwrap()].branch().is_expanded());
}

#[test]
fn file_fetch_is_resolved_without_polling_an_executor() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/measurements/caffeic_acid.tsv");
    let source = FileSource::new(path);

    let text = source.fetch().now_or_never().unwrap().unwrap();
    assert!(text.starts_with("group_size\tgroup_value"));

    let missing = FileSource::new("/definitely/not/here.tsv");
    let err = missing.fetch().now_or_never().unwrap().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn boxed_sources_are_object_safe() {
    let sources: Vec<Box<dyn TextSource>> = vec![
        Box::new(InlineSource::new("a", "x")),
        Box::new(FileSource::new("b.json")),
    ];
    let labels: Vec<String> = sources.iter().map(|s| s.describe()).collect();
    assert_eq!(labels, ["a", "b.json"]);

    let text = sources[0].fetch().now_or_never().unwrap().unwrap();
    assert_eq!(text, "x");
}
