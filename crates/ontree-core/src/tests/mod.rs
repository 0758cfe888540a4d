mod convert;
mod load;

use crate::ontology::Ontology;
use serde_json::json;

/// `root → {Alkaloids → {Morphine, caffeine}, Phenols → {Caffeic acid, Ferulic acid}}`
pub(crate) fn sample_ontology() -> Ontology {
    Ontology::from_value(&json!({
        "name": "root",
        "children": [
            {
                "name": "Phenols",
                "children": [
                    { "name": "Ferulic acid" },
                    { "name": "Caffeic acid" }
                ]
            },
            {
                "name": "Alkaloids",
                "children": [
                    { "name": "caffeine", "NCBI": 562 },
                    { "name": "Morphine", "children": [] }
                ]
            }
        ]
    }))
    .unwrap()
}

pub(crate) const SAMPLE_TSV: &str = "group_size\tgroup_value\tmatched_size\tmetadata_column\toccurrence_fraction
10\tCaffeic acid\t5\tsample_type\t0.4
4\tFerulic acid\t1\tsample_type\t0.25
7\tNot in the tree\t3\tsample_type\t0.1
";
