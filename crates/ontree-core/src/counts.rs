//! Per-taxon match counts from a metadata table and a list of matched files.

use crate::table::{TAB, Table};
use crate::Result;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

pub const METADATA_PATH_COLUMN: &str = "Filepath";
pub const MATCH_FILE_COLUMN: &str = "filename";
pub const DEFAULT_ID_COLUMN: &str = "Taxa_NCBI";
/// Key column of the written counts table, whatever metadata column the ids came from.
pub const COUNTS_KEY_COLUMN: &str = "ncbi";

/// Normalizes dataset file paths so metadata and match tables agree on naming.
pub fn clean_filename(name: &str) -> String {
    name.replace("/peak/", "/ccms_peak/")
        .replace(".mzML", "")
        .replace(".mzXML", "")
        .replace("f.MSV", "MSV")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCounts {
    id_column: String,
    counts: IndexMap<String, u64>,
}

impl MatchCounts {
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn get(&self, id: &str) -> Option<u64> {
        self.counts.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Tab-separated `ncbi\tmatched_size` rows in first-seen order.
    pub fn to_tsv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(TAB)
            .from_writer(Vec::new());
        writer.write_record([COUNTS_KEY_COLUMN, crate::measurement::MATCHED_SIZE])?;
        for (id, count) in &self.counts {
            writer.write_record([id.as_str(), count.to_string().as_str()])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| crate::Error::Io(err.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Counts, per value of `id_column`, how many matched files belong to it.
///
/// A file listed under several ids in the metadata counts once for each of them.
pub fn count_matches(metadata: &Table, matches: &Table, id_column: &str) -> Result<MatchCounts> {
    let path_col = metadata.require_column(METADATA_PATH_COLUMN)?;
    let id_col = metadata.require_column(id_column)?;
    let file_col = matches.require_column(MATCH_FILE_COLUMN)?;

    let mut ids_by_file: FxHashMap<String, Vec<&str>> = FxHashMap::default();
    for row in metadata.rows() {
        ids_by_file
            .entry(clean_filename(metadata.field(row, path_col)))
            .or_default()
            .push(metadata.field(row, id_col));
    }

    let mut counts: IndexMap<String, u64> = IndexMap::new();
    let mut unknown_files = 0usize;
    for row in matches.rows() {
        let file = clean_filename(matches.field(row, file_col));
        let Some(ids) = ids_by_file.get(&file) else {
            unknown_files += 1;
            continue;
        };
        for id in ids {
            *counts.entry((*id).to_string()).or_insert(0) += 1;
        }
    }

    tracing::debug!(
        ids = counts.len(),
        matches = matches.len(),
        unknown_files,
        "counted matches per id"
    );
    Ok(MatchCounts {
        id_column: id_column.to_string(),
        counts,
    })
}
