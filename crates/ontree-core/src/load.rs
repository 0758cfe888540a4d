//! Asynchronous, executor-agnostic loading of the ontology and its measurements.
//!
//! Sources are fetched strictly in order: the measurement table is only requested once the
//! ontology has been fetched and parsed. A failure at either step aborts initialization and no
//! partially annotated tree is returned.

use crate::aggregate::{MatchKey, Stats, annotate};
use crate::measurement::MeasurementTable;
use crate::ontology::Ontology;
use crate::table::TAB;
use crate::{Error, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

/// Something that can produce the text of a data file, e.g. a local file or an HTTP fetch
/// supplied by the host.
pub trait TextSource: Send + Sync {
    /// Short human-readable description used in diagnostics.
    fn describe(&self) -> String;

    fn fetch(&self) -> BoxFuture<'_, std::io::Result<String>>;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    /// Reads the file synchronously when called; the returned future is already resolved.
    fn fetch(&self) -> BoxFuture<'_, std::io::Result<String>> {
        futures::future::ready(std::fs::read_to_string(&self.path)).boxed()
    }
}

/// Text already held in memory.
#[derive(Debug, Clone)]
pub struct InlineSource {
    label: String,
    text: String,
}

impl InlineSource {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl TextSource for InlineSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn fetch(&self) -> BoxFuture<'_, std::io::Result<String>> {
        futures::future::ready(Ok(self.text.clone())).boxed()
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub match_key: MatchKey,
    /// Field delimiter of the measurement table.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            match_key: MatchKey::default(),
            delimiter: TAB,
        }
    }
}

/// An ontology annotated with aggregated statistics and its initial visibility.
#[derive(Debug, Clone)]
pub struct LoadedTree {
    pub ontology: Ontology,
    pub measurements: MeasurementTable,
    pub totals: Stats,
}

pub async fn load_ontology(source: &dyn TextSource) -> Result<Ontology> {
    let result = match source.fetch().await {
        Ok(text) => Ontology::from_json_str(&text),
        Err(err) => Err(Error::Io(err)),
    };
    result.map_err(|err| {
        tracing::warn!(source = %source.describe(), error = %err, "ontology load failed");
        Error::load("ontology", err)
    })
}

pub async fn load_measurements(
    source: &dyn TextSource,
    options: &LoadOptions,
) -> Result<MeasurementTable> {
    let result = match source.fetch().await {
        Ok(text) => {
            MeasurementTable::parse(&text, options.delimiter, &options.match_key.data_field)
        }
        Err(err) => Err(Error::Io(err)),
    };
    result.map_err(|err| {
        tracing::warn!(source = %source.describe(), error = %err, "measurement load failed");
        Error::load("measurements", err)
    })
}

/// Loads the ontology, then the measurements, then aggregates and applies the initial
/// expand/collapse policy.
pub async fn load_tree(
    ontology: &dyn TextSource,
    measurements: &dyn TextSource,
    options: &LoadOptions,
) -> Result<LoadedTree> {
    let mut tree = load_ontology(ontology).await?;
    let table = load_measurements(measurements, options).await?;
    let totals = annotate(&mut tree, &table, &options.match_key);
    tracing::debug!(
        ontology = %ontology.describe(),
        measurements = %measurements.describe(),
        "initialized annotated tree"
    );
    Ok(LoadedTree {
        ontology: tree,
        measurements: table,
        totals,
    })
}
