use crate::ontology::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table error: {0}")]
    Table(#[from] csv::Error),

    #[error("malformed ontology node at {path}: {message}")]
    OntologyShape { path: String, message: String },

    #[error("missing required column `{column}`")]
    MissingColumn { column: String },

    #[error("ontology conversion error: {message}")]
    Conversion { message: String },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("cannot move node: {message}")]
    InvalidReparent { message: String },

    #[error("failed to load {what}: {source}")]
    Load {
        what: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn load(what: &'static str, source: Error) -> Self {
        Self::Load {
            what,
            source: Box::new(source),
        }
    }
}
