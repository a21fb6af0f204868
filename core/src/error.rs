use std::path::PathBuf;

use thiserror::Error;

use crate::registry::IndexKind;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("index '{0}' is missing from the snapshot")]
    MissingIndex(String),

    #[error("index '{name}' is a {found} index, expected {expected}")]
    WrongIndexKind { name: String, expected: IndexKind, found: IndexKind },

    #[error("{}:{line}: invalid document: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, line: usize, reason: String },

    #[error("duplicate document '{0}'")]
    DuplicateDocument(String),

    /// A file the engine cannot run without (stopwords, synonyms, snapshot).
    #[error("cannot read {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Both a JSON and a binary artifact exist for one index and no manifest
    /// says which build wrote them.
    #[error("index '{0}' has both a json and a binary artifact")]
    AmbiguousIndex(String),

    #[error("empty snapshot directory {}", .0.display())]
    EmptySnapshot(PathBuf),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Resource { path: path.into(), source }
    }
}
