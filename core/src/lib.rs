//! Product search core: tokenization, index construction, snapshot I/O and
//! query ranking for a corpus of crawled product pages.

pub mod builder;
pub mod corpus;
pub mod document;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod ranking;
pub mod registry;
pub mod synonyms;
pub mod tokenizer;

/// Documents are identified by their canonical URL.
pub type DocId = String;

pub use document::{Document, Field, Review};
pub use error::{EngineError, Result};
pub use index::{InvertedIndex, PositionIndex, ReviewAggregate, ReviewStats};
pub use registry::{IndexEntry, IndexKind, IndexRegistry};
