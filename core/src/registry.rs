use crate::error::{EngineError, Result};
use crate::index::{InvertedIndex, PositionIndex, ReviewAggregate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const TITLE_POSITION: &str = "title_position";
pub const DESCRIPTION_POSITION: &str = "description_position";
pub const REVIEWS: &str = "reviews";
pub const ORIGIN: &str = "origin";

/// Registry name of the index built for a product feature key.
pub fn feature_index_name(key: &str) -> String {
    let slug: String = key
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("feature_{slug}")
}

/// Kind of the indices the builder always writes under a fixed name, and of
/// feature indices. `None` for names the builder never produces.
pub fn kind_for_name(name: &str) -> Option<IndexKind> {
    match name {
        TITLE | DESCRIPTION | ORIGIN => Some(IndexKind::Inverted),
        TITLE_POSITION | DESCRIPTION_POSITION => Some(IndexKind::Position),
        REVIEWS => Some(IndexKind::Reviews),
        _ if name.starts_with("feature_") => Some(IndexKind::Inverted),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Inverted,
    Position,
    Reviews,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexKind::Inverted => "inverted",
            IndexKind::Position => "position",
            IndexKind::Reviews => "reviews",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexEntry {
    Inverted(InvertedIndex),
    Position(PositionIndex),
    Reviews(ReviewAggregate),
}

impl IndexEntry {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexEntry::Inverted(_) => IndexKind::Inverted,
            IndexEntry::Position(_) => IndexKind::Position,
            IndexEntry::Reviews(_) => IndexKind::Reviews,
        }
    }

    /// Number of top-level keys (tokens, regions or documents).
    pub fn len(&self) -> usize {
        match self {
            IndexEntry::Inverted(i) => i.len(),
            IndexEntry::Position(i) => i.len(),
            IndexEntry::Reviews(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<InvertedIndex> for IndexEntry {
    fn from(i: InvertedIndex) -> Self { IndexEntry::Inverted(i) }
}

impl From<PositionIndex> for IndexEntry {
    fn from(i: PositionIndex) -> Self { IndexEntry::Position(i) }
}

impl From<ReviewAggregate> for IndexEntry {
    fn from(i: ReviewAggregate) -> Self { IndexEntry::Reviews(i) }
}

/// Every index of a snapshot, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexRegistry {
    entries: BTreeMap<String, IndexEntry>,
}

impl IndexRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, entry: impl Into<IndexEntry>) -> Option<IndexEntry> {
        self.entries.insert(name.into(), entry.into())
    }

    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    fn require(&self, name: &str) -> Result<&IndexEntry> {
        self.entries.get(name).ok_or_else(|| EngineError::MissingIndex(name.to_string()))
    }

    fn wrong_kind(name: &str, expected: IndexKind, entry: &IndexEntry) -> EngineError {
        EngineError::WrongIndexKind { name: name.to_string(), expected, found: entry.kind() }
    }

    pub fn inverted(&self, name: &str) -> Result<&InvertedIndex> {
        match self.require(name)? {
            IndexEntry::Inverted(i) => Ok(i),
            other => Err(Self::wrong_kind(name, IndexKind::Inverted, other)),
        }
    }

    pub fn position(&self, name: &str) -> Result<&PositionIndex> {
        match self.require(name)? {
            IndexEntry::Position(i) => Ok(i),
            other => Err(Self::wrong_kind(name, IndexKind::Position, other)),
        }
    }

    pub fn reviews(&self, name: &str) -> Result<&ReviewAggregate> {
        match self.require(name)? {
            IndexEntry::Reviews(i) => Ok(i),
            other => Err(Self::wrong_kind(name, IndexKind::Reviews, other)),
        }
    }

    /// Feature indices, keyed by registry name.
    pub fn features(&self) -> impl Iterator<Item = (&str, &InvertedIndex)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            IndexEntry::Inverted(i) if name.starts_with("feature_") => Some((name.as_str(), i)),
            _ => None,
        })
    }
}

impl fmt::Display for IndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, entry) in &self.entries {
            writeln!(f, "{name:<32} {:<9} {} keys", entry.kind(), entry.len())?;
        }
        write!(f, "{} indices", self.entries.len())
    }
}
