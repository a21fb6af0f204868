use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// token -> ids of the documents whose field contains the token.
/// Also used for the region index (region name -> ids).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    postings: BTreeMap<String, BTreeSet<DocId>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, key: impl Into<String>, doc_id: &str) {
        self.postings.entry(key.into()).or_default().insert(doc_id.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&BTreeSet<DocId>> {
        self.postings.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.postings.contains_key(key)
    }

    /// Membership test; a key missing from the index has an empty posting set.
    pub fn contains(&self, key: &str, doc_id: &str) -> bool {
        self.postings.get(key).is_some_and(|docs| docs.contains(doc_id))
    }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<DocId>)> {
        self.postings.iter()
    }

    /// Fold another index into this one.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (key, docs) in other.postings {
            self.postings.entry(key).or_default().extend(docs);
        }
    }
}

/// token -> document -> character offsets of the token in the field.
/// The builder records only the first occurrence, so each offset set holds
/// one element; the shape allows more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PositionArtifact", into = "PositionArtifact")]
pub struct PositionIndex {
    postings: BTreeMap<String, BTreeMap<DocId, BTreeSet<usize>>>,
}

/// On-disk shape: token -> [[doc id, offset], ...].
type PositionArtifact = BTreeMap<String, Vec<(DocId, usize)>>;

impl From<PositionArtifact> for PositionIndex {
    fn from(raw: PositionArtifact) -> Self {
        let mut index = PositionIndex::new();
        for (token, pairs) in raw {
            for (doc_id, offset) in pairs {
                index.insert(token.clone(), &doc_id, offset);
            }
        }
        index
    }
}

impl From<PositionIndex> for PositionArtifact {
    fn from(index: PositionIndex) -> Self {
        index
            .postings
            .into_iter()
            .map(|(token, docs)| {
                let pairs = docs
                    .into_iter()
                    .flat_map(|(doc_id, offsets)| offsets.into_iter().map(move |o| (doc_id.clone(), o)))
                    .collect();
                (token, pairs)
            })
            .collect()
    }
}

impl PositionIndex {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, token: impl Into<String>, doc_id: &str, offset: usize) {
        self.postings
            .entry(token.into())
            .or_default()
            .entry(doc_id.to_string())
            .or_default()
            .insert(offset);
    }

    /// Offsets of `token` in `doc_id`, smallest first.
    pub fn offsets(&self, token: &str, doc_id: &str) -> Option<&BTreeSet<usize>> {
        self.postings.get(token)?.get(doc_id)
    }

    /// Earliest recorded offset of `token` in `doc_id`.
    pub fn first_offset(&self, token: &str, doc_id: &str) -> Option<usize> {
        self.offsets(token, doc_id)?.iter().next().copied()
    }

    /// Number of (document, offset) entries posted under `token`, across all documents.
    pub fn posting_count(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, |docs| docs.values().map(BTreeSet::len).sum())
    }

    /// Number of distinct documents posted under `token`.
    pub fn doc_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, BTreeMap::len)
    }

    pub fn contains_key(&self, token: &str) -> bool {
        self.postings.contains_key(token)
    }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn tokens(&self) -> impl Iterator<Item = &String> {
        self.postings.keys()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub review_count: usize,
    pub mean_rating: f64,
    /// Rating of the chronologically last review.
    pub last_rating: i64,
}

/// document id -> review statistics. Documents without reviews have no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewAggregate {
    stats: BTreeMap<DocId, ReviewStats>,
}

impl ReviewAggregate {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, doc_id: impl Into<String>, stats: ReviewStats) {
        self.stats.insert(doc_id.into(), stats);
    }

    pub fn get(&self, doc_id: &str) -> Option<&ReviewStats> {
        self.stats.get(doc_id)
    }

    /// Mean rating, or 0.0 when the document has no review data.
    pub fn mean_rating_or_zero(&self, doc_id: &str) -> f64 {
        self.stats.get(doc_id).map_or(0.0, |s| s.mean_rating)
    }

    pub fn len(&self) -> usize { self.stats.len() }

    pub fn is_empty(&self) -> bool { self.stats.is_empty() }
}
