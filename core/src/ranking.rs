//! Query ranking over a loaded snapshot.
//!
//! Two scorers are available. The linear scorer mixes three signals read from
//! the field's position index and the review aggregate:
//!
//! ```text
//! score = 0.4 * position + 0.3 * review + 0.3 * frequency
//! ```
//!
//! The BM25 scorer uses the posting count of a term across the whole field
//! index as its term frequency, not the per-document count. Searching title
//! and description together fuses the two field scores as
//! `2.0 * title + 0.5 * description`.

use crate::document::{Document, Field};
use crate::error::{EngineError, Result};
use crate::index::{InvertedIndex, PositionIndex, ReviewAggregate};
use crate::query::{all_tokens_present, Query};
use crate::registry::{self, IndexRegistry};
use crate::synonyms::SynonymMap;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const POSITION_WEIGHT: f64 = 0.4;
pub const REVIEW_WEIGHT: f64 = 0.3;
pub const FREQUENCY_WEIGHT: f64 = 0.3;
pub const TITLE_FUSION_WEIGHT: f64 = 2.0;
pub const DESCRIPTION_FUSION_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankerConfig {
    pub bm25: Bm25Params,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Description,
    TitleDescription,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scorer {
    #[default]
    Linear,
    Bm25,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    pub query: String,
    pub field: SearchField,
    pub scorer: Scorer,
    /// Keep only documents listed under this region.
    pub region: Option<String>,
    /// Keep only documents containing every (synonym-expanded) term of this phrase.
    pub must_have: Option<String>,
    /// Maximum number of results emitted; metadata still counts all of them.
    pub limit: Option<usize>,
}

impl RankRequest {
    pub fn new(query: impl Into<String>, field: SearchField) -> Self {
        Self { query: query.into(), field, scorer: Scorer::Linear, region: None, must_have: None, limit: None }
    }

    pub fn scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn must_have(mut self, terms: impl Into<String>) -> Self {
        self.must_have = Some(terms.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub url: DocId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankMetadata {
    #[serde(rename = "nb_elements_apres_filtrage")]
    pub filtered: usize,
    #[serde(rename = "nb_elements_total")]
    pub total: usize,
}

/// Ranked documents, best first, in the shape written to the response file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub metadata: RankMetadata,
    #[serde(rename = "result")]
    pub results: Vec<ScoredDoc>,
}

/// The indices a ranker reads, pulled out of a loaded registry.
#[derive(Debug, Clone)]
pub struct SearchIndices {
    pub title: InvertedIndex,
    pub description: InvertedIndex,
    pub title_position: PositionIndex,
    pub description_position: PositionIndex,
    pub reviews: ReviewAggregate,
    pub origin: InvertedIndex,
}

impl SearchIndices {
    /// Fails with `MissingIndex` if any required index is absent.
    pub fn from_registry(registry: &IndexRegistry) -> Result<Self> {
        Ok(Self {
            title: registry.inverted(registry::TITLE)?.clone(),
            description: registry.inverted(registry::DESCRIPTION)?.clone(),
            title_position: registry.position(registry::TITLE_POSITION)?.clone(),
            description_position: registry.position(registry::DESCRIPTION_POSITION)?.clone(),
            reviews: registry.reviews(registry::REVIEWS)?.clone(),
            origin: registry.inverted(registry::ORIGIN)?.clone(),
        })
    }

    pub fn inverted(&self, field: Field) -> &InvertedIndex {
        match field {
            Field::Title => &self.title,
            Field::Description => &self.description,
        }
    }

    pub fn positions(&self, field: Field) -> &PositionIndex {
        match field {
            Field::Title => &self.title_position,
            Field::Description => &self.description_position,
        }
    }
}

/// Corpus order, per-field token counts and their averages.
#[derive(Debug, Clone, Default)]
pub struct DocTable {
    ids: Vec<DocId>,
    title_len: Vec<usize>,
    description_len: Vec<usize>,
    avg_title_len: f64,
    avg_description_len: f64,
}

impl DocTable {
    pub fn new(corpus: &[Document], tokenizer: &Tokenizer) -> Self {
        let mut table = DocTable::default();
        for doc in corpus {
            table.ids.push(doc.url.clone());
            table.title_len.push(tokenizer.tokenize(&doc.title).len());
            table.description_len.push(tokenizer.tokenize(&doc.description).len());
        }
        table.avg_title_len = mean(&table.title_len);
        table.avg_description_len = mean(&table.description_len);
        table
    }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn id(&self, i: usize) -> &str { &self.ids[i] }

    fn lengths(&self, field: Field) -> &[usize] {
        match field {
            Field::Title => &self.title_len,
            Field::Description => &self.description_len,
        }
    }

    pub fn doc_len(&self, field: Field, i: usize) -> usize {
        self.lengths(field)[i]
    }

    pub fn avg_len(&self, field: Field) -> f64 {
        match field {
            Field::Title => self.avg_title_len,
            Field::Description => self.avg_description_len,
        }
    }
}

fn mean(lengths: &[usize]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
}

/// Sum of `1 / (offset + 1)` over the query tokens found in the document.
pub fn position_score(tokens: &[String], doc_id: &str, index: &PositionIndex) -> f64 {
    tokens
        .iter()
        .filter_map(|t| index.first_offset(t, doc_id))
        .map(|offset| 1.0 / (offset as f64 + 1.0))
        .sum()
}

/// Number of position entries recorded for the document under each query token.
pub fn freq_score(tokens: &[String], doc_id: &str, index: &PositionIndex) -> f64 {
    tokens
        .iter()
        .filter_map(|t| index.offsets(t, doc_id))
        .map(|offsets| offsets.len() as f64)
        .sum()
}

/// Mean rating; 0.0 for documents without reviews.
pub fn review_score(doc_id: &str, reviews: &ReviewAggregate) -> f64 {
    reviews.mean_rating_or_zero(doc_id)
}

pub fn linear_score(position: f64, review: f64, frequency: f64) -> f64 {
    POSITION_WEIGHT * position + REVIEW_WEIGHT * review + FREQUENCY_WEIGHT * frequency
}

pub fn fuse(title: f64, description: f64) -> f64 {
    TITLE_FUSION_WEIGHT * title + DESCRIPTION_FUSION_WEIGHT * description
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`; finite and non-negative for `df` in `[0, N]`.
pub fn idf(n: usize, df: usize) -> f64 {
    let (n, df) = (n as f64, df as f64);
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

pub fn bm25_term(idf: f64, f: f64, doc_len: usize, avg_doc_len: f64, params: &Bm25Params) -> f64 {
    let length_ratio = if avg_doc_len > 0.0 { doc_len as f64 / avg_doc_len } else { 1.0 };
    let denominator = f + params.k1 * (1.0 - params.b + params.b * length_ratio);
    if denominator == 0.0 {
        return 0.0;
    }
    idf * f * (params.k1 + 1.0) / denominator
}

/// Per-query statistics of one term in a field index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermStats {
    pub idf: f64,
    /// Posting count of the term across the whole index.
    pub f: f64,
}

/// Stats for every query token known to the index, in query order
/// (repeated tokens repeat). Computed once per query and field.
pub fn term_stats(tokens: &[String], num_docs: usize, index: &PositionIndex) -> Vec<TermStats> {
    tokens
        .iter()
        .filter(|t| index.contains_key(t))
        .map(|t| {
            let df = index.doc_frequency(t).min(num_docs);
            TermStats { idf: idf(num_docs, df), f: index.posting_count(t) as f64 }
        })
        .collect()
}

/// BM25 over every query term known to the index, whether or not this
/// document contains it.
pub fn bm25_score(terms: &[TermStats], doc_len: usize, avg_doc_len: f64, params: &Bm25Params) -> f64 {
    terms.iter().map(|t| bm25_term(t.idf, t.f, doc_len, avg_doc_len, params)).sum()
}

/// Expanded query tokens plus the BM25 term stats of each field.
struct PreparedQuery {
    tokens: Vec<String>,
    title_terms: Vec<TermStats>,
    description_terms: Vec<TermStats>,
}

impl PreparedQuery {
    fn terms(&self, field: Field) -> &[TermStats] {
        match field {
            Field::Title => &self.title_terms,
            Field::Description => &self.description_terms,
        }
    }
}

pub struct Ranker {
    indices: SearchIndices,
    docs: DocTable,
    tokenizer: Tokenizer,
    synonyms: SynonymMap,
    config: RankerConfig,
}

impl Ranker {
    pub fn new(
        indices: SearchIndices,
        corpus: &[Document],
        tokenizer: Tokenizer,
        synonyms: SynonymMap,
        config: RankerConfig,
    ) -> Self {
        let docs = DocTable::new(corpus, &tokenizer);
        Self { indices, docs, tokenizer, synonyms, config }
    }

    pub fn indices(&self) -> &SearchIndices { &self.indices }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    /// Filter, score and sort the corpus for one request. An unknown region
    /// aborts the whole request.
    pub fn rank(&self, request: &RankRequest) -> Result<RankedResult> {
        let tokens = Query::new(&request.query).expanded(&self.tokenizer, &self.synonyms);
        let mut candidates: Vec<usize> = (0..self.docs.len()).collect();

        if let Some(region) = request.region.as_deref().filter(|r| !r.is_empty()) {
            let members = self
                .indices
                .origin
                .get(region)
                .ok_or_else(|| EngineError::UnknownRegion(region.to_string()))?;
            candidates.retain(|&i| members.contains(self.docs.id(i)));
        }

        if let Some(must_have) = request.must_have.as_deref().filter(|m| !m.is_empty()) {
            let terms = Query::new(must_have).expanded(&self.tokenizer, &self.synonyms);
            candidates.retain(|&i| self.has_all(request.field, &terms, self.docs.id(i)));
        }

        let query = self.prepare(tokens, request.scorer);
        let mut results: Vec<ScoredDoc> = candidates
            .par_iter()
            .map(|&i| ScoredDoc {
                url: self.docs.id(i).to_string(),
                score: self.score(request.field, request.scorer, &query, i),
            })
            .collect();
        // Stable: equal scores keep corpus order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        let metadata = RankMetadata { filtered: results.len(), total: self.docs.len() };
        if let Some(limit) = request.limit {
            results.truncate(limit);
        }
        tracing::debug!(query = %request.query, tokens = query.tokens.len(), filtered = metadata.filtered, "ranked");
        Ok(RankedResult { metadata, results })
    }

    fn prepare(&self, tokens: Vec<String>, scorer: Scorer) -> PreparedQuery {
        let (title_terms, description_terms) = match scorer {
            Scorer::Linear => (Vec::new(), Vec::new()),
            Scorer::Bm25 => (
                term_stats(&tokens, self.docs.len(), &self.indices.title_position),
                term_stats(&tokens, self.docs.len(), &self.indices.description_position),
            ),
        };
        PreparedQuery { tokens, title_terms, description_terms }
    }

    fn has_all(&self, field: SearchField, terms: &[String], doc_id: &str) -> bool {
        match field {
            SearchField::Title => all_tokens_present(doc_id, terms, &self.indices.title),
            SearchField::Description => all_tokens_present(doc_id, terms, &self.indices.description),
            SearchField::TitleDescription => {
                all_tokens_present(doc_id, terms, &self.indices.title)
                    || all_tokens_present(doc_id, terms, &self.indices.description)
            }
        }
    }

    fn score(&self, field: SearchField, scorer: Scorer, query: &PreparedQuery, i: usize) -> f64 {
        match field {
            SearchField::Title => self.field_score(Field::Title, scorer, query, i),
            SearchField::Description => self.field_score(Field::Description, scorer, query, i),
            SearchField::TitleDescription => fuse(
                self.field_score(Field::Title, scorer, query, i),
                self.field_score(Field::Description, scorer, query, i),
            ),
        }
    }

    fn field_score(&self, field: Field, scorer: Scorer, query: &PreparedQuery, i: usize) -> f64 {
        let doc_id = self.docs.id(i);
        match scorer {
            Scorer::Linear => {
                let positions = self.indices.positions(field);
                linear_score(
                    position_score(&query.tokens, doc_id, positions),
                    review_score(doc_id, &self.indices.reviews),
                    freq_score(&query.tokens, doc_id, positions),
                )
            }
            Scorer::Bm25 => bm25_score(
                query.terms(field),
                self.docs.doc_len(field, i),
                self.docs.avg_len(field),
                &self.config.bm25,
            ),
        }
    }

    pub fn requete_title(&self, query: &str) -> Result<RankedResult> {
        self.rank(&RankRequest::new(query, SearchField::Title))
    }

    pub fn requete_description(&self, query: &str) -> Result<RankedResult> {
        self.rank(&RankRequest::new(query, SearchField::Description))
    }

    pub fn requete_title_description(&self, query: &str) -> Result<RankedResult> {
        self.rank(&RankRequest::new(query, SearchField::TitleDescription))
    }

    pub fn requete_title_region(
        &self,
        query: &str,
        region: Option<&str>,
        must_have: Option<&str>,
    ) -> Result<RankedResult> {
        self.rank(&filtered(RankRequest::new(query, SearchField::Title), region, must_have))
    }

    pub fn requete_description_region(
        &self,
        query: &str,
        region: Option<&str>,
        must_have: Option<&str>,
    ) -> Result<RankedResult> {
        self.rank(&filtered(RankRequest::new(query, SearchField::Description), region, must_have))
    }
}

fn filtered(mut request: RankRequest, region: Option<&str>, must_have: Option<&str>) -> RankRequest {
    request.region = region.map(str::to_string);
    request.must_have = must_have.map(str::to_string);
    request
}
