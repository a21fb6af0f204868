use crate::document::{Document, Field};
use crate::index::{InvertedIndex, PositionIndex, ReviewAggregate, ReviewStats};
use crate::registry::{self, feature_index_name, IndexRegistry};
use crate::tokenizer::Tokenizer;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// token -> documents whose `field` contains the token.
pub fn build_field_index(corpus: &[Document], field: Field, tokenizer: &Tokenizer) -> InvertedIndex {
    corpus
        .par_iter()
        .fold(InvertedIndex::new, |mut index, doc| {
            for token in tokenizer.tokenize(field.text(doc)) {
                index.insert(token, &doc.url);
            }
            index
        })
        .reduce(InvertedIndex::new, |mut a, b| {
            a.merge(b);
            a
        })
}

/// feature key -> (token -> documents). Keys are the raw feature keys.
pub fn build_feature_indices(corpus: &[Document], tokenizer: &Tokenizer) -> BTreeMap<String, InvertedIndex> {
    let mut features: BTreeMap<String, InvertedIndex> = BTreeMap::new();
    for doc in corpus {
        for (key, text) in &doc.product_features {
            let index = features.entry(key.clone()).or_default();
            for token in tokenizer.tokenize(text) {
                index.insert(token, &doc.url);
            }
        }
    }
    features
}

/// token -> (document, offset of the token's first occurrence in the field).
///
/// The offset comes from a substring search over the normalized field text,
/// not from token boundaries, so "leather" inside "pleather leather" is
/// reported at offset 1.
pub fn build_position_index(corpus: &[Document], field: Field, tokenizer: &Tokenizer) -> PositionIndex {
    let mut index = PositionIndex::new();
    for doc in corpus {
        let raw = field.text(doc);
        let normalized = tokenizer.normalize(raw);
        let stripped = tokenizer.strip_punctuation(raw);
        let mut seen = HashSet::new();
        for token in tokenizer.tokenize(raw) {
            if !seen.insert(token.clone()) { continue; }
            let offset = first_offset(&normalized, &stripped, &token);
            index.insert(token, &doc.url, offset);
        }
    }
    index
}

fn first_offset(normalized: &str, stripped: &str, token: &str) -> usize {
    // Tokens glued across punctuation ("don't" -> "dont") only exist in the stripped text.
    let (haystack, byte) = match normalized.find(token) {
        Some(b) => (normalized, b),
        None => (stripped, stripped.find(token).unwrap_or(0)),
    };
    haystack[..byte].chars().count()
}

/// Review count, mean rating and most recent rating per reviewed document.
pub fn build_review_aggregate(corpus: &[Document]) -> ReviewAggregate {
    let mut aggregate = ReviewAggregate::new();
    for doc in corpus {
        let mut reviews: Vec<_> = doc.product_reviews.iter().collect();
        if reviews.is_empty() { continue; }
        // f64 so extreme ratings cannot overflow the sum
        let total: f64 = reviews.iter().map(|r| r.rating as f64).sum();
        reviews.sort_by(|a, b| a.date.cmp(&b.date));
        let review_count = reviews.len();
        let last_rating = reviews[review_count - 1].rating;
        aggregate.insert(
            doc.url.clone(),
            ReviewStats { review_count, mean_rating: total / review_count as f64, last_rating },
        );
    }
    aggregate
}

/// region -> documents. Documents without an origin are left out.
pub fn build_region_index(corpus: &[Document]) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for doc in corpus {
        if let Some(origin) = &doc.origin {
            index.insert(origin.clone(), &doc.url);
        }
    }
    index
}

/// Build every index of a snapshot. The builders share nothing but the
/// read-only corpus and run in parallel.
pub fn build_all(corpus: &[Document], tokenizer: &Tokenizer) -> IndexRegistry {
    let ((title, description), ((title_pos, description_pos), (reviews, (origin, features)))) = rayon::join(
        || {
            rayon::join(
                || build_field_index(corpus, Field::Title, tokenizer),
                || build_field_index(corpus, Field::Description, tokenizer),
            )
        },
        || {
            rayon::join(
                || {
                    rayon::join(
                        || build_position_index(corpus, Field::Title, tokenizer),
                        || build_position_index(corpus, Field::Description, tokenizer),
                    )
                },
                || {
                    rayon::join(
                        || build_review_aggregate(corpus),
                        || rayon::join(|| build_region_index(corpus), || build_feature_indices(corpus, tokenizer)),
                    )
                },
            )
        },
    );

    let mut registry = IndexRegistry::new();
    registry.insert(registry::TITLE, title);
    registry.insert(registry::DESCRIPTION, description);
    registry.insert(registry::TITLE_POSITION, title_pos);
    registry.insert(registry::DESCRIPTION_POSITION, description_pos);
    registry.insert(registry::REVIEWS, reviews);
    registry.insert(registry::ORIGIN, origin);

    let mut feature_indices: BTreeMap<String, InvertedIndex> = BTreeMap::new();
    for (key, index) in features {
        // Keys differing only by case or punctuation share one registry name.
        feature_indices.entry(feature_index_name(&key)).or_default().merge(index);
    }
    for (name, index) in feature_indices {
        tracing::debug!(%name, tokens = index.len(), "built feature index");
        registry.insert(name, index);
    }

    tracing::info!(docs = corpus.len(), indices = registry.len(), "built indices");
    registry
}
