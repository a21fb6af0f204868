use shopfind_core::builder::build_all;
use shopfind_core::ranking::{
    bm25_term, idf, Bm25Params, RankRequest, RankedResult, Ranker, RankerConfig, Scorer, SearchField, SearchIndices,
};
use shopfind_core::registry::{self, IndexRegistry};
use shopfind_core::synonyms::SynonymMap;
use shopfind_core::tokenizer::Tokenizer;
use shopfind_core::{Document, EngineError};
use std::collections::HashMap;

fn ranker_with(corpus: &[Document], synonyms: SynonymMap) -> Ranker {
    let tokenizer = Tokenizer::english();
    let registry = build_all(corpus, &tokenizer);
    let indices = SearchIndices::from_registry(&registry).unwrap();
    Ranker::new(indices, corpus, tokenizer, synonyms, RankerConfig::default())
}

fn ranker(corpus: &[Document]) -> Ranker {
    ranker_with(corpus, SynonymMap::empty())
}

fn urls(result: &RankedResult) -> Vec<&str> {
    result.results.iter().map(|r| r.url.as_str()).collect()
}

fn sneakers() -> Vec<Document> {
    vec![
        Document::new("u1", "Leather Sneakers", "").with_origin("italy"),
        Document::new("u2", "Cotton Sneakers", "").with_origin("portugal"),
        Document::new("u3", "Leather Boots", "").with_origin("italy"),
        Document::new("u4", "Suede Sneakers", "").with_origin("italy"),
    ]
}

#[test]
fn partial_title_overlap_ordering() {
    let all = sneakers();
    let corpus = &all[..3];
    let result = ranker(corpus).requete_title("Leather Sneakers").unwrap();
    assert_eq!(urls(&result), vec!["u1", "u3", "u2"]);
    // 0.4 * (1 + 1/9) + 0.3 * 2
    assert!((result.results[0].score - (0.4 * (1.0 + 1.0 / 9.0) + 0.6)).abs() < 1e-9);
    assert!((result.results[1].score - 0.7).abs() < 1e-9);
    assert!((result.results[2].score - 0.35).abs() < 1e-9);
    assert_eq!(result.metadata.filtered, 3);
    assert_eq!(result.metadata.total, 3);
}

#[test]
fn ranking_is_deterministic() {
    let corpus = sneakers();
    let r = ranker(&corpus);
    let request = RankRequest::new("leather sneakers boots", SearchField::TitleDescription);
    assert_eq!(r.rank(&request).unwrap(), r.rank(&request).unwrap());
}

#[test]
fn equal_scores_keep_corpus_order() {
    let corpus = sneakers();
    let result = ranker(&corpus).requete_title("sandals").unwrap();
    assert_eq!(urls(&result), vec!["u1", "u2", "u3", "u4"]);
    assert!(result.results.iter().all(|r| r.score == 0.0));
}

#[test]
fn region_and_must_have_filters() {
    let corpus = sneakers();
    let result = ranker(&corpus).requete_title_region("sneakers", Some("italy"), Some("Leather")).unwrap();
    assert_eq!(urls(&result), vec!["u1", "u3"]);
    assert_eq!(result.metadata.filtered, 2);
    assert_eq!(result.metadata.total, 4);
}

#[test]
fn region_filter_alone() {
    let corpus = sneakers();
    let result = ranker(&corpus).requete_description_region("sneakers", Some("italy"), None).unwrap();
    let mut got = urls(&result);
    got.sort();
    assert_eq!(got, vec!["u1", "u3", "u4"]);
}

#[test]
fn unknown_region_is_an_error() {
    let corpus = sneakers();
    let err = ranker(&corpus).requete_title_region("sneakers", Some("atlantis"), None).unwrap_err();
    assert!(matches!(err, EngineError::UnknownRegion(r) if r == "atlantis"));
}

#[test]
fn must_have_terms_are_synonym_expanded() {
    let mut corpus = sneakers();
    corpus.push(Document::new("u5", "Leather Hide Sneakers", "").with_origin("italy"));
    let synonyms = SynonymMap::from_map(HashMap::from([("leather".to_string(), vec!["hide".to_string()])]));
    let result = ranker_with(&corpus, synonyms).requete_title_region("sneakers", None, Some("leather")).unwrap();
    assert_eq!(urls(&result), vec!["u5"]);
}

#[test]
fn query_synonyms_add_score() {
    let corpus = vec![Document::new("u1", "Trainers", ""), Document::new("u2", "Slippers", "")];
    let synonyms = SynonymMap::from_map(HashMap::from([("sneakers".to_string(), vec!["trainers".to_string()])]));
    let result = ranker_with(&corpus, synonyms).requete_title("sneakers").unwrap();
    assert_eq!(urls(&result), vec!["u1", "u2"]);
    assert!(result.results[0].score > 0.0);
}

#[test]
fn review_signal_breaks_text_ties() {
    let corpus = vec![
        Document::new("u1", "Leather Boots", ""),
        Document::new("u2", "Leather Boots", "").with_review(5, "2024-01-01").with_review(3, "2023-01-01"),
    ];
    let result = ranker(&corpus).requete_title("boots").unwrap();
    assert_eq!(urls(&result), vec!["u2", "u1"]);
    assert!((result.results[0].score - result.results[1].score - 0.3 * 4.0).abs() < 1e-9);
}

#[test]
fn title_matches_outweigh_description_matches() {
    let corpus = vec![
        Document::new("b", "Sturdy Boots", "Leather lining"),
        Document::new("a", "Leather Boots", "Sturdy shoes"),
    ];
    let result = ranker(&corpus).requete_title_description("leather").unwrap();
    assert_eq!(urls(&result), vec!["a", "b"]);
    assert!((result.results[0].score - 1.4).abs() < 1e-9);
    assert!((result.results[1].score - 0.35).abs() < 1e-9);
}

#[test]
fn description_ranking_uses_description_positions() {
    let corpus = vec![
        Document::new("u1", "Boots", "Warm boots with a leather trim"),
        Document::new("u2", "Boots", "Leather boots"),
    ];
    let result = ranker(&corpus).requete_description("leather").unwrap();
    assert_eq!(urls(&result), vec!["u2", "u1"]);
}

#[test]
fn bm25_prefers_shorter_fields() {
    let corpus = vec![
        Document::new("long", "Leather Boots Brown Winter Waterproof", ""),
        Document::new("short", "Leather Boots", ""),
    ];
    let r = ranker(&corpus);
    let result = r.rank(&RankRequest::new("leather", SearchField::Title).scorer(Scorer::Bm25)).unwrap();
    assert_eq!(urls(&result), vec!["short", "long"]);
    assert!(result.results.iter().all(|d| d.score.is_finite() && d.score > 0.0));
}

#[test]
fn bm25_scores_every_document_with_corpus_wide_term_stats() {
    let corpus = sneakers();
    let r = ranker(&corpus);
    let request = RankRequest::new("leather sneakers", SearchField::Title).scorer(Scorer::Bm25).region("italy");
    let result = r.rank(&request).unwrap();
    // every title has two tokens; stats come from all four documents, not the region
    let params = Bm25Params::default();
    let expected = bm25_term(idf(4, 2), 2.0, 2, 2.0, &params) + bm25_term(idf(4, 3), 3.0, 2, 2.0, &params);
    assert_eq!(urls(&result), vec!["u1", "u3", "u4"]);
    for doc in &result.results {
        assert!((doc.score - expected).abs() < 1e-12, "{}: {}", doc.url, doc.score);
    }
}

#[test]
fn limit_truncates_results_only() {
    let corpus = sneakers();
    let result = ranker(&corpus).rank(&RankRequest::new("sneakers", SearchField::Title).limit(2)).unwrap();
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.metadata.filtered, 4);
}

#[test]
fn response_uses_artifact_field_names() {
    let all = sneakers();
    let corpus = &all[..1];
    let result = ranker(corpus).requete_title("leather").unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["metadata"]["nb_elements_apres_filtrage"], 1);
    assert_eq!(json["metadata"]["nb_elements_total"], 1);
    assert_eq!(json["result"][0]["url"], "u1");
    assert!(json["result"][0]["score"].is_f64());
}

#[test]
fn missing_index_is_fatal() {
    let mut partial = IndexRegistry::new();
    partial.insert(registry::TITLE, shopfind_core::InvertedIndex::new());
    assert!(matches!(SearchIndices::from_registry(&partial), Err(EngineError::MissingIndex(_))));
}
