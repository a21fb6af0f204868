use crate::index::InvertedIndex;
use crate::synonyms::SynonymMap;
use crate::tokenizer::Tokenizer;

/// A raw free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
}

impl Query {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str { &self.raw }

    pub fn tokens(&self, tokenizer: &Tokenizer) -> Vec<String> {
        tokenizer.tokenize(&self.raw)
    }

    /// Query tokens, each followed by its synonyms.
    pub fn expanded(&self, tokenizer: &Tokenizer, synonyms: &SynonymMap) -> Vec<String> {
        synonyms.expand(&self.tokens(tokenizer))
    }
}

/// True iff `doc_id` is posted under every token. Vacuously true for no tokens.
pub fn all_tokens_present(doc_id: &str, tokens: &[String], index: &InvertedIndex) -> bool {
    tokens.iter().all(|token| index.contains(token, doc_id))
}

/// True iff at least one token's posting set does NOT contain `doc_id`.
///
/// Despite the name this is an OR of absences (`!all_tokens_present` for a
/// non-empty token list). The literal behavior is kept and pinned by tests;
/// ranking does not call it.
pub fn any_token_present(doc_id: &str, tokens: &[String], index: &InvertedIndex) -> bool {
    tokens.iter().any(|token| !index.contains(token, doc_id))
}
