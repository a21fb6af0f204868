use crate::error::{EngineError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // ASCII punctuation only, the same class `string.punctuation` covers.
    static ref PUNCT: Regex = Regex::new(r"[[:punct:]]").expect("valid regex");
    static ref ENGLISH: Vec<&'static str> = vec![
        "i","me","my","myself","we","our","ours","ourselves","you","you're","you've","you'll","you'd",
        "your","yours","yourself","yourselves","he","him","his","himself","she","she's","her","hers",
        "herself","it","it's","its","itself","they","them","their","theirs","themselves",
        "what","which","who","whom","this","that","that'll","these","those",
        "am","is","are","was","were","be","been","being","have","has","had","having",
        "do","does","did","doing","a","an","the","and","but","if","or","because","as","until","while",
        "of","at","by","for","with","about","against","between","into","through","during","before",
        "after","above","below","to","from","up","down","in","out","on","off","over","under",
        "again","further","then","once","here","there","when","where","why","how",
        "all","any","both","each","few","more","most","other","some","such",
        "no","nor","not","only","own","same","so","than","too","very",
        "s","t","can","will","just","don","don't","should","should've","now",
        "d","ll","m","o","re","ve","y","ain","aren","aren't","couldn","couldn't","didn","didn't",
        "doesn","doesn't","hadn","hadn't","hasn","hasn't","haven","haven't","isn","isn't",
        "ma","mightn","mightn't","mustn","mustn't","needn","needn't","shan","shan't",
        "shouldn","shouldn't","wasn","wasn't","weren","weren't","won","won't","wouldn","wouldn't"
    ];
}

/// Text normalizer and splitter. The stopword set is fixed at construction;
/// `tokenize` does no I/O.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::english()
    }
}

impl Tokenizer {
    /// Tokenizer using the built-in English stopword list.
    pub fn english() -> Self {
        Self::with_stopwords(ENGLISH.iter().copied())
    }

    pub fn with_stopwords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        Self { stopwords }
    }

    /// Load stopwords from a JSON array of strings, or JSON Lines holding one string per line.
    pub fn from_stopword_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| EngineError::resource(path, e))?;
        let words: Vec<String> = match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(words) => words,
            Err(_) => raw
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(serde_json::from_str::<String>)
                .collect::<std::result::Result<_, _>>()?,
        };
        tracing::debug!(path = %path.display(), count = words.len(), "loaded stopwords");
        Ok(Self::with_stopwords(words))
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// NFKC + lower-case, punctuation kept. Offsets in the position index are
    /// character offsets into this string.
    pub fn normalize(&self, text: &str) -> String {
        text.nfkc().collect::<String>().to_lowercase()
    }

    /// Normalized text with ASCII punctuation deleted, not yet split.
    pub fn strip_punctuation(&self, text: &str) -> String {
        PUNCT.replace_all(&self.normalize(text), "").into_owned()
    }

    /// Lower-case, strip punctuation, split on whitespace, drop stopwords.
    /// Order and duplicates are kept.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.strip_punctuation(text)
            .split_whitespace()
            .filter(|t| !self.is_stopword(t))
            .map(str::to_string)
            .collect()
    }
}
