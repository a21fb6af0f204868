use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// token -> synonyms, in file order. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    map: HashMap<String, Vec<String>>,
}

impl SynonymMap {
    pub fn empty() -> Self { Self::default() }

    pub fn from_map(map: HashMap<String, Vec<String>>) -> Self {
        Self { map }
    }

    /// Load a JSON object `{"token": ["synonym", ...]}`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| EngineError::resource(path, e))?;
        let map: HashMap<String, Vec<String>> = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), entries = map.len(), "loaded synonyms");
        Ok(Self { map })
    }

    pub fn get(&self, token: &str) -> Option<&[String]> {
        self.map.get(token).map(Vec::as_slice)
    }

    /// Each token followed by its synonyms. Duplicates are kept.
    pub fn expand(&self, tokens: &[String]) -> Vec<String> {
        let mut expanded = Vec::with_capacity(tokens.len());
        for token in tokens {
            expanded.push(token.clone());
            if let Some(syns) = self.get(token) {
                expanded.extend(syns.iter().cloned());
            }
        }
        expanded
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}
