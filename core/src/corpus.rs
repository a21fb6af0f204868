use crate::document::Document;
use crate::error::{EngineError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read one JSON Lines file. Blank lines are skipped; a malformed line aborts
/// the load with its line number.
pub fn load_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| EngineError::resource(path, e))?;
    let reader = BufReader::new(f);
    let mut docs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => EngineError::InvalidDocument {
                path: path.to_path_buf(),
                line: i + 1,
                reason: e.to_string(),
            },
            _ => EngineError::Io(e),
        })?;
        if line.trim().is_empty() { continue; }
        let doc: Document = serde_json::from_str(&line).map_err(|e| EngineError::InvalidDocument {
            path: path.to_path_buf(),
            line: i + 1,
            reason: e.to_string(),
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

/// Load a corpus from a file or from every `.jsonl`/`.json` file under a
/// directory (sorted by path so corpus order is stable).
pub fn load_path<P: AsRef<Path>>(input: P) -> Result<Vec<Document>> {
    let input = input.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("jsonl" | "json")) {
                files.push(p.to_path_buf());
            }
        }
    } else {
        files.push(input.to_path_buf());
    }

    let mut corpus = Vec::new();
    for file in files {
        let docs = load_jsonl(&file)?;
        tracing::debug!(file = %file.display(), docs = docs.len(), "read corpus file");
        corpus.extend(docs);
    }
    check_unique(&corpus)?;
    Ok(corpus)
}

pub fn check_unique(corpus: &[Document]) -> Result<()> {
    let mut seen = HashSet::with_capacity(corpus.len());
    for doc in corpus {
        if !seen.insert(doc.url.as_str()) {
            return Err(EngineError::DuplicateDocument(doc.url.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reports_line_of_bad_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("products.jsonl");
        fs::write(
            &file,
            "{\"url\":\"a\",\"title\":\"A\",\"description\":\"\"}\n\n{\"url\":\"b\",\"title\":\"B\"}\n",
        )
        .unwrap();
        match load_jsonl(&file) {
            Err(EngineError::InvalidDocument { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_utf8_line_is_an_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("products.jsonl");
        let mut bytes = b"{\"url\":\"a\",\"title\":\"A\",\"description\":\"\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe\n");
        fs::write(&file, bytes).unwrap();
        match load_jsonl(&file) {
            Err(EngineError::InvalidDocument { path, line, .. }) => {
                assert_eq!(path, file);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_urls() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.jsonl"),
            "{\"url\":\"a\",\"title\":\"A\",\"description\":\"\"}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.jsonl"),
            "{\"url\":\"a\",\"title\":\"A again\",\"description\":\"\"}\n",
        )
        .unwrap();
        assert!(matches!(load_path(dir.path()), Err(EngineError::DuplicateDocument(u)) if u == "a"));
    }

    #[test]
    fn missing_file_is_resource_error() {
        assert!(matches!(load_jsonl("/nonexistent/products.jsonl"), Err(EngineError::Resource { .. })));
    }
}
