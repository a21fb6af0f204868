use anyhow::{Context, Result};
use shopfind_core::corpus;
use shopfind_core::persist::{load_all, IndexPaths};
use shopfind_core::ranking::{Bm25Params, RankRequest, RankedResult, Ranker, RankerConfig, SearchIndices};
use shopfind_core::synonyms::SynonymMap;
use shopfind_core::tokenizer::Tokenizer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Everything needed to bring a ranker up.
#[derive(Debug, Clone)]
pub struct RankerSetup {
    pub index_dir: PathBuf,
    pub corpus: PathBuf,
    pub synonyms: Option<PathBuf>,
    pub stopwords: Option<PathBuf>,
    pub bm25: Bm25Params,
}

/// Load snapshot, corpus, synonyms and stopwords. Any missing resource is fatal.
pub fn build_ranker(setup: &RankerSetup) -> Result<Ranker> {
    let tokenizer = match &setup.stopwords {
        Some(path) => Tokenizer::from_stopword_file(path)?,
        None => Tokenizer::english(),
    };
    let synonyms = match &setup.synonyms {
        Some(path) => SynonymMap::from_file(path)?,
        None => SynonymMap::empty(),
    };
    let registry = load_all(&IndexPaths::new(&setup.index_dir))
        .with_context(|| format!("loading snapshot {}", setup.index_dir.display()))?;
    let indices = SearchIndices::from_registry(&registry)?;
    let docs = corpus::load_path(&setup.corpus)
        .with_context(|| format!("reading corpus {}", setup.corpus.display()))?;
    tracing::info!(num_docs = docs.len(), synonyms = synonyms.len(), "ranker ready");

    let config = RankerConfig { bm25: setup.bm25 };
    Ok(Ranker::new(indices, &docs, tokenizer, synonyms, config))
}

/// Write the response artifact, or print it when `output` is `None`.
pub fn write_response(result: &RankedResult, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut w = BufWriter::new(f);
            serde_json::to_writer(&mut w, result)?;
            w.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, result)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

pub fn run(ranker: &Ranker, request: &RankRequest, output: Option<&Path>) -> Result<RankedResult> {
    let start = std::time::Instant::now();
    let result = ranker.rank(request)?;
    tracing::info!(
        query = %request.query,
        filtered = result.metadata.filtered,
        total = result.metadata.total,
        took_s = start.elapsed().as_secs_f64(),
        "query ranked"
    );
    write_response(&result, output)?;
    Ok(result)
}
