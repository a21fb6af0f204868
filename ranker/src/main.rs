use anyhow::Result;
use clap::{Parser, ValueEnum};
use ranker::{build_ranker, run, RankerSetup};
use shopfind_core::ranking::{Bm25Params, RankRequest, Scorer, SearchField};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Title,
    Description,
    Both,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScorerArg {
    Linear,
    Bm25,
}

#[derive(Parser)]
#[command(name = "ranker", about = "Rank the corpus against one query")]
struct Args {
    /// Snapshot directory written by `indexer build`
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// JSON Lines corpus the snapshot was built from
    #[arg(long)]
    corpus: PathBuf,
    /// Synonym map, a JSON object of token -> [synonyms]
    #[arg(long)]
    synonyms: Option<PathBuf>,
    /// Stopword list; built-in English list if omitted
    #[arg(long)]
    stopwords: Option<PathBuf>,
    #[arg(long)]
    query: String,
    #[arg(long, value_enum, default_value_t = FieldArg::Title)]
    field: FieldArg,
    #[arg(long, value_enum, default_value_t = ScorerArg::Linear)]
    scorer: ScorerArg,
    /// Keep only documents of this region
    #[arg(long)]
    region: Option<String>,
    /// Keep only documents containing all of these terms
    #[arg(long)]
    must_have: Option<String>,
    #[arg(long, default_value_t = 1.5)]
    k1: f64,
    #[arg(long, default_value_t = 0.75)]
    b: f64,
    /// Emit at most this many results
    #[arg(long)]
    limit: Option<usize>,
    /// Response file; printed to stdout if omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let setup = RankerSetup {
        index_dir: args.index,
        corpus: args.corpus,
        synonyms: args.synonyms,
        stopwords: args.stopwords,
        bm25: Bm25Params { k1: args.k1, b: args.b },
    };
    let ranker = build_ranker(&setup)?;

    let field = match args.field {
        FieldArg::Title => SearchField::Title,
        FieldArg::Description => SearchField::Description,
        FieldArg::Both => SearchField::TitleDescription,
    };
    let scorer = match args.scorer {
        ScorerArg::Linear => Scorer::Linear,
        ScorerArg::Bm25 => Scorer::Bm25,
    };
    let request = RankRequest {
        query: args.query,
        field,
        scorer,
        region: args.region,
        must_have: args.must_have,
        limit: args.limit,
    };
    run(&ranker, &request, args.output.as_deref())?;
    Ok(())
}
