use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shopfind_core::builder::build_all;
use shopfind_core::corpus;
use shopfind_core::persist::{load_all, meta_for, save_meta, save_registry, IndexPaths, SnapshotFormat};
use shopfind_core::tokenizer::Tokenizer;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect product search index snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Bin,
}

impl From<Format> for SnapshotFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => SnapshotFormat::Json,
            Format::Bin => SnapshotFormat::Binary,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build every index from a JSON Lines corpus (file or directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output snapshot directory
        #[arg(long)]
        output: PathBuf,
        /// Artifact encoding
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Stopword list (JSON array or one JSON string per line); built-in English list if omitted
        #[arg(long)]
        stopwords: Option<PathBuf>,
    },
    /// List the indices of a snapshot
    Inspect {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, format, stopwords } => {
            build_index(&input, &output, format.into(), stopwords.as_deref())
        }
        Commands::Inspect { index } => {
            let registry = load_all(&IndexPaths::new(&index))
                .with_context(|| format!("loading snapshot {}", index.display()))?;
            println!("{registry}");
            Ok(())
        }
    }
}

fn build_index(input: &Path, output: &Path, format: SnapshotFormat, stopwords: Option<&Path>) -> Result<()> {
    let tokenizer = match stopwords {
        Some(path) => Tokenizer::from_stopword_file(path)?,
        None => Tokenizer::english(),
    };
    let docs = corpus::load_path(input).with_context(|| format!("reading corpus {}", input.display()))?;
    tracing::info!(num_docs = docs.len(), "ingested documents");

    let registry = build_all(&docs, &tokenizer);

    let out_paths = IndexPaths::new(output);
    let report = save_registry(&out_paths, &registry, format);
    let meta = meta_for(&registry, &report, docs.len() as u32, format);
    // a stale manifest from an earlier build would decide how this one loads
    save_meta(&out_paths, &meta).with_context(|| format!("writing manifest in {}", output.display()))?;

    tracing::info!(output = %output.display(), saved = report.saved.len(), failed = report.failed.len(), "index build complete");
    Ok(())
}
