// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! esstore: files stored as chunk documents in Elasticsearch
//!
//! Usage:
//!   esstore -H es:9200 store ./report.pdf docs/report.pdf --auto
//!   esstore get docs/report.pdf ./copy.pdf
//!   esstore cat notes.txt
//!   esstore list --sort asc
//!   esstore delete docs/report.pdf
//!   esstore integrity

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use esstore::config::Config;
use esstore::error::StoreError;
use esstore::report;
use esstore::storage::elastic::ElasticStore;
use esstore::storage::engine::{SortOrder, StorageEngine};
use esstore::storage::sizing::ChunkSizing;

type Engine = StorageEngine<ElasticStore>;

#[derive(Parser)]
#[command(name = "esstore", about = "Chunked file storage in Elasticsearch", version)]
struct Cli {
    /// Elasticsearch host and port (e.g. localhost:9200).
    #[arg(short = 'H', long = "host", global = true)]
    host: Option<String>,
    /// Path to an optional TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Abort an operation that takes longer than this many seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a local file; the stored name defaults to the source path.
    #[command(alias = "put")]
    Store {
        source: PathBuf,
        dest: Option<String>,
        /// Chunk size in bytes.
        #[arg(short, long)]
        size: Option<usize>,
        /// Pick the chunk size from the file length.
        #[arg(long, alias = "opt", conflicts_with = "size")]
        auto: bool,
    },
    /// Fetch a stored file into a local file (defaults to the stored name).
    Get {
        name: String,
        output: Option<PathBuf>,
    },
    /// Write a stored file to stdout.
    Cat { name: String },
    /// List stored files.
    List {
        #[arg(long, value_enum, default_value_t = SortOrder::None)]
        sort: SortOrder,
    },
    /// Delete a stored file and its chunks.
    Delete { name: String },
    /// Verify every file against its chunks and report orphans.
    Integrity,
    /// Delete every stored file and chunk.
    Purge {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(host) = &cli.host {
        cfg.set_host_port(host)?;
    }
    if let Some(secs) = cli.timeout {
        cfg.storage.op_timeout_secs = Some(secs);
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cfg = load_config(&cli)?;
    let store = ElasticStore::from_config(&cfg).map_err(StoreError::from)?;
    let engine = StorageEngine::open(store, &cfg.storage).await?;
    info!(backend = %cfg.base_url(), "Connected");

    match cli.command {
        Command::Store { source, dest, size, auto } => {
            let sizing = cfg.storage.sizing(size, auto);
            run_store(&engine, source, dest, sizing).await
        }
        Command::Get { name, output } => run_get(&engine, &name, output).await,
        Command::Cat { name } => run_cat(&engine, &name).await,
        Command::List { sort } => run_list(&engine, sort).await,
        Command::Delete { name } => run_delete(&engine, &name).await,
        Command::Integrity => run_integrity(&engine).await,
        Command::Purge { yes } => run_purge(&engine, yes).await,
    }
}

async fn run_store(
    engine: &Engine,
    source: PathBuf,
    dest: Option<String>,
    sizing: ChunkSizing,
) -> anyhow::Result<ExitCode> {
    let dest = dest.unwrap_or_else(|| source.display().to_string());
    info!(source = ?source, dest = %dest, "Storing file");

    let receipt = engine.store_path(&source, &dest, sizing).await?;
    println!(
        "File {} written out with index {}, filesize of {}, and {} chunk entries ({} bytes each).",
        source.display(),
        receipt.file_id,
        receipt.filesize,
        receipt.chunk_count,
        receipt.chunk_size
    );
    Ok(ExitCode::SUCCESS)
}

async fn run_get(engine: &Engine, name: &str, output: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let output = output.unwrap_or_else(|| PathBuf::from(name));
    let data = engine.get_file(name).await?;
    tokio::fs::write(&output, &data)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;
    println!("Wrote out {} to file {} with {} bytes.", name, output.display(), data.len());
    Ok(ExitCode::SUCCESS)
}

async fn run_cat(engine: &Engine, name: &str) -> anyhow::Result<ExitCode> {
    let data = engine.get_file(name).await?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&data).await.context("Cannot write to stdout")?;
    stdout.flush().await.context("Cannot write to stdout")?;
    Ok(ExitCode::SUCCESS)
}

async fn run_list(engine: &Engine, sort: SortOrder) -> anyhow::Result<ExitCode> {
    let files = engine.list_files(sort).await?;
    print!("{}", report::render_listing(&files));
    Ok(ExitCode::SUCCESS)
}

async fn run_delete(engine: &Engine, name: &str) -> anyhow::Result<ExitCode> {
    let deleted = engine.delete_file(name).await?;
    println!("{} chunk entries deleted.", deleted.chunks.succeeded);
    if deleted.chunks.failed > 0 {
        println!("{} chunk entries could not be deleted.", deleted.chunks.failed);
    }
    println!("File entry deleted for {name}.");
    Ok(ExitCode::SUCCESS)
}

async fn run_integrity(engine: &Engine) -> anyhow::Result<ExitCode> {
    let summary = engine.integrity_check().await?;
    print!("{}", report::render_integrity(&summary));
    Ok(if summary.is_clean() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_purge(engine: &Engine, yes: bool) -> anyhow::Result<ExitCode> {
    if !yes {
        bail!("purge deletes every stored file; re-run with --yes to confirm");
    }
    let purged = engine.purge().await?;
    println!("{} chunk entries deleted.", purged.chunks.succeeded);
    println!("{} file entries deleted.", purged.files.succeeded);
    Ok(ExitCode::SUCCESS)
}
