// src/main.rs
//
// lexspectra — spectral risk scoring for candidate terms across
// natural-language contexts.
//
// Two operational modes:
//   tail    — tail a JSONL request log file, scoring each line as it arrives
//   replay  — score every request in a JSONL file once, then exit
//
// Usage:
//   lexspectra --mode replay --path requests.jsonl
//   lexspectra --mode tail --path /var/log/lexspectra/requests.jsonl

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod engine;
mod error;
mod labeler;
mod spectral;
mod storage;
mod text;
mod types;

use engine::{FusionEngine, ScoreService};
use labeler::{HeuristicLabeler, Labeler};
use storage::{SqliteStore, StorageBackend};
use types::{TermScoreRequest, TextScoreRequest};

#[derive(Parser)]
#[command(
    name = "lexspectra",
    about = "Spectral risk scoring for candidate terms across natural-language contexts",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, value_enum, default_value = "replay")]
    mode: Mode,

    #[arg(long, default_value = "/tmp/lexspectra_requests.jsonl", help = "JSONL request log path")]
    path: PathBuf,

    #[arg(long, help = "SQLite database path; omitted disables persistence")]
    database: Option<PathBuf>,

    #[arg(long, default_value_t = spectral::embed::DEFAULT_DIM, help = "Hashed embedding dimension")]
    embedding_dim: usize,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    Tail,
    Replay,
}

/// One line of the JSONL request log. Tagged by `kind` so a single stream
/// can mix term-scoring and text-scoring requests.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ScoreRequestLine {
    Term(TermScoreRequest),
    Text(TextScoreRequest),
}

struct Pipeline {
    service: ScoreService,
}

impl Pipeline {
    fn new(embedding_dim: usize, database: Option<PathBuf>) -> Result<Self> {
        let labeler: Arc<dyn Labeler> = Arc::new(HeuristicLabeler::new());
        let storage: Option<Arc<dyn StorageBackend>> = match database {
            Some(path) => Some(Arc::new(SqliteStore::open(&path)?)),
            None => None,
        };
        let service = ScoreService::new(embedding_dim, labeler, FusionEngine::new(), storage);
        Ok(Self { service })
    }

    async fn process_line(&self, line: &str) {
        let parsed: ScoreRequestLine = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("Parse error: {}", e);
                return;
            }
        };

        match parsed {
            ScoreRequestLine::Term(request) => match self.service.score_term(&request, true).await {
                Ok(response) => print_json(&response),
                Err(e) => error!("Scoring failed: {}", e),
            },
            ScoreRequestLine::Text(request) => match self.service.score_text(&request).await {
                Ok(response) => print_json(&response),
                Err(e) => error!("Scoring failed: {}", e),
            },
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to serialize response: {}", e),
    }
}

async fn tail_jsonl(path: PathBuf, tx: mpsc::Sender<String>) -> Result<()> {
    let file = tokio::fs::File::open(&path).await?;
    let mut lines = BufReader::new(file).lines();
    while lines.next_line().await?.is_some() {} // consume existing, only stream new lines

    info!("Tailing {}", path.display());
    loop {
        match lines.next_line().await? {
            Some(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            None => tokio::time::sleep(tokio::time::Duration::from_millis(50)).await,
        }
    }
    Ok(())
}

async fn replay_jsonl(path: PathBuf, tx: mpsc::Sender<String>) -> Result<()> {
    let content = tokio::fs::read_to_string(&path).await?;
    for line in content.lines() {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if tx.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lexspectra=info".parse()?))
        .compact()
        .init();

    let cli = Cli::parse();
    let pipeline = Arc::new(Pipeline::new(cli.embedding_dim, cli.database.clone())?);
    let (tx, mut rx) = mpsc::channel::<String>(4096);

    match cli.mode {
        Mode::Tail => {
            println!("Mode: tail  |  {}", cli.path.display());
            let path = cli.path.clone();
            tokio::spawn(async move {
                if let Err(e) = tail_jsonl(path, tx).await {
                    error!("Tail source failed: {}", e);
                }
            });
        }
        Mode::Replay => {
            println!("Mode: replay  |  {}", cli.path.display());
            let path = cli.path.clone();
            tokio::spawn(async move {
                if let Err(e) = replay_jsonl(path, tx).await {
                    error!("Replay source failed: {}", e);
                }
            });
        }
    }

    while let Some(line) = rx.recv().await {
        let p = Arc::clone(&pipeline);
        tokio::spawn(async move { p.process_line(&line).await });
    }

    Ok(())
}
