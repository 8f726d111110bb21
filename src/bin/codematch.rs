// src/bin/codematch.rs
//! CLI demo: runs the engine end-to-end over a directory of source
//! files, standing in for "submit a task over HTTP" during manual
//! testing. Not the production ingestion path.

use anyhow::{Context, Result};
use clap::Parser;
use codematch_core::persist::InMemoryStore;
use codematch_core::{Engine, EngineOptions, FileRef, Lang, Task};
use colored::Colorize;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "codematch")]
#[command(about = "Pairwise structural and lexical similarity over a directory of source files")]
struct Cli {
    /// Directory of source files to compare, all of the same language
    dir: PathBuf,

    /// Language tag (python, javascript, typescript, c, cpp, java, go, rust)
    #[arg(long, short)]
    language: String,

    /// Only consider files whose path matches this regex
    #[arg(long)]
    include: Option<String>,

    /// Report pairs at or above this token similarity
    #[arg(long, default_value_t = 0.15)]
    threshold: f64,

    /// Emit the full result set as JSON instead of a summary table
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "codematch=debug" } else { "codematch=info" };
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(filter)).init();

    let language = Lang::parse_tag(&cli.language)?;
    let include = cli.include.as_deref().map(Regex::new).transpose().context("compiling --include pattern")?;

    let mut files = Vec::new();
    let mut bytes_by_file_id = HashMap::new();
    for entry in WalkDir::new(&cli.dir).into_iter().filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(pattern) = &include {
            if !pattern.is_match(&path.to_string_lossy()) {
                continue;
            }
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let file_id = path.strip_prefix(&cli.dir).unwrap_or(path).to_string_lossy().to_string();
        let content_hash = codematch_core::model::content_hash(text.as_bytes());
        tracing::debug!(file = %file_id, hash = %content_hash, "loaded file");
        files.push(FileRef { file_id: file_id.clone(), content_hash, language });
        bytes_by_file_id.insert(file_id, Arc::<str>::from(text));
    }

    if files.len() < 2 {
        println!("{}", "need at least two files to compare".yellow());
        return Ok(());
    }

    let task = Task { task_id: "cli-demo".to_string(), files, language };
    let engine = Engine::new(100_000, Duration::from_secs(3600));
    let persist = Arc::new(InMemoryStore::new());
    let runner = engine.task_runner(persist.clone());

    let mut options = EngineOptions::default();
    options.candidate_threshold = cli.threshold;
    options.validate()?;

    let summary = runner.run_task(&task, &bytes_by_file_id, &options)?;
    if !cli.json {
        println!(
            "{} {} pairs compared, {} already cached",
            "done:".green().bold(),
            summary.pairs_compared,
            summary.pairs_skipped_existing
        );
    }

    let mut reported = Vec::new();
    for file_a in &task.files {
        for file_b in &task.files {
            if file_a.file_id >= file_b.file_id {
                continue;
            }
            let Some(result) = persist.get("cli-demo", &file_a.content_hash, &file_b.content_hash) else { continue };
            if result.token_similarity < cli.threshold {
                continue;
            }
            if cli.json {
                reported.push(serde_json::json!({
                    "file_a": file_a.file_id,
                    "file_b": file_b.file_id,
                    "token_similarity": result.token_similarity,
                    "ast_similarity": result.ast_similarity,
                    "matches": result.matches,
                }));
                continue;
            }
            println!(
                "{:>6.1}%  token  {:>6.1}%  ast   {}  <->  {}  ({} match regions)",
                result.token_similarity * 100.0,
                result.ast_similarity * 100.0,
                file_a.file_id.cyan(),
                file_b.file_id.cyan(),
                result.matches.len()
            );
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reported)?);
    }

    Ok(())
}
