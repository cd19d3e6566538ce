use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use walkdir::WalkDir;

use kbingest::config::{default_config_path, load_config_or_default};
use kbingest::logging::{self, LogFormat, DEFAULT_FILTER};
use kbingest::pipeline::{EmbedReport, FileState};
use kbingest::{FileRecord, Pipeline, RawFile, DEFAULT_KNOWLEDGE_BASE_ID};

#[derive(Parser, Debug)]
#[command(name = "kbingest", version, about = "Upload, translate and embed documents into a knowledge base")]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long = "json-logs", global = true)]
    json_logs: bool,

    /// Print command results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List ingested files.
    Files,
    /// Upload files, optionally translating and embedding them.
    Upload(UploadArgs),
    /// Embed uploaded files into a knowledge base.
    Embed {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Target knowledge base. Each run starts on the default knowledge
        /// base, so pass --kb to embed anywhere else.
        #[arg(long = "kb", default_value = DEFAULT_KNOWLEDGE_BASE_ID)]
        knowledge_base: String,
    },
    /// Delete an ingested file from the backend and the local cache.
    Delete { id: String },
    /// Manage knowledge bases.
    #[command(subcommand)]
    Kb(KbCommands),
}

#[derive(Args, Debug)]
struct UploadArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Translate the extracted text.
    #[arg(long)]
    translate: bool,
    /// Descend into subdirectories.
    #[arg(long, short = 'r')]
    recursive: bool,
    /// Embed the uploaded files afterwards.
    #[arg(long)]
    embed: bool,
    /// Knowledge base for --embed [default: default].
    #[arg(long = "kb", requires = "embed")]
    knowledge_base: Option<String>,
}

#[derive(Subcommand, Debug)]
enum KbCommands {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Remove every embedding from a knowledge base. Cannot be undone.
    Reset {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init(format, DEFAULT_FILTER).context("failed to initialize logging")?;

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    let pipeline = Pipeline::from_config(&config).context("failed to create pipeline")?;
    let init = pipeline.initialize().await;
    if let Some(e) = &init.reconcile.remote_error {
        log::warn!("Working from the local cache only: {}", e);
    }

    match cli.command {
        Commands::Files => list_files(&pipeline, cli.json),
        Commands::Upload(args) => upload(&pipeline, args, cli.json).await,
        Commands::Embed {
            ids,
            knowledge_base,
        } => {
            let report = embed(&pipeline, &ids, &knowledge_base).await?;
            print_embed_report(&report, cli.json)
        }
        Commands::Delete { id } => {
            let removed = pipeline.delete_file(&id).await?;
            println!("Deleted {} ({})", removed.name, removed.id);
            Ok(())
        }
        Commands::Kb(command) => knowledge_base(&pipeline, command, cli.json).await,
    }
}

fn list_files(pipeline: &Pipeline, json: bool) -> Result<()> {
    let records = pipeline.records();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }
    let counts = pipeline.counts();
    println!(
        "{} files: {} embedded, {} completed, {} pending, {} upload failed, {} embed failed",
        records.len(),
        counts.embedded,
        counts.completed,
        counts.pending,
        counts.upload_failed,
        counts.embed_failed
    );
    Ok(())
}

fn print_record(record: &FileRecord) {
    let state = FileState::of(record);
    let target = record.knowledge_base_id.as_deref().unwrap_or("-");
    match &record.error {
        Some(error) => println!(
            "{}  {:<12} {:<10} {}  ({})",
            record.id, state, target, record.name, error
        ),
        None => println!(
            "{}  {:<12} {:<10} {}",
            record.id, state, target, record.name
        ),
    }
}

fn collect_paths(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_file() {
            paths.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            bail!("no such file or directory: {}", input.display());
        }

        let depth = if recursive { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .max_depth(depth)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && !is_hidden(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        paths.extend(found);
    }
    Ok(paths)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

async fn upload(pipeline: &Pipeline, args: UploadArgs, json: bool) -> Result<()> {
    let paths = collect_paths(&args.paths, args.recursive)?;
    if paths.is_empty() {
        bail!("no files to upload");
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = RawFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file.with_translation(args.translate));
    }

    let records = pipeline.upload(files).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            print_record(record);
        }
    }

    let failed = records
        .iter()
        .filter(|r| FileState::of(r) == FileState::UploadFailed)
        .count();

    if args.embed {
        let ids: Vec<String> = records
            .iter()
            .filter(|r| FileState::of(r).can_embed())
            .map(|r| r.id.clone())
            .collect();
        if !ids.is_empty() {
            let target = args
                .knowledge_base
                .as_deref()
                .unwrap_or(DEFAULT_KNOWLEDGE_BASE_ID);
            let report = embed(pipeline, &ids, target).await?;
            print_embed_report(&report, json)?;
        }
    }

    if failed > 0 {
        bail!("{} of {} uploads failed", failed, records.len());
    }
    Ok(())
}

async fn embed(
    pipeline: &Pipeline,
    ids: &[String],
    knowledge_base: &str,
) -> Result<EmbedReport> {
    Ok(pipeline.embed(ids, knowledge_base, None).await?)
}

fn print_embed_report(report: &EmbedReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "Embedded {} file(s) into '{}'",
            report.embedded.len(),
            report.knowledge_base_id
        );
        for failure in &report.failed {
            println!("  failed: {} ({}): {}", failure.name, failure.id, failure.error);
        }
    }

    if !report.all_succeeded() {
        bail!("{} embed(s) failed", report.failed.len());
    }
    Ok(())
}

async fn knowledge_base(pipeline: &Pipeline, command: KbCommands, json: bool) -> Result<()> {
    match command {
        KbCommands::List => {
            let bases = pipeline.knowledge_bases();
            if json {
                println!("{}", serde_json::to_string_pretty(&bases)?);
                return Ok(());
            }
            let current = pipeline.current_knowledge_base();
            for kb in &bases {
                let marker = if kb.id == current.id { "*" } else { " " };
                println!("{} {:<24} {}  {}", marker, kb.id, kb.name, kb.description);
            }
        }
        KbCommands::Create { name, description } => {
            let kb = pipeline.create_knowledge_base(&name, &description).await?;
            println!("Created knowledge base '{}' ({})", kb.name, kb.id);
        }
        KbCommands::Reset { id, yes } => {
            if !yes {
                bail!("resetting '{}' removes all of its embeddings; pass --yes to confirm", id);
            }
            let cleared = pipeline.reset_knowledge_base(&id).await?;
            println!("Reset '{}', {} file(s) need re-embedding", id, cleared.len());
        }
        KbCommands::Delete { id } => {
            let cleared = pipeline.delete_knowledge_base(&id).await?;
            println!("Deleted '{}', {} file(s) need re-embedding", id, cleared.len());
        }
    }
    Ok(())
}
