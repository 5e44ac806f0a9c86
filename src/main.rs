use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use lineio_config::Config;
use lineio_fs::{FileOps, PathResolver, Span, TokioFs, TracingSpans, WriterConfig};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

/// Line-oriented file access with atomic writes
#[derive(Debug, Parser)]
#[command(name = "lineio", version)]
struct Cli {
    /// Configuration file; searched for in the usual places when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the non-empty lines of a file
    Cat { path: String },
    /// Atomically replace a file with the lines read from stdin
    Write { path: String },
    /// Copy a file, overwriting the destination
    Cp { from: String, to: String },
    /// Rename a file within its directory
    Mv { from: String, new_name: String },
    /// Remove a file
    Rm { path: String },
    /// Show file status
    Stat { path: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log.level);

    let ops = build_ops(&config);
    let spans = TracingSpans::new();
    run(&ops, &spans, cli.command).await
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    config.validate().context("invalid config")?;
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_ops(config: &Config) -> FileOps<TokioFs> {
    let resolver = match &config.io.base_dir {
        Some(base) => PathResolver::new(base),
        None => PathResolver::from_home(),
    };
    let writer = WriterConfig {
        chunk_threshold: config.io.chunk_threshold,
        temp_suffix: config.io.temp_suffix.clone(),
    };

    FileOps::with_primitive(TokioFs::new().with_sync_on_flush(config.io.sync_on_flush))
        .with_writer_config(writer)
        .with_resolver(resolver)
}

fn resolve(ops: &FileOps<TokioFs>, input: &str) -> Result<PathBuf> {
    ops.resolve(input)
        .ok_or_else(|| anyhow!("cannot resolve path {input:?}"))
}

async fn run(ops: &FileOps<TokioFs>, spans: &TracingSpans, command: Command) -> Result<()> {
    match command {
        Command::Cat { path } => {
            let path = resolve(ops, &path)?;
            let mut out = std::io::BufWriter::new(std::io::stdout().lock());
            let mut failed = None;
            let mut consumer = |line: Option<&str>| {
                if failed.is_some() {
                    return;
                }
                let result = match line {
                    Some(line) => writeln!(out, "{line}"),
                    None => out.flush(),
                };
                failed = result.err();
            };
            ops.read_from_file(&path, &mut consumer, Some(Span::new(spans, "cat")))
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            if let Some(error) = failed {
                return Err(error).context("failed to write to stdout");
            }
        }
        Command::Write { path } => {
            let path = resolve(ops, &path)?;
            let mut lines = Vec::new();
            let mut stdin = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = stdin.next_line().await.context("failed to read stdin")? {
                lines.push(line);
            }
            let report = ops
                .write_to_file(&path, lines, Some(Span::new(spans, "write")))
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                path = %report.path.display(),
                bytes = report.bytes_written,
                chunks = report.chunks_written,
                "written"
            );
        }
        Command::Cp { from, to } => {
            let (from, to) = (resolve(ops, &from)?, resolve(ops, &to)?);
            ops.copy_file(&from, &to)
                .await
                .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
        }
        Command::Mv { from, new_name } => {
            let from = resolve(ops, &from)?;
            let to = ops
                .rename_file(&from, &new_name)
                .await
                .with_context(|| format!("failed to rename {}", from.display()))?;
            println!("{}", to.display());
        }
        Command::Rm { path } => {
            let path = resolve(ops, &path)?;
            ops.remove_file(&path)
                .await
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Command::Stat { path } => {
            let path = resolve(ops, &path)?;
            let stat = ops
                .stat_file(&path)
                .await
                .with_context(|| format!("failed to stat {}", path.display()))?;
            let modified = stat
                .last_modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            println!("path:      {}", path.display());
            println!("exists:    {}", stat.exists);
            println!("file:      {}", stat.is_file);
            println!("directory: {}", stat.is_directory);
            println!("modified:  {modified}");
        }
    }
    Ok(())
}
