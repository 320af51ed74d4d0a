//! Command-line surface of `igemwiki`: argument parsing, item construction
//! and result reporting. Wiki logic lives in `igemwiki-core`.
//!
//! Every command runs the same way: load config, merge flags, read
//! credentials, build the work (an unknown content type fails here, before
//! any network traffic), log in, run, print one line per result. Any fatal
//! error or per-item failure makes [`run`] return an error, so the process
//! exits non-zero.
use crate::load_config::{load_config, load_credentials, resolve_settings, FileConfig, Settings};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use igemwiki_core::content::ContentItem;
use igemwiki_core::download::{download_all, summarise_downloads, DownloadOutcome, DownloadResult};
use igemwiki_core::upload::{summarise_transfers, upload_all, TransferOutcome, TransferResult};
use igemwiki_core::{login, MediaWikiClient};
use std::path::PathBuf;

/// CLI for igemwiki: upload content to, and back up, an iGEM team wiki.
#[derive(Parser)]
#[clap(
    name = "igemwiki",
    version,
    about = "Upload pages, templates, stylesheets, scripts and images to an iGEM team wiki, or back it up"
)]
pub struct Cli {
    /// Team name
    #[clap(long = "team", short = 'n', global = true)]
    pub team: Option<String>,

    /// Year of the wiki (defaults to the current year)
    #[clap(long, short = 'y', global = true)]
    pub year: Option<i32>,

    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download every team page and template into a directory
    Backup {
        /// Download directory
        #[clap(long, short = 'd', default_value = "./backups")]
        dir: PathBuf,

        /// Maximum number of pages fetched at once
        #[clap(long)]
        concurrency: Option<usize>,
    },
    /// Upload a single file
    Upload {
        /// Source file
        #[clap(long, short = 's')]
        source: PathBuf,

        /// Type (page, template, stylesheet, script, or image)
        #[clap(long = "type", short = 't')]
        kind: String,

        /// Destination name; derived from the source file name when omitted
        #[clap(long, short = 'd')]
        dest: Option<String>,

        /// Upload even if the wiki already holds identical content
        #[clap(long, short = 'f')]
        force: bool,
    },
    /// Upload every file matching a glob pattern, one at a time
    UploadGlob {
        /// Glob pattern for sources
        #[clap(long, short = 'g')]
        glob: String,

        /// Type (page, template, stylesheet, script, or image)
        #[clap(long = "type", short = 't')]
        kind: String,

        /// Upload even if the wiki already holds identical content
        #[clap(long, short = 'f')]
        force: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Backup { .. } => "backup",
            Commands::Upload { .. } => "upload",
            Commands::UploadGlob { .. } => "upload-glob",
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let settings = resolve_settings(file, cli.team, cli.year)?;
    let credentials = load_credentials()?;
    let command = cli.command.name();

    match cli.command {
        Commands::Backup { dir, concurrency } => {
            let mut options = settings.backup.clone();
            if let Some(concurrency) = concurrency {
                options.concurrency = concurrency;
            }
            tracing::info!(command, dir = %dir.display(), "Starting backup");

            let client = connect(&settings)?;
            let session = login(&client, &settings.team, &credentials, &settings.retry).await?;
            let results = download_all(&client, &session, &settings.team, &dir, &options).await?;
            report_downloads(&results)
        }
        Commands::Upload {
            source,
            kind,
            dest,
            force,
        } => {
            let item = ContentItem::parse(&kind, source, dest, force)?;
            upload_items(&settings, &credentials, vec![item], command).await
        }
        Commands::UploadGlob { glob, kind, force } => {
            let items = glob_items(&glob, &kind, force)?;
            if items.is_empty() {
                tracing::warn!(command, pattern = %glob, "No files matched the glob pattern");
                println!("No files matched {glob}");
                return Ok(());
            }
            upload_items(&settings, &credentials, items, command).await
        }
    }
}

/// Expands `pattern` into one item per matching file, in path order.
pub fn glob_items(pattern: &str, kind: &str, force: bool) -> Result<Vec<ContentItem>> {
    // Parse the type first so a bad type is reported even when nothing matches.
    let kind: igemwiki_core::ContentKind = kind.parse()?;
    let mut paths = glob::glob(pattern)
        .with_context(|| format!("Invalid glob pattern {pattern}"))?
        .collect::<std::result::Result<Vec<PathBuf>, _>>()
        .with_context(|| format!("Failed to expand glob pattern {pattern}"))?;
    paths.retain(|path| path.is_file());
    paths.sort();
    tracing::info!(pattern, matched = paths.len(), "Expanded glob pattern");

    Ok(paths
        .into_iter()
        .map(|path| ContentItem::new(kind, path, None, force))
        .collect())
}

fn connect(settings: &Settings) -> Result<MediaWikiClient> {
    MediaWikiClient::for_team(&settings.team, &settings.client)
        .context("Failed to construct wiki client")
}

async fn upload_items(
    settings: &Settings,
    credentials: &igemwiki_core::Credentials,
    items: Vec<ContentItem>,
    command: &str,
) -> Result<()> {
    tracing::info!(command, items = items.len(), "Starting upload");
    let client = connect(settings)?;
    let session = login(&client, &settings.team, credentials, &settings.retry).await?;
    let results = upload_all(&client, &session, items).await;
    report_transfers(&results)
}

fn report_transfers(results: &[TransferResult]) -> Result<()> {
    for result in results {
        match &result.outcome {
            TransferOutcome::Uploaded { .. } => {
                println!("uploaded  {} -> {}", result.item.source.display(), result.title)
            }
            TransferOutcome::Skipped { .. } => {
                println!("unchanged {} -> {}", result.item.source.display(), result.title)
            }
            TransferOutcome::Failed(e) => {
                println!("FAILED    {} -> {}: {e}", result.item.source.display(), result.title)
            }
        }
    }
    let summary = summarise_transfers(results);
    println!(
        "Upload completed: {} uploaded, {} unchanged, {} failed",
        summary.uploaded, summary.skipped, summary.failed
    );
    if summary.has_failures() {
        return Err(anyhow!("{} of {} uploads failed", summary.failed, summary.total()));
    }
    Ok(())
}

fn report_downloads(results: &[DownloadResult]) -> Result<()> {
    for result in results {
        match &result.outcome {
            DownloadOutcome::Saved { path } => {
                println!("saved  {} -> {}", result.page.title, path.display())
            }
            DownloadOutcome::Failed(e) => println!("FAILED {}: {e}", result.page.title),
        }
    }
    let summary = summarise_downloads(results);
    println!(
        "Download results: {} saved, {} failed",
        summary.saved, summary.failed
    );
    if summary.failed > 0 {
        return Err(anyhow!("{} of {} pages failed to download", summary.failed, results.len()));
    }
    Ok(())
}
