//! Backup Downloader: every page of a team's yearly wiki into a local directory.
//!
//! The run has two phases:
//! - **Enumerate.** The paginated listing is exposed as a lazy stream
//!   ([`page_stream`]) and consumed to completion before anything is fetched.
//!   Any listing failure aborts the run with [`Error::Enumeration`].
//! - **Fetch.** Pages are fetched with bounded concurrency
//!   ([`BackupOptions::concurrency`]) and written to
//!   `target_dir/<page_file_name(title)>`. A failing page is recorded in its
//!   own [`DownloadResult`] and does not affect the others.
//!
//! Results come back in completion order; callers must not rely on it.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::{BackupOptions, TeamWikiConfig};
use crate::contract::{ListQuery, PageRecord, Session, WikiApi};
use crate::error::{DownloadError, Error, Result, WikiError};

/// Extension given to every backed-up page.
pub const PAGE_FILE_EXTENSION: &str = "html";

#[derive(Debug)]
pub enum DownloadOutcome {
    Saved { path: PathBuf },
    Failed(DownloadError),
}

#[derive(Debug)]
pub struct DownloadResult {
    pub page: PageRecord,
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DownloadOutcome::Failed(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.outcome {
            DownloadOutcome::Saved { path } => Some(path),
            DownloadOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub saved: usize,
    pub failed: usize,
}

pub fn summarise_downloads(results: &[DownloadResult]) -> DownloadSummary {
    let failed = results.iter().filter(|r| r.is_failed()).count();
    DownloadSummary {
        saved: results.len() - failed,
        failed,
    }
}

/// File name a page title is saved under.
///
/// The title is percent-encoded, so separators and other characters that are
/// unsafe in file names never reach the filesystem and distinct titles map to
/// distinct names.
pub fn page_file_name(title: &str) -> String {
    format!("{}.{PAGE_FILE_EXTENSION}", urlencoding::encode(title))
}

/// Lazily walks every batch of the listing for `query`.
pub fn page_stream<'a, A>(
    api: &'a A,
    session: &'a Session,
    query: ListQuery,
) -> impl Stream<Item = std::result::Result<PageRecord, WikiError>> + 'a
where
    A: WikiApi + ?Sized,
{
    // `Some(continuation)` while there is a batch left to fetch.
    stream::try_unfold(Some(None::<String>), move |state| {
        let query = query.clone();
        async move {
            let Some(continue_from) = state else {
                return Ok(None);
            };
            debug!(prefix = %query.prefix, namespace = query.namespace, continue_from = ?continue_from, "Fetching page listing batch");
            let listing = api.list_pages(session, &query, continue_from.clone()).await?;
            if listing.next.is_some() && listing.next == continue_from {
                return Err(WikiError::Malformed(format!(
                    "listing for {} did not advance past {:?}",
                    query.prefix, listing.next
                )));
            }
            Ok(Some((listing.pages, listing.next.map(Some))))
        }
    })
    .map_ok(|pages| stream::iter(pages.into_iter().map(Ok::<PageRecord, WikiError>)))
    .try_flatten()
}

/// Main namespace pages followed by templates, both for the session's team.
pub fn team_page_stream<'a, A>(
    api: &'a A,
    session: &'a Session,
    team: &str,
) -> impl Stream<Item = std::result::Result<PageRecord, WikiError>> + 'a
where
    A: WikiApi + ?Sized,
{
    page_stream(api, session, ListQuery::team_pages(team))
        .chain(page_stream(api, session, ListQuery::team_templates(team)))
}

/// True for the team's home page, its subpages and its templates.
///
/// Listing prefixes match plain strings, so `Team:Foo` also lists
/// `Team:FooBar/...`; those titles belong to another team.
pub fn is_team_title(title: &str, team: &str) -> bool {
    let home = format!("Team:{team}");
    title == home
        || title.starts_with(&format!("{home}/"))
        || title.starts_with(&format!("Template:{team}/"))
}

/// Consumes the full listing. Titles seen twice are kept once, titles of
/// other teams are dropped.
pub async fn enumerate_pages<A>(
    api: &A,
    session: &Session,
    config: &TeamWikiConfig,
) -> Result<Vec<PageRecord>>
where
    A: WikiApi + ?Sized,
{
    let listed: Vec<PageRecord> = team_page_stream(api, session, &config.team_name)
        .try_collect()
        .await
        .map_err(|e| {
            error!(error = %e, team = %config.team_name, "Page enumeration failed");
            Error::Enumeration(e)
        })?;

    let mut seen = HashSet::new();
    let pages: Vec<PageRecord> = listed
        .into_iter()
        .filter(|page| {
            if !is_team_title(&page.title, &config.team_name) {
                debug!(title = %page.title, team = %config.team_name, "Skipping page of another team");
                return false;
            }
            seen.insert(page.title.clone())
        })
        .collect();
    info!(count = pages.len(), team = %config.team_name, "Enumerated team pages");
    Ok(pages)
}

/// Downloads every page of the team's wiki into `target_dir`.
pub async fn download_all<A>(
    api: &A,
    session: &Session,
    config: &TeamWikiConfig,
    target_dir: &Path,
    options: &BackupOptions,
) -> Result<Vec<DownloadResult>>
where
    A: WikiApi + ?Sized,
{
    if session.config() != config {
        return Err(Error::Config(format!(
            "session belongs to {} {}, not {} {}",
            session.config().team_name,
            session.config().year,
            config.team_name,
            config.year
        )));
    }

    let pages = enumerate_pages(api, session, config).await?;

    tokio::fs::create_dir_all(target_dir)
        .await
        .map_err(|source| Error::Io {
            path: target_dir.to_path_buf(),
            source,
        })?;

    let limit = options.effective_concurrency();
    info!(
        pages = pages.len(),
        concurrency = limit,
        target_dir = %target_dir.display(),
        "Starting backup"
    );

    let results: Vec<DownloadResult> = stream::iter(pages)
        .map(|page| download_page(api, session, target_dir, page))
        .buffer_unordered(limit)
        .collect()
        .await;

    let summary = summarise_downloads(&results);
    if summary.failed > 0 {
        warn!(saved = summary.saved, failed = summary.failed, "Backup finished with failures");
    } else {
        info!(saved = summary.saved, "Backup finished");
    }
    Ok(results)
}

async fn download_page<A>(
    api: &A,
    session: &Session,
    target_dir: &Path,
    page: PageRecord,
) -> DownloadResult
where
    A: WikiApi + ?Sized,
{
    let outcome = match api.read_page(session, &page.title).await {
        Ok(Some(revision)) => {
            let path = target_dir.join(page_file_name(&page.title));
            match tokio::fs::write(&path, revision.content.as_bytes()).await {
                Ok(()) => {
                    info!(title = %page.title, path = %path.display(), "Saved page");
                    DownloadOutcome::Saved { path }
                }
                Err(source) => {
                    error!(title = %page.title, path = %path.display(), error = %source, "Failed to write page");
                    DownloadOutcome::Failed(DownloadError::Write { path, source })
                }
            }
        }
        Ok(None) => {
            warn!(title = %page.title, "Listed page has disappeared");
            DownloadOutcome::Failed(DownloadError::Missing(page.title.clone()))
        }
        Err(source) => {
            error!(title = %page.title, error = %source, "Failed to fetch page");
            DownloadOutcome::Failed(DownloadError::Fetch {
                title: page.title.clone(),
                source,
            })
        }
    };
    DownloadResult { page, outcome }
}
