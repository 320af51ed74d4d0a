//! Transfer Pipeline and Batch Upload Orchestrator.
//!
//! [`upload`] performs one create-or-update of a [`ContentItem`]:
//! 1. validate the destination (no network call when invalid),
//! 2. read the local source,
//! 3. unless `force` is set, compare with the wiki's current content and skip
//!    the write when both digests match,
//! 4. write the page, or upload the file for images.
//!
//! [`upload_all`] runs the pipeline over a batch with exactly one upload in
//! flight. Every item is attempted; failures are recorded in that item's
//! [`TransferResult`] and the output keeps the input order.

use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::io;
use tracing::{error, info, warn};

use crate::content::{self, ContentItem};
use crate::contract::{Session, WikiApi};
use crate::error::{TransferError, WikiError};

/// Wiki edits are serialised: one in-flight upload at a time.
pub const UPLOAD_CONCURRENCY: usize = 1;

#[derive(Debug)]
pub enum TransferOutcome {
    /// Content was written. `digest` is the SHA-256 of what was sent.
    Uploaded { digest: String },
    /// The wiki already held identical content; nothing was written.
    Skipped { digest: String },
    Failed(TransferError),
}

#[derive(Debug)]
pub struct TransferResult {
    pub item: ContentItem,
    /// Full wiki title the item maps to.
    pub title: String,
    pub outcome: TransferOutcome,
}

impl TransferResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Skipped { .. })
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Uploaded { .. })
    }
}

/// Counts of a batch's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TransferSummary {
    pub fn total(&self) -> usize {
        self.uploaded + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

pub fn summarise_transfers(results: &[TransferResult]) -> TransferSummary {
    results
        .iter()
        .fold(TransferSummary::default(), |mut summary, result| {
            match result.outcome {
                TransferOutcome::Uploaded { .. } => summary.uploaded += 1,
                TransferOutcome::Skipped { .. } => summary.skipped += 1,
                TransferOutcome::Failed(_) => summary.failed += 1,
            }
            summary
        })
}

/// Local content prepared for the wiki.
enum Payload {
    Text(String),
    File(Vec<u8>),
}

impl Payload {
    /// MediaWiki drops trailing whitespace when saving, so text is compared without it.
    fn comparable(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.trim_end().as_bytes(),
            Payload::File(bytes) => bytes,
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Uploads one item. Never returns an error: failures end up in the result.
pub async fn upload<A>(api: &A, session: &Session, item: ContentItem) -> TransferResult
where
    A: WikiApi + ?Sized,
{
    let title = item.title(session.team_name());
    let outcome = transfer(api, session, &item, &title).await;
    match &outcome {
        TransferOutcome::Uploaded { digest } => {
            info!(title = %title, source = %item.source.display(), digest = %digest, "Uploaded")
        }
        TransferOutcome::Skipped { .. } => {
            info!(title = %title, source = %item.source.display(), "Unchanged, skipped")
        }
        TransferOutcome::Failed(e) => {
            error!(title = %title, source = %item.source.display(), error = %e, "Upload failed")
        }
    }
    TransferResult {
        item,
        title,
        outcome,
    }
}

async fn transfer<A>(api: &A, session: &Session, item: &ContentItem, title: &str) -> TransferOutcome
where
    A: WikiApi + ?Sized,
{
    if let Err(reason) = content::validate_dest(item.kind, &item.dest) {
        return TransferOutcome::Failed(TransferError::InvalidDestination {
            dest: item.dest.clone(),
            reason,
        });
    }

    let payload = match read_source(item).await {
        Ok(payload) => payload,
        Err(source) => {
            return TransferOutcome::Failed(TransferError::SourceRead {
                path: item.source.clone(),
                source,
            })
        }
    };
    let digest = sha256_hex(payload.comparable());

    if !item.force {
        match read_remote(api, session, item, title).await {
            Ok(Some(remote)) if sha256_hex(&remote) == digest => {
                return TransferOutcome::Skipped { digest };
            }
            Ok(_) => {}
            Err(source) => {
                return TransferOutcome::Failed(TransferError::RemoteRead {
                    title: title.to_string(),
                    source,
                })
            }
        }
    }

    let written = match payload {
        Payload::Text(text) => api.write_page(session, title, &text).await,
        Payload::File(bytes) => {
            let name = content::file_name(session.team_name(), &item.dest);
            api.upload_file(session, &name, bytes).await
        }
    };
    match written {
        Ok(()) => TransferOutcome::Uploaded { digest },
        Err(source) => TransferOutcome::Failed(TransferError::RemoteWrite {
            title: title.to_string(),
            source,
        }),
    }
}

async fn read_source(item: &ContentItem) -> io::Result<Payload> {
    let bytes = tokio::fs::read(&item.source).await?;
    if item.kind.is_file() {
        return Ok(Payload::File(bytes));
    }
    String::from_utf8(bytes)
        .map(Payload::Text)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Current remote content in the same normalised form as [`Payload::comparable`].
async fn read_remote<A>(
    api: &A,
    session: &Session,
    item: &ContentItem,
    title: &str,
) -> Result<Option<Vec<u8>>, WikiError>
where
    A: WikiApi + ?Sized,
{
    if item.kind.is_file() {
        return api.read_file(session, title).await;
    }
    let revision = api.read_page(session, title).await?;
    Ok(revision.map(|rev| rev.content.trim_end().as_bytes().to_vec()))
}

/// Uploads every item in order, one at a time, and returns one result per item.
pub async fn upload_all<A>(api: &A, session: &Session, items: Vec<ContentItem>) -> Vec<TransferResult>
where
    A: WikiApi + ?Sized,
{
    info!(
        count = items.len(),
        team = %session.team_name(),
        "Starting batch upload"
    );

    let results: Vec<TransferResult> = stream::iter(items)
        .map(|item| upload(api, session, item))
        .buffered(UPLOAD_CONCURRENCY)
        .collect()
        .await;

    let summary = summarise_transfers(&results);
    if summary.has_failures() {
        warn!(
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch upload finished with failures"
        );
    } else {
        info!(
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            "Batch upload finished"
        );
    }
    results
}
