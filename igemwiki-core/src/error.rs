//! Error types for igemwiki-core.
//!
//! Two layers:
//! - [`Error`] is returned as `Err` only for run-aborting failures (login, page
//!   enumeration, configuration, unsupported content types).
//! - [`TransferError`] and [`DownloadError`] are per-item failures. They are
//!   stored inside [`crate::upload::TransferResult`] and
//!   [`crate::download::DownloadResult`] and never abort sibling items.
//!
//! [`WikiError`] is what a [`crate::contract::WikiApi`] implementation returns
//! for a single remote call.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for run-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level (fatal) errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Login was rejected, or the wiki stayed unreachable after every retry.
    #[error("authentication failed for {username}: {source}")]
    Auth {
        username: String,
        #[source]
        source: WikiError,
    },

    /// The remote page listing could not be consumed to completion.
    #[error("failed to enumerate wiki pages: {0}")]
    Enumeration(#[source] WikiError),

    /// Content type name is not one of page, template, stylesheet, script, image.
    #[error("unsupported content type '{0}' (expected page, template, stylesheet, script or image)")]
    UnsupportedType(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single remote wiki call.
#[derive(Debug, Error)]
pub enum WikiError {
    /// Request never produced a response (DNS, connect, timeout, body decode).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The MediaWiki API answered with an `error` object.
    #[error("wiki API error {code}: {info}")]
    Api { code: String, info: String },

    /// Credentials were refused by the login endpoint.
    #[error("login rejected: {0}")]
    Rejected(String),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for WikiError {
    fn from(e: serde_json::Error) -> Self {
        WikiError::Malformed(e.to_string())
    }
}

/// Per-item upload failure, recorded as `Failed` in the item's result.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid destination '{dest}': {reason}")]
    InvalidDestination { dest: String, reason: String },

    #[error("cannot read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read current content of {title}: {source}")]
    RemoteRead {
        title: String,
        #[source]
        source: WikiError,
    },

    #[error("wiki rejected write to {title}: {source}")]
    RemoteWrite {
        title: String,
        #[source]
        source: WikiError,
    },
}

/// Per-page backup failure, recorded as `Failed` in the page's result.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("page {0} no longer exists")]
    Missing(String),

    #[error("failed to fetch {title}: {source}")]
    Fetch {
        title: String,
        #[source]
        source: WikiError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
