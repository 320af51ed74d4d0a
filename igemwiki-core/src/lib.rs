#![doc = "igemwiki-core: wiki content synchronisation engine for iGEM team wikis."]

//! This crate holds the session lifecycle, the typed upload pipeline and the
//! backup downloader. Argument parsing, glob expansion and console output live
//! in the `igemwiki` binary crate.
//!
//! # Modules
//! - [`session`]: login with bounded retry, producing a [`contract::Session`]
//! - [`content`]: content kinds, destination names and wiki titles
//! - [`upload`]: single uploads and serialised batch uploads
//! - [`download`]: paginated enumeration and concurrent page backup
//! - [`contract`]: the [`contract::WikiApi`] seam (mockable)
//! - [`client`]: [`client::MediaWikiClient`], the HTTP implementation

pub mod client;
pub mod config;
pub mod content;
pub mod contract;
pub mod download;
pub mod error;
pub mod retry;
pub mod session;
pub mod upload;

pub use client::MediaWikiClient;
pub use config::{BackupOptions, ClientConfig, Credentials, RetryConfig, TeamWikiConfig};
pub use content::{resolve_dest, wiki_title, ContentItem, ContentKind};
pub use contract::{PageRecord, Session, WikiApi};
pub use download::{download_all, DownloadOutcome, DownloadResult};
pub use error::{Error, Result};
pub use session::login;
pub use upload::{upload, upload_all, TransferOutcome, TransferResult};
