#![allow(unused)]

//! # contract: the seam between the sync engine and the wiki
//!
//! Every component of the engine talks to the wiki through the [`WikiApi`]
//! trait. The production implementation is
//! [`crate::client::MediaWikiClient`]; tests use the `mockall`-generated
//! `MockWikiApi`.
//!
//! ## Session
//! [`Session`] is the credential produced by a successful login. It is plain,
//! immutable data: concurrent tasks borrow it and attach its cookie header and
//! edit token to each request. Nothing mutates it after login.
//!
//! ## Error handling
//! Each call returns a [`WikiError`] for that single request. Callers decide
//! whether the failure is fatal (login, enumeration) or belongs to one item.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};

use crate::config::{Credentials, TeamWikiConfig};
use crate::error::WikiError;

/// Authenticated credential bound to one team wiki.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    config: TeamWikiConfig,
    username: String,
    cookie_header: String,
    edit_token: String,
}

impl Session {
    pub fn new(
        config: TeamWikiConfig,
        username: impl Into<String>,
        cookie_header: impl Into<String>,
        edit_token: impl Into<String>,
    ) -> Self {
        Self {
            config,
            username: username.into(),
            cookie_header: cookie_header.into(),
            edit_token: edit_token.into(),
        }
    }

    pub fn config(&self) -> &TeamWikiConfig {
        &self.config
    }

    pub fn team_name(&self) -> &str {
        &self.config.team_name
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> &str {
        &self.cookie_header
    }

    /// CSRF token required by edit and upload requests.
    pub fn edit_token(&self) -> &str {
        &self.edit_token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("username", &self.username)
            .field("cookie_header", &"<redacted>")
            .field("edit_token", &"<redacted>")
            .finish()
    }
}

/// Current content of a wiki page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRevision {
    pub title: String,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A page discovered while enumerating the team's pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl PageRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            last_modified: None,
        }
    }
}

/// Which pages to list: all titles in `namespace` starting with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub namespace: u32,
    pub prefix: String,
}

pub const MAIN_NAMESPACE: u32 = 0;
pub const TEMPLATE_NAMESPACE: u32 = 10;

impl ListQuery {
    /// Main namespace pages under `Team:<team>`.
    pub fn team_pages(team: &str) -> Self {
        Self {
            namespace: MAIN_NAMESPACE,
            prefix: format!("Team:{team}"),
        }
    }

    /// Templates (including stylesheets and scripts) under `Template:<team>`.
    pub fn team_templates(team: &str) -> Self {
        Self {
            namespace: TEMPLATE_NAMESPACE,
            prefix: team.to_string(),
        }
    }
}

/// One batch of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageListing {
    pub pages: Vec<PageRecord>,
    /// Continuation token for the next batch; `None` when the listing is complete.
    pub next: Option<String>,
}

/// Remote wiki operations used by the sync engine.
///
/// Implemented by real clients and by test mocks. All methods are async and
/// the trait is `Send + Sync` so one instance can serve concurrent tasks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WikiApi: Send + Sync {
    /// Performs one login attempt and returns the resulting session.
    async fn authenticate(
        &self,
        config: &TeamWikiConfig,
        credentials: &Credentials,
    ) -> Result<Session, WikiError>;

    /// Current wikitext of `title`, or `None` if the page does not exist.
    async fn read_page(
        &self,
        session: &Session,
        title: &str,
    ) -> Result<Option<RemoteRevision>, WikiError>;

    /// Current bytes of the file page `title` (`File:...`), or `None` if absent.
    async fn read_file(&self, session: &Session, title: &str)
        -> Result<Option<Vec<u8>>, WikiError>;

    /// Creates or replaces the wikitext of `title`.
    async fn write_page(&self, session: &Session, title: &str, text: &str)
        -> Result<(), WikiError>;

    /// Uploads `bytes` as `file_name`, replacing any existing version.
    async fn upload_file(
        &self,
        session: &Session,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), WikiError>;

    /// One batch of the listing described by `query`, starting at `continue_from`.
    async fn list_pages(
        &self,
        session: &Session,
        query: &ListQuery,
        continue_from: Option<String>,
    ) -> Result<PageListing, WikiError>;
}
