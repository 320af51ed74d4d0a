use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// First and last year accepted for a team wiki.
const FIRST_WIKI_YEAR: i32 = 2004;
const LAST_WIKI_YEAR: i32 = 2100;

/// Identifies the team namespace on a yearly wiki site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamWikiConfig {
    pub team_name: String,
    pub year: i32,
}

impl TeamWikiConfig {
    pub fn new(team_name: impl Into<String>, year: i32) -> Result<Self> {
        let config = Self {
            team_name: team_name.into(),
            year,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.team_name.trim().is_empty() {
            return Err(Error::Config("team name must not be empty".into()));
        }
        if !(FIRST_WIKI_YEAR..=LAST_WIKI_YEAR).contains(&self.year) {
            return Err(Error::Config(format!(
                "year {} is outside {FIRST_WIKI_YEAR}..={LAST_WIKI_YEAR}",
                self.year
            )));
        }
        Ok(())
    }

    /// MediaWiki action API endpoint of the year's wiki.
    pub fn default_api_url(&self) -> String {
        format!("https://{}.igem.org/wiki/api.php", self.year)
    }

    pub fn trace_loaded(&self) {
        info!(team = %self.team_name, year = self.year, "Loaded team wiki config");
    }
}

/// Wiki account used for login. The password is never printed.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Backoff policy for login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Rejects settings that cannot produce a usable backoff.
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "retry backoff_multiplier must be a finite number >= 1, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(Error::Config(format!(
                "retry max_delay_ms ({}) is below initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            )));
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// HTTP client settings for [`crate::client::MediaWikiClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Overrides the year's default `api.php` endpoint.
    pub api_url: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: 30,
            user_agent: concat!("igemwiki/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn api_url_for(&self, team: &TeamWikiConfig) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| team.default_api_url())
    }
}

pub const DEFAULT_BACKUP_CONCURRENCY: usize = 6;

/// Tuning for [`crate::download::download_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupOptions {
    /// Maximum number of page fetches in flight. Values below 1 are treated as 1.
    pub concurrency: usize,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BACKUP_CONCURRENCY,
        }
    }
}

impl BackupOptions {
    pub fn effective_concurrency(&self) -> usize {
        let limit = self.concurrency.max(1);
        debug!(requested = self.concurrency, limit, "Backup concurrency");
        limit
    }
}
