//! Loads the optional YAML config file and merges it with command-line flags.
//!
//! The file never holds secrets. Credentials are read from `IGEM_USERNAME`
//! and `IGEM_PASSWORD` (a `.env` file is loaded by `main`).
//!
//! ```yaml
//! team_name: Foo
//! year: 2017
//! api_url: https://2017.igem.org/wiki/api.php   # optional
//! timeout_secs: 30
//! backup:
//!   concurrency: 6
//! retry:
//!   max_attempts: 3
//!   initial_delay_ms: 500
//! ```

use anyhow::{anyhow, Result};
use chrono::Datelike;
use igemwiki_core::config::{BackupOptions, ClientConfig, Credentials, RetryConfig, TeamWikiConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const USERNAME_VAR: &str = "IGEM_USERNAME";
pub const PASSWORD_VAR: &str = "IGEM_PASSWORD";

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub team_name: Option<String>,
    pub year: Option<i32>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub backup: BackupOptions,
    pub retry: RetryConfig,
}

/// Everything a command needs once flags and file have been merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub team: TeamWikiConfig,
    pub client: ClientConfig,
    pub retry: RetryConfig,
    pub backup: BackupOptions,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    match serde_yaml::from_str::<Option<FileConfig>>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf.unwrap_or_default())
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Merges flags over the file. The year defaults to the current one.
pub fn resolve_settings(
    file: FileConfig,
    team: Option<String>,
    year: Option<i32>,
) -> Result<Settings> {
    let team_name = team
        .or(file.team_name)
        .ok_or_else(|| anyhow!("Must provide a team name, use -n or --team"))?;
    let year = year
        .or(file.year)
        .unwrap_or_else(|| chrono::Utc::now().year());
    let team = TeamWikiConfig::new(team_name, year)?;
    team.trace_loaded();
    file.retry.validate()?;

    let mut client = ClientConfig {
        api_url: file.api_url,
        ..ClientConfig::default()
    };
    if let Some(timeout_secs) = file.timeout_secs {
        client.timeout_secs = timeout_secs;
    }

    Ok(Settings {
        team,
        client,
        retry: file.retry,
        backup: file.backup,
    })
}

pub fn load_credentials() -> Result<Credentials> {
    match (env::var(USERNAME_VAR), env::var(PASSWORD_VAR)) {
        (Ok(username), Ok(password)) if !username.is_empty() => {
            info!(username = %username, "Loaded wiki credentials from environment");
            Ok(Credentials::new(username, password))
        }
        _ => {
            error!("{USERNAME_VAR} or {PASSWORD_VAR} missing in environment");
            Err(anyhow!(
                "Wiki credentials missing: set {USERNAME_VAR} and {PASSWORD_VAR}"
            ))
        }
    }
}
