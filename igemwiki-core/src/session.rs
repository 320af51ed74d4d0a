//! Session Manager: turns credentials into a reusable [`Session`].

use tracing::{error, info};

use crate::config::{Credentials, RetryConfig, TeamWikiConfig};
use crate::contract::{Session, WikiApi};
use crate::error::{Error, Result};
use crate::retry::with_retry;

/// Logs in to the team's wiki.
///
/// Transient failures are retried according to `retry`; a rejected login
/// fails on the first attempt. Either way the caller gets [`Error::Auth`] and
/// no transfer may be attempted.
pub async fn login<A>(
    api: &A,
    config: &TeamWikiConfig,
    credentials: &Credentials,
    retry: &RetryConfig,
) -> Result<Session>
where
    A: WikiApi + ?Sized,
{
    config.validate()?;
    info!(
        team = %config.team_name,
        year = config.year,
        username = %credentials.username,
        "Logging in to team wiki"
    );

    match with_retry(retry, || api.authenticate(config, credentials)).await {
        Ok(session) => {
            info!(username = %session.username(), "Login succeeded");
            Ok(session)
        }
        Err(source) => {
            error!(error = %source, username = %credentials.username, "Login failed");
            Err(Error::Auth {
                username: credentials.username.clone(),
                source,
            })
        }
    }
}
