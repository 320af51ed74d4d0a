use igemwiki_core::config::{Credentials, RetryConfig, TeamWikiConfig};
use igemwiki_core::contract::{MockWikiApi, Session};
use igemwiki_core::error::{Error, WikiError};
use igemwiki_core::login;

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 1,
        max_delay_ms: 2,
        backoff_multiplier: 2.0,
    }
}

fn credentials() -> Credentials {
    Credentials::new("alice", "hunter2")
}

fn config() -> TeamWikiConfig {
    TeamWikiConfig::new("Foo", 2017).unwrap()
}

#[tokio::test]
async fn rejected_login_is_not_retried() {
    let mut api = MockWikiApi::new();
    api.expect_authenticate()
        .times(1)
        .returning(|_, _| Err(WikiError::Rejected("WrongPass".into())));

    let result = login(&api, &config(), &credentials(), &fast_retry()).await;

    match result {
        Err(Error::Auth { username, source }) => {
            assert_eq!(username, "alice");
            assert!(matches!(source, WikiError::Rejected(_)));
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn unavailable_wiki_is_retried_until_attempts_run_out() {
    let mut api = MockWikiApi::new();
    api.expect_authenticate().times(3).returning(|_, _| {
        Err(WikiError::Status {
            status: 503,
            url: "http://wiki/api.php".into(),
        })
    });

    let result = login(&api, &config(), &credentials(), &fast_retry()).await;
    assert!(matches!(result, Err(Error::Auth { .. })));
}

#[tokio::test]
async fn login_recovers_after_transient_failure() {
    let mut api = MockWikiApi::new();
    let mut seq = mockall::Sequence::new();
    api.expect_authenticate()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| {
            Err(WikiError::Api {
                code: "maxlag".into(),
                info: "Waiting for replicas".into(),
            })
        });
    api.expect_authenticate()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|config, credentials| {
            Ok(Session::new(
                config.clone(),
                credentials.username.clone(),
                "wiki_session=abc",
                "token+\\",
            ))
        });

    let session = login(&api, &config(), &credentials(), &fast_retry())
        .await
        .expect("second attempt succeeds");
    assert_eq!(session.username(), "alice");
    assert_eq!(session.team_name(), "Foo");
    assert_eq!(session.edit_token(), "token+\\");
}

#[tokio::test]
async fn invalid_config_fails_before_contacting_the_wiki() {
    let api = MockWikiApi::new();
    let config = TeamWikiConfig {
        team_name: String::new(),
        year: 2017,
    };

    let result = login(&api, &config, &credentials(), &fast_retry()).await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn session_debug_output_hides_secrets() {
    let session = Session::new(config(), "alice", "wiki_session=abc", "token+\\");
    let debug = format!("{session:?}");
    assert!(debug.contains("alice"));
    assert!(!debug.contains("wiki_session=abc"));
    assert!(!debug.contains("token+"));
}
