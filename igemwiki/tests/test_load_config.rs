use igemwiki::load_config::{
    load_config, load_credentials, resolve_settings, FileConfig, PASSWORD_VAR, USERNAME_VAR,
};
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[test]
fn full_config_file_is_loaded() {
    let file = config_file(
        r#"
team_name: Foo
year: 2017
api_url: http://localhost:8080/api.php
timeout_secs: 5
backup:
  concurrency: 2
retry:
  max_attempts: 5
"#,
    );

    let config = load_config(file.path()).expect("Config should load");
    assert_eq!(config.team_name.as_deref(), Some("Foo"));
    assert_eq!(config.year, Some(2017));
    assert_eq!(config.backup.concurrency, 2);
    assert_eq!(config.retry.max_attempts, 5);
    // Unset retry keys keep their defaults.
    assert_eq!(config.retry.initial_delay_ms, 500);

    let settings = resolve_settings(config, None, None).unwrap();
    assert_eq!(settings.team.team_name, "Foo");
    assert_eq!(settings.client.api_url.as_deref(), Some("http://localhost:8080/api.php"));
    assert_eq!(settings.client.timeout_secs, 5);
}

#[test]
fn empty_config_file_uses_defaults() {
    let file = config_file("");
    let config = load_config(file.path()).expect("Empty config should load");
    assert!(config.team_name.is_none());
    assert_eq!(config.backup.concurrency, 6);
}

#[test]
fn unknown_keys_are_rejected() {
    let file = config_file("team: Foo\n");
    assert!(load_config(file.path()).is_err());
}

#[test]
fn missing_file_is_an_error() {
    assert!(load_config("/nonexistent/igemwiki.yaml").is_err());
}

#[test]
fn flags_override_file_values() {
    let file = FileConfig {
        team_name: Some("Foo".into()),
        year: Some(2017),
        ..FileConfig::default()
    };
    let settings = resolve_settings(file, Some("Bar".into()), Some(2018)).unwrap();
    assert_eq!(settings.team.team_name, "Bar");
    assert_eq!(settings.team.year, 2018);
    assert_eq!(
        settings.client.api_url_for(&settings.team),
        "https://2018.igem.org/wiki/api.php"
    );
}

#[test]
fn year_outside_range_is_rejected() {
    let result = resolve_settings(FileConfig::default(), Some("Foo".into()), Some(1999));
    assert!(result.is_err());
}

#[test]
fn year_defaults_to_current_year() {
    use chrono::Datelike;
    let settings = resolve_settings(FileConfig::default(), Some("Foo".into()), None).unwrap();
    assert_eq!(settings.team.year, chrono::Utc::now().year());
}

#[test]
fn negative_backoff_multiplier_is_rejected() {
    let file = config_file("team_name: Foo\nyear: 2017\nretry:\n  backoff_multiplier: -1\n");
    let config = load_config(file.path()).expect("YAML itself is valid");

    let err = resolve_settings(config, None, None).unwrap_err();
    assert!(err.to_string().contains("backoff_multiplier"), "got: {err}");
}

#[test]
fn max_delay_below_initial_delay_is_rejected() {
    let file = config_file(
        "team_name: Foo\nyear: 2017\nretry:\n  initial_delay_ms: 1000\n  max_delay_ms: 10\n",
    );
    let config = load_config(file.path()).unwrap();
    assert!(resolve_settings(config, None, None).is_err());
}

#[test]
#[serial]
fn credentials_come_from_environment() {
    env::set_var(USERNAME_VAR, "alice");
    env::set_var(PASSWORD_VAR, "hunter2");

    let credentials = load_credentials().expect("credentials present");
    assert_eq!(credentials.username, "alice");
    assert_eq!(credentials.password, "hunter2");
    assert!(!format!("{credentials:?}").contains("hunter2"));

    env::remove_var(USERNAME_VAR);
    env::remove_var(PASSWORD_VAR);
}

#[test]
#[serial]
fn missing_credentials_are_an_error() {
    env::remove_var(USERNAME_VAR);
    env::remove_var(PASSWORD_VAR);
    assert!(load_credentials().is_err());
}
