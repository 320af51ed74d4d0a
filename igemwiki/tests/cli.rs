use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::tempdir;

fn igemwiki() -> Command {
    let mut cmd = Command::cargo_bin("igemwiki").expect("Binary exists");
    cmd.env_remove("IGEM_USERNAME")
        .env_remove("IGEM_PASSWORD")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn help_lists_all_subcommands() {
    igemwiki()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("backup")
                .and(predicate::str::contains("upload"))
                .and(predicate::str::contains("upload-glob")),
        );
}

#[test]
fn missing_team_name_fails() {
    let dir = tempdir().unwrap();
    igemwiki()
        .current_dir(dir.path())
        .args(["backup", "--dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("team name"));
}

#[test]
fn missing_credentials_fail_before_login() {
    let dir = tempdir().unwrap();
    igemwiki()
        .current_dir(dir.path())
        .args(["-n", "Foo", "-y", "2017", "backup", "--dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IGEM_USERNAME"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn unsupported_type_fails_before_login() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    write(&source, "hello").unwrap();

    // The API URL points at a closed port: reaching login would be a different error.
    let config = dir.path().join("igemwiki.yaml");
    write(&config, "team_name: Foo\nyear: 2017\napi_url: http://127.0.0.1:9/api.php\n").unwrap();

    igemwiki()
        .current_dir(dir.path())
        .env("IGEM_USERNAME", "alice")
        .env("IGEM_PASSWORD", "hunter2")
        .arg("--config")
        .arg(&config)
        .args(["upload", "-s"])
        .arg(&source)
        .args(["-t", "video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported content type 'video'"));
}

#[test]
fn empty_glob_uploads_nothing() {
    let dir = tempdir().unwrap();
    let pattern = format!("{}/*.html", dir.path().display());

    igemwiki()
        .current_dir(dir.path())
        .env("IGEM_USERNAME", "alice")
        .env("IGEM_PASSWORD", "hunter2")
        .args(["-n", "Foo", "-y", "2017", "upload-glob", "-t", "page", "-g"])
        .arg(&pattern)
        .assert()
        .success()
        .stdout(predicate::str::contains("No files matched"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use igemwiki::cli::{run, Cli, Commands};

    // No team name: run fails right after the first event.
    let cli = Cli {
        team: None,
        year: None,
        config: None,
        command: Commands::Backup {
            dir: std::path::PathBuf::from("unused"),
            concurrency: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
