//! Tests that spawn real child processes through `sh`.

use std::time::Duration;

use report_runner::config::RunnerConfig;
use report_runner::factory::ProcessFactory;
use report_runner::process::{
    ProcessError, ProcessEvent, ProcessOptions, ProcessState, SpawnError, SIGNAL_EXIT_CODE,
};
use tokio::sync::mpsc::UnboundedReceiver;

async fn collect(mut rx: UnboundedReceiver<ProcessEvent>) -> Vec<ProcessEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn factory() -> ProcessFactory {
    let mut config = RunnerConfig::default();
    config.process.terminate_timeout_ms = 500;
    ProcessFactory::from_config(config)
}

#[tokio::test]
async fn test_reports_and_stray_output_from_child() {
    let factory = factory();
    let mut process = factory
        .make(
            ProcessOptions::new(r#"printf 'Starting...\n<<<REPORT{"a":1}REPORT>>>\nEnded!\n'"#),
            None,
        )
        .unwrap();
    let events = tokio::spawn(collect(process.subscribe()));

    let summary = process.spawn().unwrap().wait().await.unwrap();
    let events = events.await.unwrap();

    assert_eq!(summary.state, ProcessState::Closed);
    assert_eq!(summary.exit_code, 0);
    assert_eq!(summary.reports, 1);
    assert_eq!(summary.chunks, ["Starting...", "Ended!"]);
    assert!(summary.is_success());

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].report().map(|r| r.value().clone()),
        Some(serde_json::json!({"a": 1}))
    );
    assert!(matches!(events[1], ProcessEvent::Closed { exit_code: 0, .. }));
}

#[tokio::test]
async fn test_report_split_across_writes() {
    let factory = factory();
    let mut process = factory
        .make(
            ProcessOptions::new(
                r#"printf '<<<REPORT{"n":'; sleep 0.1; printf '1}REPO'; sleep 0.1; printf 'RT>>>'"#,
            ),
            None,
        )
        .unwrap();
    let mut rx = process.subscribe();
    let summary = process.spawn().unwrap().wait().await.unwrap();

    assert_eq!(summary.reports, 1);
    assert!(summary.chunks.is_empty());
    let first = rx.recv().await.unwrap();
    assert_eq!(first.report().unwrap().value()["n"], 1);
}

#[tokio::test]
async fn test_non_zero_exit_inside_report_is_interrupted() {
    let factory = factory();
    let mut process = factory
        .make(
            ProcessOptions::new(r"printf 'Starting...\n<<<REPORT{\n'; printf 'Ended!'; exit 1"),
            None,
        )
        .unwrap();
    let events = tokio::spawn(collect(process.subscribe()));
    let handle = process.handle();

    let err = process.spawn().unwrap().wait().await.unwrap_err();
    assert!(
        matches!(err, ProcessError::Interrupted { exit_code: 1, ref message } if message == "Starting...\n<<<REPORT{\nEnded!"),
        "unexpected error: {err:?}"
    );
    assert_eq!(handle.state(), ProcessState::Errored);

    let events = events.await.unwrap();
    assert!(matches!(
        events.last(),
        Some(ProcessEvent::Errored { exit_code: Some(1), .. })
    ));
}

#[tokio::test]
async fn test_invalid_report_does_not_stop_reading() {
    let factory = factory();
    let mut process = factory
        .make(
            ProcessOptions::new(r"printf '<<<REPORT{nope}REPORT>>>\n<<<REPORT[1]REPORT>>>\nafter'"),
            None,
        )
        .unwrap();
    let events = tokio::spawn(collect(process.subscribe()));

    let summary = process.spawn().unwrap().wait().await.unwrap();
    let events = events.await.unwrap();

    assert_eq!(summary.state, ProcessState::Closed);
    assert_eq!(summary.invalid_reports, 1);
    assert_eq!(summary.reports, 1);
    assert_eq!(summary.chunks, ["{nope}", "after"]);
    assert!(matches!(events[0], ProcessEvent::InvalidReport { .. }));
    assert_eq!(
        events[1].report().map(|r| r.value().clone()),
        Some(serde_json::json!([1]))
    );
}

#[tokio::test]
async fn test_zero_exit_inside_report_closes() {
    let factory = factory();
    let process = factory
        .make(ProcessOptions::new(r"printf '<<<REPORT{'"), None)
        .unwrap();

    let summary = process.spawn().unwrap().wait().await.unwrap();
    assert_eq!(summary.state, ProcessState::Closed);
    assert_eq!(summary.chunks, ["<<<REPORT{"]);
}

#[tokio::test]
async fn test_exit_code_and_stderr_are_recorded() {
    let factory = factory();
    let process = factory
        .make(ProcessOptions::new("echo oops >&2; exit 3"), None)
        .unwrap();

    let summary = process.spawn().unwrap().wait().await.unwrap();
    assert_eq!(summary.exit_code, 3);
    assert_eq!(summary.state, ProcessState::Closed);
    assert_eq!(summary.chunks, ["oops\n"]);
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_arguments_are_escaped() {
    let factory = factory();
    let process = factory
        .make(
            ProcessOptions::new("printf '%s|%s'").args(["two words", "$HOME"]),
            None,
        )
        .unwrap();

    let summary = process.spawn().unwrap().wait().await.unwrap();
    assert_eq!(summary.chunks, ["two words|$HOME"]);
}

#[tokio::test]
async fn test_working_dir_and_env_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let factory = factory();
    let process = factory
        .make(
            ProcessOptions::new("printf '%s:%s' \"$BISCUIT\" \"$(basename \"$PWD\")\"")
                .working_dir(dir.path())
                .env("BISCUIT", "hobnob"),
            None,
        )
        .unwrap();

    let summary = process.spawn().unwrap().wait().await.unwrap();
    let expected = format!(
        "hobnob:{}",
        dir.path().file_name().unwrap().to_string_lossy()
    );
    assert_eq!(summary.chunks, [expected]);
}

#[tokio::test]
async fn test_cancel_terminates_child() {
    let factory = factory();
    let process = factory
        .make(ProcessOptions::new("exec sleep 30"), None)
        .unwrap();

    let running = process.spawn().unwrap();
    assert_eq!(running.handle().state(), ProcessState::Running);
    assert!(factory.pool().contains(running.id()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    factory.pool().cancel_all();

    let summary = tokio::time::timeout(Duration::from_secs(5), running.wait())
        .await
        .expect("cancelled process should exit promptly")
        .unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.exit_code, SIGNAL_EXIT_CODE);
    assert!(factory.pool().is_empty());
}

#[tokio::test]
async fn test_handle_waits_for_close() {
    let factory = factory();
    let process = factory.make(ProcessOptions::new("true"), None).unwrap();

    let running = process.spawn().unwrap();
    let handle = running.handle().clone();
    let state = handle.closed().await;

    assert_eq!(state, ProcessState::Closed);
    running.wait().await.unwrap();
    assert!(factory.pool().is_empty());
}

#[tokio::test]
async fn test_spawn_failure_marks_process_errored() {
    let factory = factory();
    let mut process = factory
        .make(
            ProcessOptions::new("true").working_dir("/nonexistent/report-runner-test"),
            None,
        )
        .unwrap();
    let mut rx = process.subscribe();
    let handle = process.handle();

    let err = process.spawn().unwrap_err();
    assert!(matches!(err, ProcessError::Spawn(SpawnError::NotFound(_))));
    assert_eq!(handle.state(), ProcessState::Errored);
    assert!(factory.pool().is_empty());
    assert!(matches!(
        rx.recv().await,
        Some(ProcessEvent::Errored { exit_code: None, .. })
    ));
}

#[tokio::test]
async fn test_spawn_twice_is_rejected() {
    let factory = factory();
    let mut process = factory.make(ProcessOptions::new("true"), None).unwrap();
    process.mark_running(None);

    assert!(matches!(
        process.spawn(),
        Err(ProcessError::AlreadyStarted)
    ));
}
