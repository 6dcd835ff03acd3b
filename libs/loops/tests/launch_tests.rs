#![cfg(unix)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use switchboard_loops::launch::{launch_with_params, GRACE_PERIOD};
use switchboard_loops::{launch, ErrorKind, LaunchConfig, LaunchOutcome};
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn sh(path: PathBuf) -> LaunchConfig {
    LaunchConfig::new(path).with_interpreter("sh")
}

#[tokio::test]
async fn natural_exit_reports_status() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "exit.sh", "exit 3\n");

    let outcome = launch(&sh(path).with_timeout(Duration::from_secs(10)))
        .await
        .unwrap();
    match outcome {
        LaunchOutcome::Exited(status) => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn arguments_reach_the_process() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("args.txt");
    let path = script(&dir, "args.sh", "printf '%s ' \"$@\" > \"$1\"\n");

    let config = sh(path)
        .with_arg(out.as_os_str())
        .with_params([("rows", Some(3)), ("skip", None::<u32>)])
        .with_timeout(Duration::from_secs(10));
    assert!(matches!(launch(&config).await.unwrap(), LaunchOutcome::Exited(_)));

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, format!("{} --rows 3 ", out.display()));
}

#[tokio::test]
async fn overrunning_process_is_terminated() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "sleep.sh", "exec sleep 30\n");

    let started = Instant::now();
    let outcome = launch(&sh(path).with_timeout(Duration::from_millis(200)))
        .await
        .unwrap();

    assert!(matches!(outcome, LaunchOutcome::Terminated(_)), "{:?}", outcome);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn process_ignoring_terminate_is_killed() {
    let dir = TempDir::new().unwrap();
    let path = script(
        &dir,
        "stubborn.sh",
        "trap '' TERM\nwhile true; do sleep 0.05; done\n",
    );

    let started = Instant::now();
    let outcome = launch(&sh(path).with_timeout(Duration::from_millis(200)))
        .await
        .unwrap();

    assert!(matches!(outcome, LaunchOutcome::Killed), "{:?}", outcome);
    assert!(started.elapsed() >= GRACE_PERIOD);
}

#[tokio::test]
async fn zero_timeout_detaches() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "quick.sh", "exit 0\n");

    let outcome = launch(&sh(path).with_timeout(Duration::ZERO)).await.unwrap();
    match outcome {
        LaunchOutcome::Detached { pid } => assert!(pid.is_some()),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn missing_program_fails_to_launch() {
    let config = LaunchConfig::new("/definitely/not/here").with_timeout(Duration::from_secs(1));
    let err = launch(&config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Launch);
}

#[tokio::test]
async fn script_launch_fails_cleanly_without_interpreter_script() {
    // python3 may be absent; either way a missing script must not hang
    let outcome = launch_with_params(
        "/definitely/not/here.py",
        [("seed", Some(1))],
        5556,
        Duration::from_secs(10),
    )
    .await;

    match outcome {
        Ok(LaunchOutcome::Exited(status)) => assert!(!status.success()),
        Err(err) => assert_eq!(err.kind(), ErrorKind::Launch),
        Ok(other) => panic!("unexpected outcome: {:?}", other),
    }
}
