//! Subprocess spawning shared by both supervisors

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::time::Interval;

/// Shortest poll period a monitor will use
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn `program` with stdout and stderr appended to `log_path`.
///
/// The child is killed if its handle is dropped.
pub(crate) fn spawn_logged(program: &str, args: &[String], log_path: &Path) -> Result<Child> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log dir {:?}", parent))?;
    }

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;
    let log_err = log
        .try_clone()
        .with_context(|| format!("Failed to clone log handle {:?}", log_path))?;

    tracing::debug!("Spawning {} {:?} (log: {:?})", program, args, log_path);

    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))
}

/// Ticker for a monitor loop; a zero period is raised to the minimum
pub(crate) fn poll_ticker(period: Duration) -> Interval {
    tokio::time::interval(period.max(MIN_POLL_INTERVAL))
}

/// Kill a child and reap it
pub(crate) async fn terminate(mut child: Child, name: &str) {
    if let Err(e) = child.start_kill() {
        // Already exited
        tracing::debug!("{} kill: {}", name, e);
    }
    match child.wait().await {
        Ok(status) => tracing::debug!("{} exited with {}", name, status),
        Err(e) => tracing::warn!("Failed to reap {}: {}", name, e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_spawn_logged_appends_output() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log").join("out.log");

        let mut child = spawn_logged("sh", &["-c".to_string(), "echo hello".to_string()], &log)
            .unwrap();
        assert!(child.wait().await.unwrap().success());

        let mut child = spawn_logged("sh", &["-c".to_string(), "echo again >&2".to_string()], &log)
            .unwrap();
        assert!(child.wait().await.unwrap().success());

        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "hello\nagain\n");
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("out.log");
        assert!(spawn_logged("/nonexistent/drc-binary", &[], &log).is_err());
    }

    #[tokio::test]
    async fn test_zero_poll_interval_ticks() {
        let mut ticker = poll_ticker(Duration::ZERO);
        assert_eq!(ticker.period(), MIN_POLL_INTERVAL);
        ticker.tick().await;
        ticker.tick().await;
    }

    #[tokio::test]
    async fn test_terminate_long_running_child() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("out.log");
        let child = spawn_logged("sleep", &["30".to_string()], &log).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), terminate(child, "sleep"))
            .await
            .unwrap();
    }
}
