use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{MontageError, Result};

/// Outcome of one external process invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run an external command with a wall-clock timeout.
///
/// Both streams are captured fully. A non-zero exit is reported as
/// `success = false` with the captured stderr; it is not an `Err`. Hitting
/// the timeout is an `Err(MontageError::Timeout)` so callers can tell a
/// stuck renderer apart from one that ran and failed. The child is spawned
/// with `kill_on_drop`, so abandoning the wait (timeout or caller
/// cancellation) terminates the process rather than orphaning it.
pub async fn run(program: &str, args: &[String], timeout: Duration) -> Result<ExecutionResult> {
    debug!("Running: {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MontageError::Transform(format!("Failed to spawn {}: {}", program, e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => {
            result.map_err(|e| MontageError::Transform(format!("Failed to run {}: {}", program, e)))?
        }
        Err(_) => {
            // Dropping the wait future kills the child via kill_on_drop.
            error!("{} timed out after {}s", program, timeout.as_secs());
            return Err(MontageError::Timeout(timeout.as_secs()));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    if !success {
        error!("{} failed: {}", program, truncate(&stderr, 500));
    }

    Ok(ExecutionResult {
        success,
        stdout,
        stderr,
    })
}

/// Truncate diagnostic text for log lines. The full text is always kept in
/// the returned `ExecutionResult`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let result = run(
            "echo",
            &["hello".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure_not_error() {
        let result = run(
            "sh",
            &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(!result.success);
        assert!(result.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_and_kills_process() {
        let marker = format!("montage-test-{}", std::process::id());
        let result = run(
            "sh",
            &["-c".to_string(), format!("sleep 30 # {}", marker)],
            Duration::from_millis(200),
        )
        .await;

        assert!(matches!(result, Err(MontageError::Timeout(_))));

        // Give the kill a moment, then verify nothing is left running.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let ps = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("ps ax | grep '{}' | grep -v grep | wc -l", marker))
            .output()
            .unwrap();
        let count: u32 = String::from_utf8_lossy(&ps.stdout).trim().parse().unwrap();
        assert_eq!(count, 0, "timed-out process should not survive");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_transform_error() {
        let result = run("definitely-not-a-binary", &[], Duration::from_secs(1)).await;
        assert!(matches!(result, Err(MontageError::Transform(_))));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789abc", 10), "0123456789...");
    }
}
