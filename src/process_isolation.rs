//! Process-isolated execution.
//!
//! The middle isolation tier: the command runs as an ordinary child process,
//! but confined to a freshly created temporary directory. `HOME` and `TMPDIR`
//! are overridden to point inside it and the working directory is set there,
//! so stray writes land in a disposable location instead of the real user
//! home. There is no namespace or container boundary at this tier.
//!
//! The scratch directory is owned by a [`tempfile::TempDir`] whose drop
//! removes it on every exit path, including timeout and spawn failure.

use std::{
    process::Stdio,
    time::{Duration, Instant},
};

use tempfile::TempDir;
use tokio::{
    process::{Child, Command},
    time::timeout,
};
use tracing::debug;

use crate::{error::SandboxError, outcome::CommandOutput};

/// Wait for a spawned shell child under a wall-clock deadline and fold the
/// outcome into a [`CommandOutput`]. Shared by the direct and
/// process-isolated tiers, which differ only in how the child is set up.
///
/// `start` is taken at spawn time so the reported duration covers the whole
/// run.
pub(crate) async fn wait_with_deadline(
    child: Child,
    start: Instant,
    deadline: Duration,
) -> Result<CommandOutput, SandboxError> {
    match timeout(deadline, child.wait_with_output()).await {
        Ok(waited) => {
            let raw = waited?;
            Ok(CommandOutput {
                exit_code: raw.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&raw.stdout).to_string(),
                stderr: String::from_utf8_lossy(&raw.stderr).to_string(),
                timed_out: false,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Err(_) => Ok(CommandOutput::deadline_expired(
            start.elapsed().as_millis() as u64,
        )),
    }
}

/// Runs commands in a throwaway working directory with a scrubbed environment.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    shell: String,
}

impl ProcessBackend {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Execute `command` through the shell with a hard wall-clock deadline.
    ///
    /// On deadline expiry the child is forcibly killed and the output reports
    /// `timed_out = true` with exit code -1. The command's own non-zero exit
    /// code is a normal result, not an error; `Err` means the backend itself
    /// could not run (scratch dir creation or spawn failed).
    pub async fn run(
        &self,
        command: &str,
        deadline: Duration,
    ) -> Result<CommandOutput, SandboxError> {
        let scratch = TempDir::new()?;
        debug!(scratch = %scratch.path().display(), "spawning process-isolated command");

        let start = Instant::now();
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(scratch.path())
            .env("HOME", scratch.path())
            .env("TMPDIR", scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future at the deadline must take the child
            // down with it.
            .kill_on_drop(true)
            .spawn()?;

        let output = wait_with_deadline(child, start, deadline).await?;

        // `scratch` drops here, removing the directory and its contents.
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::init_test_logging;

    #[tokio::test]
    async fn reports_real_exit_code_as_data() {
        init_test_logging();
        let backend = ProcessBackend::new("/bin/sh");
        let output = backend
            .run("exit 7", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 7);
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn home_points_into_the_scratch_directory() {
        init_test_logging();
        let backend = ProcessBackend::new("/bin/sh");
        let output = backend
            .run("test \"$HOME\" = \"$(pwd)\" && test \"$TMPDIR\" = \"$HOME\"", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0, "stderr: {}", output.stderr);
    }

    #[tokio::test]
    async fn captures_streams_separately() {
        init_test_logging();
        let backend = ProcessBackend::new("/bin/sh");
        let output = backend
            .run("echo out; echo err >&2", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }
}
