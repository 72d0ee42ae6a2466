//! Execution results.
//!
//! Backends report a [`CommandOutput`]; the manager wraps it into an
//! [`ExecutionResult`] together with the classification and the backend that
//! actually ran. A non-zero exit code is a normal, faithfully reported result
//! of running the command, never an error of this crate.

use serde::{Deserialize, Serialize};

use crate::{risk::RiskAssessment, strategy::Strategy};

/// Error text reported when a run hits its deadline.
pub const TIMEOUT_MESSAGE: &str = "execution exceeded time budget";

/// What one backend run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// The command's own exit code; -1 when it was terminated by the deadline.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// True iff the deadline expired and the run was forcibly terminated.
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Output for a run that was cut off at the deadline.
    pub fn deadline_expired(duration_ms: u64) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: TIMEOUT_MESSAGE.to_string(),
            timed_out: true,
            duration_ms,
        }
    }

    /// Output for a path where nothing executed (dry run, refusal).
    pub fn skipped(exit_code: i32, stderr: String) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr,
            timed_out: false,
            duration_ms: 0,
        }
    }
}

/// The complete, immutable outcome of one `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The command text as received, untouched.
    pub command: String,
    /// How the command was classified before execution.
    pub risk: RiskAssessment,
    /// The backend that actually ran (or the abort), after any fallback.
    pub backend_used: Strategy,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub(crate) fn assemble(
        command: &str,
        risk: RiskAssessment,
        backend_used: Strategy,
        output: CommandOutput,
    ) -> Self {
        Self {
            command: command.to_string(),
            risk,
            backend_used,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            timed_out: output.timed_out,
            duration_ms: output.duration_ms,
        }
    }

    /// Whether the command ran to completion and reported success.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out && self.backend_used.executes()
    }

    /// Stdout and stderr merged, for callers that want a single stream.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}
