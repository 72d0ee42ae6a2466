//! Error taxonomy for sandbox operations.
//!
//! Only failures of the *backend machinery* are errors here. A command's
//! non-zero exit code and a run cut off by its deadline are both reported as
//! data in [`crate::ExecutionResult`]; neither ever surfaces as a
//! [`SandboxError`].

use std::io;

/// Errors produced while invoking or cleaning up an execution backend.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The requested isolation backend cannot be used right now. Recovered
    /// locally by falling back to the next-weaker backend.
    #[error("container runtime unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend itself could not be invoked (spawn failure, broken pipe).
    /// Distinct from the executed command failing, which is a normal result.
    #[error("failed to invoke execution backend: {0}")]
    BackendExecution(#[from] io::Error),

    /// A stray container or directory could not be removed. Swallowed by the
    /// cleanup pass; it never propagates to the caller.
    #[error("failed to remove sandbox '{name}': {reason}")]
    Cleanup { name: String, reason: String },
}

impl SandboxError {
    /// Whether the manager can recover by switching backends.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SandboxError::BackendUnavailable(_))
    }

    /// Error category for logging and programmatic handling.
    pub fn category(&self) -> &'static str {
        match self {
            SandboxError::BackendUnavailable(_) => "BACKEND",
            SandboxError::BackendExecution(_) => "IO",
            SandboxError::Cleanup { .. } => "CLEANUP",
        }
    }
}
