//! Execution strategy selection.
//!
//! [`select`] is the single place where risk rating and caller intent turn
//! into a decision. The rules are ordered and the first one that applies wins:
//!
//! 1. A dry run never executes anything.
//! 2. Severity 4+ with a plain execute request is refused outright. Direct,
//!    unsandboxed execution of high-risk commands is not available even behind
//!    an explicit execute flag; the caller must opt into the sandbox.
//! 3. A sandbox request, or severity 3+, runs container-isolated when a
//!    container runtime is present, process-isolated otherwise.
//! 4. Everything else runs directly.
//!
//! Moderate-risk commands (`sudo`, `chmod`, ...) are therefore sandboxed
//! without the caller having to ask.

use serde::{Deserialize, Serialize};

use crate::risk::RiskAssessment;

/// Caller intent for one execution, supplied per invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionOptions {
    /// Run sandboxed regardless of the risk rating.
    pub force_sandbox: bool,
    /// The caller explicitly asked to execute (as opposed to preview).
    pub execute_requested: bool,
    /// Show, don't run.
    pub dry_run: bool,
}

/// Why an execution was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The caller asked for a dry run.
    DryRun,
    /// Severity 4+ needs an explicit sandbox opt-in before it may run.
    RequiresExplicitSandbox,
}

/// The execution path chosen for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Unsandboxed child process in the caller's working directory.
    Direct,
    /// Child process confined to a disposable working directory and
    /// environment.
    ProcessIsolated,
    /// Ephemeral, resource-capped container.
    ContainerIsolated,
    /// Nothing executes.
    Abort(AbortReason),
}

impl Strategy {
    /// Whether this strategy actually runs the command.
    pub fn executes(&self) -> bool {
        !matches!(self, Strategy::Abort(_))
    }

    /// Whether this strategy runs under an isolation tier.
    pub fn is_sandboxed(&self) -> bool {
        matches!(self, Strategy::ProcessIsolated | Strategy::ContainerIsolated)
    }
}

/// Map a risk assessment and caller options onto an execution strategy.
///
/// Pure function; `container_available` reflects the runtime probe done once
/// at manager construction.
pub fn select(
    risk: &RiskAssessment,
    opts: ExecutionOptions,
    container_available: bool,
) -> Strategy {
    if opts.dry_run {
        return Strategy::Abort(AbortReason::DryRun);
    }

    if opts.execute_requested && !opts.force_sandbox && risk.severity >= 4 {
        return Strategy::Abort(AbortReason::RequiresExplicitSandbox);
    }

    if opts.force_sandbox || risk.severity >= 3 {
        return if container_available {
            Strategy::ContainerIsolated
        } else {
            Strategy::ProcessIsolated
        };
    }

    Strategy::Direct
}
