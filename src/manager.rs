//! Orchestration: classify, select, execute, clean up.
//!
//! [`SandboxManager`] is the public entry point. It owns the backends, probes
//! the container runtime exactly once at construction (availability is an
//! explicit `Option`, not re-checked ad hoc at call sites), and keeps a
//! registry of container names currently in flight so that a concurrent
//! [`SandboxManager::cleanup`] pass never removes a container that a live
//! `execute` still owns.

use std::{
    collections::HashSet,
    process::Stdio,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{process::Command, sync::Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::SandboxConfig,
    container::ContainerBackend,
    error::SandboxError,
    outcome::{CommandOutput, ExecutionResult},
    process_isolation::{self, ProcessBackend},
    risk::{self, RiskAssessment},
    strategy::{self, AbortReason, ExecutionOptions, Strategy},
};

/// Tally of a cleanup pass. Cleanup is best-effort and never fails; this is
/// the observable record of what it did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// The sandbox engine: one instance per embedding application.
pub struct SandboxManager {
    config: SandboxConfig,
    process_backend: ProcessBackend,
    container: Option<ContainerBackend>,
    /// Container names owned by in-flight `execute` calls.
    active: Arc<Mutex<HashSet<String>>>,
}

impl SandboxManager {
    /// Build a manager, probing the container runtime once. When the probe
    /// fails the container tier is disabled for the manager's lifetime and
    /// sandboxed runs use process isolation.
    pub async fn new(config: SandboxConfig) -> Self {
        let container = match ContainerBackend::probe().await {
            Ok(()) => Some(ContainerBackend::new(&config)),
            Err(e) => {
                warn!("container backend disabled: {e}");
                None
            }
        };
        Self::with_backends(config, container)
    }

    /// Build a manager with an explicit container backend (or none). This is
    /// the injection seam `new` goes through after probing.
    pub fn with_backends(config: SandboxConfig, container: Option<ContainerBackend>) -> Self {
        let process_backend = ProcessBackend::new(config.shell.clone());
        Self {
            config,
            process_backend,
            container,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn container_available(&self) -> bool {
        self.container.is_some()
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Classify without executing, e.g. to warn the user before asking for
    /// consent.
    pub fn classify(&self, command: &str) -> RiskAssessment {
        risk::classify(command)
    }

    /// Run one command under the strategy its risk rating and `options` call
    /// for. Exactly one backend executes it; an aborted strategy executes
    /// nothing and still returns a result.
    pub async fn execute(
        &self,
        command: &str,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, SandboxError> {
        let risk = risk::classify(command);
        let chosen = strategy::select(&risk, options, self.container.is_some());
        debug!(
            severity = risk.severity,
            strategy = ?chosen,
            "dispatching command"
        );

        let deadline = self.config.deadline();
        let (backend_used, output) = match chosen {
            Strategy::Abort(reason) => (chosen, Self::abort_output(reason, &risk)),
            Strategy::Direct => (chosen, self.run_direct(command, deadline).await?),
            Strategy::ProcessIsolated => {
                (chosen, self.process_backend.run(command, deadline).await?)
            }
            Strategy::ContainerIsolated => self.run_container(command, deadline).await?,
        };

        if output.timed_out {
            info!(strategy = ?backend_used, "command exceeded its deadline");
        }
        Ok(ExecutionResult::assemble(command, risk, backend_used, output))
    }

    /// Remove stray containers left behind by earlier crashed runs.
    ///
    /// Scoped by name prefix, regardless of which process created them, and
    /// filtered against the in-flight registry so live runs are untouched.
    /// Failures are counted and logged, never propagated: cleanup runs
    /// opportunistically and must not crash the caller.
    pub async fn cleanup(&self) -> CleanupReport {
        let Some(container) = &self.container else {
            return CleanupReport::default();
        };

        let names = match container.list_by_prefix().await {
            Ok(names) => names,
            Err(e) => {
                warn!("cleanup: could not list containers: {e}");
                return CleanupReport::default();
            }
        };

        let active = self.active.lock().await.clone();
        let mut report = CleanupReport::default();
        for name in names {
            if active.contains(&name) {
                continue;
            }
            match ContainerBackend::remove(&name).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!("cleanup: {e}");
                    report.failed += 1;
                }
            }
        }

        info!(removed = report.removed, failed = report.failed, "cleanup pass finished");
        report
    }

    fn abort_output(reason: AbortReason, risk: &RiskAssessment) -> CommandOutput {
        match reason {
            AbortReason::DryRun => CommandOutput::skipped(0, String::new()),
            AbortReason::RequiresExplicitSandbox => CommandOutput::skipped(
                -1,
                format!(
                    "severity {} command requires explicit sandbox opt-in: {}",
                    risk.severity, risk.reason
                ),
            ),
        }
    }

    async fn run_container(
        &self,
        command: &str,
        deadline: Duration,
    ) -> Result<(Strategy, CommandOutput), SandboxError> {
        if let Some(container) = &self.container {
            let name = container.next_name();
            self.active.lock().await.insert(name.clone());
            let result = container.run(command, &name, deadline).await;
            self.active.lock().await.remove(&name);

            match result {
                Ok(output) => return Ok((Strategy::ContainerIsolated, output)),
                Err(e) if e.is_recoverable() => {
                    warn!("container backend failed, falling back to process isolation: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        // Substitution is recorded in the returned strategy so the caller can
        // see which tier actually ran.
        let output = self.process_backend.run(command, deadline).await?;
        Ok((Strategy::ProcessIsolated, output))
    }

    /// Direct execution for commands no rule wants sandboxed: same shell and
    /// deadline contract, caller's working directory, untouched environment.
    async fn run_direct(
        &self,
        command: &str,
        deadline: Duration,
    ) -> Result<CommandOutput, SandboxError> {
        let start = Instant::now();
        let child = Command::new(&self.config.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        process_isolation::wait_with_deadline(child, start, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::init_test_logging;

    fn process_only() -> SandboxManager {
        SandboxManager::with_backends(SandboxConfig::default(), None)
    }

    #[tokio::test]
    async fn safe_command_runs_direct() {
        init_test_logging();
        let manager = process_only();
        let result = manager
            .execute("echo hello", ExecutionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.backend_used, Strategy::Direct);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\n");
        assert!(result.success());
    }

    #[tokio::test]
    async fn dry_run_executes_nothing() {
        init_test_logging();
        let manager = process_only();
        let scratch = tempfile::tempdir().unwrap();
        let marker = scratch.path().join("ran");
        let command = format!("touch {}", marker.display());

        let result = manager
            .execute(
                &command,
                ExecutionOptions {
                    dry_run: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.backend_used, Strategy::Abort(AbortReason::DryRun));
        assert!(!marker.exists(), "dry run must not execute the command");
    }

    #[tokio::test]
    async fn high_severity_execute_is_refused() {
        init_test_logging();
        let manager = process_only();
        let result = manager
            .execute(
                "sudo rm -rf /data",
                ExecutionOptions {
                    execute_requested: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            result.backend_used,
            Strategy::Abort(AbortReason::RequiresExplicitSandbox)
        );
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("severity 5"));
    }

    #[tokio::test]
    async fn moderate_severity_falls_back_to_process_isolation() {
        init_test_logging();
        // "sudo" rates 3; with no container runtime the process tier runs it.
        let manager = process_only();
        let result = manager
            .execute("echo sudo-prefixed text", ExecutionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.backend_used, Strategy::ProcessIsolated);
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn cleanup_without_container_backend_is_a_noop() {
        init_test_logging();
        let manager = process_only();
        assert_eq!(manager.cleanup().await, CleanupReport::default());
    }

    #[tokio::test]
    async fn classify_is_exposed_for_display() {
        init_test_logging();
        let manager = process_only();
        let risk = manager.classify("rm -rf /");
        assert_eq!(risk.severity, 5);
    }
}
