//! Container-isolated execution.
//!
//! The strongest tier: each run gets one ephemeral Docker container with no
//! network, a memory ceiling, a CPU quota, a read-only root filesystem, and a
//! tmpfs scratch mount at `/tmp`. The container is named deterministically
//! (`<prefix>-<pid>-<seq>`) so that cleanup after a crashed run can find
//! leftovers by prefix without touching unrelated containers. The sequence
//! component keeps concurrent runs within one process from colliding; the pid
//! alone would not.
//!
//! Removal is unconditional: `docker rm -f` runs on success, non-zero exit,
//! runtime error, and timeout alike, before `run` returns. Killing the
//! attached `docker run` client at the deadline does not stop the container
//! itself, which is exactly why the forced removal cannot be skipped on that
//! path.

use std::{
    process::Stdio,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use crate::{config::SandboxConfig, error::SandboxError, outcome::CommandOutput};

/// CPU accounting period handed to Docker, in microseconds.
const CPU_PERIOD_US: u64 = 100_000;

/// Per-process counter appended to container names.
static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs commands in ephemeral, resource-capped, network-less containers.
#[derive(Debug, Clone)]
pub struct ContainerBackend {
    image: String,
    prefix: String,
    memory_limit: String,
    cpu_quota: f64,
    tmpfs_size: String,
}

impl ContainerBackend {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            image: config.container_image.clone(),
            prefix: config.container_prefix.clone(),
            memory_limit: config.memory_limit.clone(),
            cpu_quota: config.cpu_quota,
            tmpfs_size: config.tmpfs_size.clone(),
        }
    }

    /// Probe the container runtime once. `docker info` succeeds iff the
    /// daemon is reachable, which makes it the availability check.
    pub async fn probe() -> Result<(), SandboxError> {
        let result = Command::new("docker")
            .arg("info")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(SandboxError::BackendUnavailable(
                "docker daemon not reachable".to_string(),
            )),
            Err(e) => Err(SandboxError::BackendUnavailable(format!(
                "docker binary not usable: {e}"
            ))),
        }
    }

    /// Reserve a container name for one run.
    pub fn next_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.prefix,
            std::process::id(),
            RUN_SEQ.fetch_add(1, Ordering::Relaxed)
        )
    }

    fn run_args(&self, name: &str, command: &str) -> Vec<String> {
        let quota_us = (self.cpu_quota.clamp(0.05, 1.0) * CPU_PERIOD_US as f64) as u64;
        vec![
            "run".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--network=none".to_string(),
            format!("--memory={}", self.memory_limit),
            // Same value for swap pins total memory to the ceiling.
            format!("--memory-swap={}", self.memory_limit),
            format!("--cpu-period={CPU_PERIOD_US}"),
            format!("--cpu-quota={quota_us}"),
            "--read-only".to_string(),
            format!("--tmpfs=/tmp:rw,size={}", self.tmpfs_size),
            self.image.clone(),
            "/bin/sh".to_string(),
            "-c".to_string(),
            command.to_string(),
        ]
    }

    /// Execute `command` inside a fresh container under `name`.
    ///
    /// The caller (the manager) picks the name via [`Self::next_name`] and
    /// registers it before calling, so the cleanup pass can tell in-flight
    /// containers from stale ones. Whatever happens, the container is removed
    /// before this returns.
    pub async fn run(
        &self,
        command: &str,
        name: &str,
        deadline: Duration,
    ) -> Result<CommandOutput, SandboxError> {
        let args = self.run_args(name, command);
        debug!(container = %name, image = %self.image, "starting container run");

        let start = Instant::now();
        let spawned = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // The binary disappeared between probe and run.
                return Err(SandboxError::BackendUnavailable(format!(
                    "docker binary not usable: {e}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = match timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(raw)) => {
                // `docker run` propagates the container's own exit code, but
                // exits 125 itself when the client failed before the command
                // ran. That failure must not masquerade as command output.
                let exit_code = raw.status.code().unwrap_or(-1);
                let stderr = String::from_utf8_lossy(&raw.stderr).to_string();
                match Self::client_failure(exit_code, &stderr) {
                    Some(err) => Err(err),
                    None => Ok(CommandOutput {
                        exit_code,
                        stdout: String::from_utf8_lossy(&raw.stdout).to_string(),
                        stderr,
                        timed_out: false,
                        duration_ms: start.elapsed().as_millis() as u64,
                    }),
                }
            }
            Ok(Err(e)) => Err(SandboxError::from(e)),
            Err(_) => Ok(CommandOutput::deadline_expired(
                start.elapsed().as_millis() as u64,
            )),
        };

        // Not contingent on the outcome above; this is the tier's core
        // invariant.
        if let Err(e) = Self::remove(name).await {
            warn!(container = %name, error = %e, "post-run container removal failed");
        }

        outcome
    }

    /// Distinguish a `docker run` client failure from the command's own exit.
    ///
    /// Exit 125 is `docker run` reporting that it failed itself; its
    /// diagnostics are prefixed `docker:` on stderr. A dead daemon maps to
    /// [`SandboxError::BackendUnavailable`] so the manager's process-isolation
    /// fallback engages; any other client failure is a backend invocation
    /// error. Exit 125 without the `docker:` prefix is the contained command's
    /// own status and stays data.
    fn client_failure(exit_code: i32, stderr: &str) -> Option<SandboxError> {
        if exit_code != 125 || !stderr.contains("docker:") {
            return None;
        }
        if stderr.contains("Cannot connect to the Docker daemon")
            || stderr.contains("error during connect")
        {
            Some(SandboxError::BackendUnavailable(
                "docker daemon not reachable".to_string(),
            ))
        } else {
            Some(SandboxError::BackendExecution(std::io::Error::other(
                stderr.trim().to_string(),
            )))
        }
    }

    /// Force-remove a container by exact name. Missing containers count as
    /// removed.
    pub async fn remove(name: &str) -> Result<(), SandboxError> {
        let output = Command::new("docker")
            .args(["rm", "-f", name])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SandboxError::Cleanup {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Ok(());
        }
        Err(SandboxError::Cleanup {
            name: name.to_string(),
            reason: stderr.trim().to_string(),
        })
    }

    /// List all containers, running or exited, whose name starts with the
    /// configured prefix.
    pub async fn list_by_prefix(&self) -> Result<Vec<String>, SandboxError> {
        let output = Command::new("docker")
            .args([
                "ps",
                "-a",
                "--filter",
                &format!("name={}", self.prefix),
                "--format",
                "{{.Names}}",
            ])
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(SandboxError::BackendUnavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // Docker's name filter is a substring match; re-check the prefix so an
        // unrelated container containing the prefix mid-name is never touched.
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|name| name.starts_with(&self.prefix))
            .map(ToString::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ContainerBackend {
        ContainerBackend::new(&SandboxConfig::default())
    }

    #[test]
    fn names_are_unique_within_one_process() {
        let backend = backend();
        let first = backend.next_name();
        let second = backend.next_name();
        assert_ne!(first, second);
        let pid_part = format!("shellguard-sandbox-{}-", std::process::id());
        assert!(first.starts_with(&pid_part));
    }

    #[test]
    fn run_args_enforce_all_hard_constraints() {
        let args = backend().run_args("shellguard-sandbox-1-0", "echo hi");
        assert!(args.contains(&"--network=none".to_string()));
        assert!(args.contains(&"--memory=128m".to_string()));
        assert!(args.contains(&"--memory-swap=128m".to_string()));
        assert!(args.contains(&"--cpu-period=100000".to_string()));
        assert!(args.contains(&"--cpu-quota=50000".to_string()));
        assert!(args.contains(&"--read-only".to_string()));
        assert!(args.contains(&"--tmpfs=/tmp:rw,size=100m".to_string()));
        // Image comes before the shell invocation.
        let image_pos = args.iter().position(|a| a == "ubuntu:20.04").unwrap();
        assert_eq!(args[image_pos + 1], "/bin/sh");
        assert_eq!(args[image_pos + 2], "-c");
        assert_eq!(args[image_pos + 3], "echo hi");
    }

    #[test]
    fn daemon_loss_is_recoverable_not_command_output() {
        // Probe passed at construction, daemon died before the run: the
        // result must be a recoverable backend error, never exit code 125
        // handed to the caller as if the command produced it.
        let stderr = "docker: Cannot connect to the Docker daemon at \
                      unix:///var/run/docker.sock. Is the docker daemon running?";
        let err = ContainerBackend::client_failure(125, stderr)
            .expect("daemon loss must be detected");
        assert!(matches!(err, SandboxError::BackendUnavailable(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn other_client_failures_are_backend_errors() {
        let err = ContainerBackend::client_failure(
            125,
            "docker: invalid reference format.\nSee 'docker run --help'.",
        )
        .expect("client failure must be detected");
        assert!(matches!(err, SandboxError::BackendExecution(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn contained_command_exit_codes_stay_data() {
        // A command inside the container may itself exit 125; without the
        // docker: diagnostic prefix that is its own result.
        assert!(ContainerBackend::client_failure(125, "").is_none());
        assert!(ContainerBackend::client_failure(125, "boom\n").is_none());
        // And ordinary failures never trip the detection.
        assert!(ContainerBackend::client_failure(1, "docker: oops").is_none());
        assert!(ContainerBackend::client_failure(127, "sh: nope: not found").is_none());
    }

    #[test]
    fn cpu_quota_is_clamped() {
        let config = SandboxConfig {
            cpu_quota: 7.0,
            ..Default::default()
        };
        let args = ContainerBackend::new(&config).run_args("n", "true");
        assert!(args.contains(&"--cpu-quota=100000".to_string()));
    }
}
