//! Sandbox configuration.
//!
//! All knobs live in one deserializable struct with defaults that match the
//! shipped policy: a 30 second deadline, an `ubuntu:20.04` base image, 128 MiB
//! of memory, half a core, and a 100 MiB tmpfs scratch mount. A TOML file can
//! override any subset of fields.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Container name prefix used when none is configured. Crash-recovery cleanup
/// matches on this prefix, so changing it orphans containers created under the
/// old one.
pub const DEFAULT_CONTAINER_PREFIX: &str = "shellguard-sandbox";

/// Runtime configuration for the sandbox manager and its backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// Wall-clock budget for one execution attempt, in seconds.
    pub deadline_secs: u64,
    /// Shell interpreter used by the direct and process-isolated tiers.
    pub shell: String,
    /// Base image for ephemeral containers.
    pub container_image: String,
    /// Name prefix for ephemeral containers.
    pub container_prefix: String,
    /// Container memory ceiling, in Docker syntax (`128m`, `1g`).
    pub memory_limit: String,
    /// Container CPU quota as a fraction of one core, in (0, 1].
    pub cpu_quota: f64,
    /// Size of the writable in-memory scratch mount at `/tmp`.
    pub tmpfs_size: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 30,
            shell: "/bin/sh".to_string(),
            container_image: "ubuntu:20.04".to_string(),
            container_prefix: DEFAULT_CONTAINER_PREFIX.to_string(),
            memory_limit: "128m".to_string(),
            cpu_quota: 0.5,
            tmpfs_size: "100m".to_string(),
        }
    }
}

impl SandboxConfig {
    /// The execution deadline as a [`Duration`].
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Load configuration from a TOML file. Missing fields fall back to the
    /// defaults above.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sandbox config at {}", path.display()))?;
        let config: SandboxConfig = toml::from_str(&contents)
            .with_context(|| format!("invalid sandbox config at {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_shipped_policy() {
        let config = SandboxConfig::default();
        assert_eq!(config.deadline(), Duration::from_secs(30));
        assert_eq!(config.container_image, "ubuntu:20.04");
        assert_eq!(config.container_prefix, DEFAULT_CONTAINER_PREFIX);
        assert_eq!(config.memory_limit, "128m");
        assert!((config.cpu_quota - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deadline_secs = 5\ncontainer_image = \"alpine:3.20\"").unwrap();

        let config = SandboxConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.deadline_secs, 5);
        assert_eq!(config.container_image, "alpine:3.20");
        assert_eq!(config.shell, "/bin/sh");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deadlnie_secs = 5").unwrap();

        assert!(SandboxConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = SandboxConfig::load_from_file(Path::new("/nonexistent/sandbox.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sandbox.toml"));
    }
}
