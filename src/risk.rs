//! Risk classification for untrusted shell commands.
//!
//! Classification is pattern matching, nothing more: the command text is
//! lowercased and every entry in [`RISK_PATTERNS`] is tested for substring
//! containment. The assessment reports the *maximum* severity among all
//! matches. Compound commands like `sudo rm -rf /data` routinely match several
//! patterns, and stopping at the first hit would let iteration order
//! under-report the danger, so every pattern is always evaluated.
//!
//! The table is static and read-only. There is no notion of command identity:
//! [`classify`] is a pure function recomputed on every call.

use serde::{Deserialize, Serialize};

/// One entry in the static risk table.
#[derive(Debug, Clone, Copy)]
pub struct RiskPattern {
    /// Lowercase substring to look for in the command text.
    pub pattern: &'static str,
    /// 1 (safe) to 5 (catastrophic).
    pub severity: u8,
    /// Human-readable explanation surfaced to the caller.
    pub reason: &'static str,
}

/// Reason reported when no pattern matches.
pub const NO_MATCH_REASON: &str = "no known risk pattern matched";

/// The known-dangerous pattern table, worst first.
///
/// Ordering only breaks ties: when two patterns of equal severity match, the
/// one defined earlier supplies the reason. Severity itself never depends on
/// position in this table.
pub const RISK_PATTERNS: &[RiskPattern] = &[
    RiskPattern {
        pattern: "rm -rf",
        severity: 5,
        reason: "Recursive deletion - can destroy entire filesystem",
    },
    RiskPattern {
        pattern: "mkfs",
        severity: 5,
        reason: "Disk formatting - will destroy all data on device",
    },
    RiskPattern {
        pattern: "dd if=",
        severity: 5,
        reason: "Raw disk operations - can overwrite critical data",
    },
    RiskPattern {
        pattern: "format",
        severity: 5,
        reason: "Disk formatting operation",
    },
    RiskPattern {
        pattern: "fdisk",
        severity: 4,
        reason: "Disk partitioning - can affect system boot",
    },
    RiskPattern {
        pattern: "kill -9",
        severity: 4,
        reason: "Force kill processes - can crash system",
    },
    RiskPattern {
        pattern: "pkill",
        severity: 4,
        reason: "Kill multiple processes",
    },
    RiskPattern {
        pattern: "sudo rm",
        severity: 4,
        reason: "Elevated deletion privileges",
    },
    RiskPattern {
        pattern: "chmod 777",
        severity: 4,
        reason: "Dangerous permission changes",
    },
    RiskPattern {
        pattern: "sudo",
        severity: 3,
        reason: "Elevated privileges",
    },
    RiskPattern {
        pattern: "chown",
        severity: 3,
        reason: "Ownership changes",
    },
    RiskPattern {
        pattern: "chmod",
        severity: 3,
        reason: "Permission changes",
    },
    RiskPattern {
        pattern: "mount",
        severity: 3,
        reason: "Mount table changes",
    },
    RiskPattern {
        pattern: "rm",
        severity: 2,
        reason: "File deletion",
    },
    RiskPattern {
        pattern: "mv",
        severity: 2,
        reason: "File movement - potential data loss",
    },
    RiskPattern {
        pattern: "tar x",
        severity: 2,
        reason: "Archive extraction - can overwrite files",
    },
    RiskPattern {
        pattern: "unzip",
        severity: 2,
        reason: "Archive extraction - can overwrite files",
    },
    RiskPattern {
        pattern: "push --force",
        severity: 2,
        reason: "Force push - rewrites remote history",
    },
    RiskPattern {
        pattern: "push -f",
        severity: 2,
        reason: "Force push - rewrites remote history",
    },
];

/// The outcome of classifying one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// True iff severity is 2 or above.
    pub is_risky: bool,
    /// 1 (safe) to 5 (catastrophic).
    pub severity: u8,
    /// Reason text of the worst-severity match, or [`NO_MATCH_REASON`].
    pub reason: String,
}

impl RiskAssessment {
    fn safe() -> Self {
        Self {
            is_risky: false,
            severity: 1,
            reason: NO_MATCH_REASON.to_string(),
        }
    }
}

/// Rate a command against the full pattern table.
///
/// Never fails, never blocks, has no side effects. The text is treated as
/// opaque: there is no shell parsing, only case-insensitive substring scans.
pub fn classify(command: &str) -> RiskAssessment {
    let lowered = command.to_lowercase();

    let mut worst: Option<&RiskPattern> = None;
    for candidate in RISK_PATTERNS {
        if !lowered.contains(candidate.pattern) {
            continue;
        }
        match worst {
            // Keeping the incumbent on equal severity gives the tie to the
            // earlier-defined pattern.
            Some(current) if current.severity >= candidate.severity => {}
            _ => worst = Some(candidate),
        }
    }

    match worst {
        Some(pattern) => RiskAssessment {
            is_risky: pattern.severity >= 2,
            severity: pattern.severity,
            reason: pattern.reason.to_string(),
        },
        None => RiskAssessment::safe(),
    }
}
