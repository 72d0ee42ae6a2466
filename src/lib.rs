//! # Shellguard
//!
//! Shellguard decides how dangerous an untrusted shell command is and runs it
//! under an isolation tier matched to that danger. It is the safety net between
//! a command *generator* (typically an LLM turning natural language into shell
//! text) and the host it runs on.
//!
//! ## Pipeline
//!
//! Every call to [`SandboxManager::execute`] goes through the same three steps:
//!
//! 1. **Classify** ([`risk`]): scan the raw command text against a static
//!    pattern table and rate it 1 (safe) to 5 (catastrophic). Every pattern is
//!    evaluated; the worst match wins.
//! 2. **Select** ([`strategy`]): map the rating plus caller intent onto one of
//!    `Direct`, `ProcessIsolated`, `ContainerIsolated`, or `Abort`. Moderate
//!    risk is sandboxed automatically; severity 4+ additionally requires an
//!    explicit opt-in before anything runs.
//! 3. **Execute** ([`process_isolation`], [`container`]): run under the chosen
//!    tier with a hard wall-clock deadline, and report exit code, output, and
//!    timeout state uniformly regardless of the backend.
//!
//! ## Guarantees and non-guarantees
//!
//! - A command is executed by exactly one backend per call, never twice.
//! - Backends leave nothing behind: the process tier's scratch directory and
//!   the container tier's ephemeral container are released on success, failure,
//!   and timeout alike. [`SandboxManager::cleanup`] reconciles containers left
//!   by crashed runs, matched by name prefix only.
//! - A non-zero exit code from the command is a normal result, not an error.
//! - This is best-effort protection against *accidental* destruction. It does
//!   not parse shell syntax and is not a confinement boundary against a
//!   deliberately adversarial author.

pub mod config;
pub mod container;
pub mod error;
pub mod manager;
pub mod outcome;
pub mod process_isolation;
pub mod risk;
pub mod strategy;
pub mod utils;

pub use config::SandboxConfig;
pub use container::ContainerBackend;
pub use error::SandboxError;
pub use manager::{CleanupReport, SandboxManager};
pub use outcome::{CommandOutput, ExecutionResult};
pub use process_isolation::ProcessBackend;
pub use risk::{RiskAssessment, RiskPattern, classify};
pub use strategy::{AbortReason, ExecutionOptions, Strategy, select};
