//! Logging initialization.
//!
//! `init_logging` installs the global `tracing` subscriber once, guarded by a
//! `std::sync::Once` so repeated calls are harmless. Verbosity follows
//! `RUST_LOG` when set; otherwise the given level applies, with `shellguard`
//! itself raised to `debug`.
//!
//! With `log_to_file = true` a daily rolling file is written to the project
//! cache directory (ANSI disabled). If that directory cannot be determined or
//! created, or when `log_to_file = false`, logs go to stderr with colors.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Subscriber setup for tests: everything to stderr at `trace`.
pub fn init_test_logging() {
    init_logging("trace", false).expect("Failed to initialize test logging");
}

/// Initializes the logging system.
///
/// # Errors
///
/// Currently infallible; kept as `Result` so file-appender setup failures can
/// be surfaced later without an API break.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},shellguard=debug")));

        let file_appender = if log_to_file {
            ProjectDirs::from("io", "Shellguard", "shellguard").and_then(|proj_dirs| {
                let log_dir = proj_dirs.cache_dir();
                std::fs::create_dir_all(log_dir).ok()?;
                Some(tracing_appender::rolling::daily(log_dir, "shellguard.log"))
            })
        } else {
            None
        };

        match file_appender {
            Some(appender) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // Leaked so buffered logs are flushed at process exit.
                Box::leak(Box::new(guard));
            }
            None => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(stderr).with_ansi(true))
                    .init();
            }
        }
    });

    Ok(())
}
