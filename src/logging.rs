//! Diagnostic logging for the terminal front end.
//!
//! Logs go to stderr so they never interleave with the transcript on stdout.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "COWRITE_LOG";
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Builds the filter from `COWRITE_LOG`, falling back to `warn`.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global subscriber. Repeated calls are no-ops.
pub fn init() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    if installed.is_ok() {
        tracing::debug!("logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
