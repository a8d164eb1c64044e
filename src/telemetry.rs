//! Tracing infrastructure.
//!
//! Structured logging via `tracing` and `tracing-subscriber`:
//! - environment-based filtering (`RUST_LOG`, default `info`)
//! - pretty output for interactive use, compact for production
//!
//! Initialized once by the binary; the library only emits events.

use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed with colors, for development.
    Pretty,
    /// Single-line compact, for production.
    Compact,
}

/// Install the global subscriber. Safe to call once per process; later
/// calls fail and are reported as an error string.
pub fn init(format: OutputFormat) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt::Subscriber::builder().with_env_filter(filter);
    let result = match format {
        OutputFormat::Pretty => builder.pretty().try_init(),
        OutputFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_init_reports_error_instead_of_panicking() {
        let first = init(OutputFormat::Compact);
        let second = init(OutputFormat::Compact);
        // Only one global subscriber may win; the second call must fail.
        assert!(!(first.is_ok() && second.is_ok()));
    }
}
