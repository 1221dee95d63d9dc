//! Logging configuration for campuslens.
//!
//! Covers three sources: campuslens itself, per-request spans from the HTTP
//! trace layer (`tower_http`), and connection failures reported by the pool
//! (`r2d2`, bridged from the `log` facade).

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Filter directives used when `RUST_LOG` is not set.
///
/// Request logs follow the campuslens level. The pool only reports
/// connection failures, so it stays at `warn` unless output is quieter still.
#[must_use]
pub fn default_directives(verbosity: Verbosity) -> String {
    let level = verbosity.to_level_filter();
    let pool = if verbosity == Verbosity::Quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    format!("campuslens={level},tower_http={level},r2d2={pool}")
}

/// Initialize the logging system.
///
/// Call once at startup. `RUST_LOG` takes precedence over `verbosity`.
///
/// # Examples
///
/// ```no_run
/// use campuslens::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // Already installed when called twice (tests, embedding)
    let _ = subscriber.try_init();
}

/// Initialize logging for tests.
///
/// Only warnings and errors are printed, through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(Verbosity::Quiet.to_level_filter(), Level::ERROR);
        assert_eq!(Verbosity::Normal.to_level_filter(), Level::INFO);
        assert_eq!(Verbosity::Verbose.to_level_filter(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.to_level_filter(), Level::TRACE);
    }

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_default_directives_cover_request_and_pool_logs() {
        assert_eq!(
            default_directives(Verbosity::Normal),
            "campuslens=INFO,tower_http=INFO,r2d2=WARN"
        );
        assert_eq!(
            default_directives(Verbosity::Trace),
            "campuslens=TRACE,tower_http=TRACE,r2d2=WARN"
        );
        assert_eq!(
            default_directives(Verbosity::Quiet),
            "campuslens=ERROR,tower_http=ERROR,r2d2=ERROR"
        );
    }

    #[test]
    fn test_default_directives_parse() {
        for verbosity in [Verbosity::Quiet, Verbosity::Verbose] {
            assert!(EnvFilter::try_new(default_directives(verbosity)).is_ok());
        }
    }

    #[test]
    fn test_init_logging_with_all_verbosity_levels() {
        // Only the first call installs a subscriber
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Normal);
        init_logging(Verbosity::Verbose);
        init_logging(Verbosity::Trace);
    }
}
