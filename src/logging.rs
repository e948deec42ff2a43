//! Log subscriber setup
//!
//! Events go to stderr so that stdout only carries command output.
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

/// Output format for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable lines
    Console,
}

impl LogFormat {
    /// Parses a format name; "text" is accepted as an alias for console
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "console" | "text" => Some(LogFormat::Console),
            _ => None,
        }
    }
}

/// Installs the global subscriber
///
/// An unrecognized level falls back to `info`. Calling this twice is a
/// no-op for the second call.
pub fn init(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Console => builder.try_init(),
    };
}
