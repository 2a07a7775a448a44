//! Tracing configuration for the keyrelay step
//!
//! Logs go to stderr (stdout carries workflow commands). Every formatted
//! line passes through the redaction registry before it is written.

use keyrelay_secrets::redaction::redact;
use std::io::{self, Write};
pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above (default)
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Level used when `RUST_LOG` is unset
    pub level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: Level::INFO,
        }
    }
}

/// Stderr writer that masks registered secrets.
///
/// The fmt layer hands over each event as a single buffer, so redacting per
/// `write` call sees whole lines.
#[derive(Debug)]
pub struct RedactingWriter<W> {
    inner: W,
}

impl RedactingWriter<io::Stderr> {
    /// Writer over the process stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> RedactingWriter<W> {
    /// Wrap `inner`.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(redact(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn build_filter(config: &TracingConfig) -> Result<EnvFilter, String> {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = config.level.as_str().to_ascii_lowercase();
            EnvFilter::try_new(format!(
                "keyrelay={level},keyrelay_secrets={level},keyrelay_aws={level},keyrelay_infisical={level}"
            ))
        })
        .map_err(|e| e.to_string())
}

/// Initialize tracing with the given configuration
///
/// # Errors
///
/// Returns an error if the filter directive does not parse.
pub fn init_tracing(config: &TracingConfig) -> miette::Result<()> {
    let env_filter = build_filter(config)
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        TracingFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(RedactingWriter::stderr)
                .with_target(true);
            registry.with(layer).init();
        }
        TracingFormat::Compact => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(RedactingWriter::stderr)
                .with_target(false);
            registry.with(layer).init();
        }
        TracingFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(RedactingWriter::stderr)
                .with_current_span(true)
                .with_span_list(true);
            registry.with(layer).init();
        }
    }

    tracing::debug!(
        run_id = %Uuid::new_v4(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyrelay_secrets::redaction::register_secret;

    #[test]
    fn test_writer_redacts_registered_values() {
        register_secret("tracing-writer-secret-value");
        let mut writer = RedactingWriter::new(Vec::new());
        let line = b"token=tracing-writer-secret-value ok\n";
        let written = writer.write(line).unwrap();
        assert_eq!(written, line.len());
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "token=*** ok\n"
        );
    }

    #[test]
    fn test_rust_log_overrides_level() {
        temp_env::with_var("RUST_LOG", Some("keyrelay=trace"), || {
            let filter = build_filter(&TracingConfig::default()).unwrap();
            assert_eq!(filter.to_string(), "keyrelay=trace");
        });
    }

    #[test]
    fn test_level_filter_without_rust_log() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = TracingConfig {
                level: Level::DEBUG,
                ..TracingConfig::default()
            };
            let filter = build_filter(&config).unwrap();
            assert!(filter.to_string().contains("keyrelay_infisical=debug"));
        });
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }
}
