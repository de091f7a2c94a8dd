//! Global logger configuration.

use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

/// Configure the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this more than
/// once is a no-op, so tests can call it freely.
pub fn configure_global_logger(default_level: Level, format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let result = match format {
        LogFormat::HumanReadable => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_span_events(FmtSpan::NONE)
            .with_file(true)
            .with_line_number(true)
            .with_test_writer()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(false)
            .with_test_writer()
            .try_init(),
    };

    if let Err(e) = result {
        tracing::trace!(%e, "global logger already configured");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_twice() {
        configure_global_logger(Level::ERROR, LogFormat::HumanReadable);
        configure_global_logger(Level::ERROR, LogFormat::Json);
    }
}
