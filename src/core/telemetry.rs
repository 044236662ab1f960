//! Tracing subscriber setup for the binary

use tracing::metadata::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::core::config::{LogFormat, LoggingConfig};

/// Install a stderr subscriber
///
/// Filter precedence: `RUST_LOG`, then `-v` count, then `logging.level`.
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init(verbosity: u8, logging: &LoggingConfig) {
    let filter = build_filter(verbosity, logging, std::env::var("RUST_LOG").ok().as_deref());
    let layer = stderr_layer(logging.format);
    let _ = tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init();
}

fn build_filter(verbosity: u8, logging: &LoggingConfig, env: Option<&str>) -> EnvFilter {
    if let Some(directives) = env.filter(|s| !s.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    if verbosity > 0 {
        return EnvFilter::default().add_directive(level_from_verbosity(verbosity).into());
    }
    EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::WARN.into()))
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn stderr_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Compact => Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        ),
    }
}
