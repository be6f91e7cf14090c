//! Subscriber setup for the `rn42` binary.
//!
//! Console output goes to stderr so stdout stays free for payload relayed
//! from the radio.

use crate::domain::settings::LogSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "rn42";

/// Target of the per-exchange `TX`/`RX` events
const WIRE_TARGET: &str = "rn42::infrastructure::bluetooth::engine";

/// Flushes the file log when dropped
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

fn parse_rotation(rotation: &str) -> Rotation {
    match rotation.to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

/// `env` (the `RUST_LOG` value) wins over the configured level
fn build_filter(settings: &LogSettings, env: Option<&str>) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(&settings.level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    if !settings.wire_trace {
        return filter;
    }
    match format!("{WIRE_TARGET}=trace").parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

pub fn init_logger(settings: &LogSettings) -> anyhow::Result<LoggingGuard> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(settings, env.as_deref());

    let console_layer = settings.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(settings.ansi_colors)
    });

    let mut file_guard = None;
    let file_layer = match &settings.log_dir {
        Some(dir) => {
            let appender =
                RollingFileAppender::new(parse_rotation(&settings.rotation), dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!("Logging initialized");

    Ok(LoggingGuard { _file: file_guard })
}
