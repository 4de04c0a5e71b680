use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// The frame crate logs every frame written and every resync step.
const FRAME_TARGET: &str = "asvlink_frame";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Per-crate filter: `debug` opens up the link layer but keeps the
    /// frame codec at `info`; only `trace` shows individual frames.
    pub fn targets(self) -> Targets {
        let frame = match self {
            LogLevel::Debug => LevelFilter::INFO,
            other => other.as_filter(),
        };
        Targets::new()
            .with_default(self.as_filter())
            .with_target(FRAME_TARGET, frame)
    }
}

/// Install the stderr subscriber.
///
/// Controller workers log inside a `worker{module=..}` span. Text output
/// prints it as a prefix; JSON output lifts it into a `span` object so each
/// line can be filtered by module.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let targets = level.targets();
    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .with_thread_names(true);
            let _ = registry.with(layer.with_filter(targets)).try_init();
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_current_span(true)
                .with_span_list(false);
            let _ = registry.with(layer.with_filter(targets)).try_init();
        }
    }
}
