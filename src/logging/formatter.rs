use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    registry::LookupSpan,
    Layer,
};

use super::config::{LogFormat, LoggingConfig};

/// fmt layer for the configured format, boxed to erase the format type.
pub fn build_formatter<S, W>(
    config: &LoggingConfig,
    writer: W,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_line_number(config.with_line_numbers);
            Box::new(layer)
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_ansi(config.ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_line_number(config.with_line_numbers);
            Box::new(layer)
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(config.ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_line_number(config.with_line_numbers);
            Box::new(layer)
        }
    }
}
