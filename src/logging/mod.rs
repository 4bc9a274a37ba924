//! `tracing-subscriber` setup for binaries and tests that embed the bus.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is up to the host, optionally through [`init_logging`].

pub mod config;
mod filters;
mod formatter;

use std::io;

pub use self::config::{LogFormat, LoggingConfig};
#[cfg(test)]
pub(crate) use self::filters::tests::VecMakeWriter;
use topica_error::{ConfigError, StackError, TopicaResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: an `EnvFilter` plus a fmt layer writing
/// to stderr.
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> TopicaResult<()> {
    config.validate()?;

    let filter = filters::build_filter(config)?;
    let formatter = formatter::build_formatter(config, io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(formatter)
        .try_init()
        .map_err(|e| {
            StackError::new(ConfigError::LoggingInit {
                reason: e.to_string(),
            })
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = config.format.as_str(),
        "logging initialized"
    );
    Ok(())
}
