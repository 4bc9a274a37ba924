use std::path::Path;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use topica_error::{ensure, ConfigError, StackError, TopicaResult};

use crate::logging::LoggingConfig;

/// Prefix of environment overrides, e.g. `TOPICA_BUS__TRACE_PUBLISH=true`.
pub const ENV_PREFIX: &str = "TOPICA";

/// Base name of the optional settings file looked up by [`Settings::load`].
pub const DEFAULT_FILE: &str = "topica";

/// Bus behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Log delivery failures with `warn!` when no failure handler is set.
    pub log_delivery_failures: bool,
    /// Emit a `trace!` event for every publish.
    pub trace_publish: bool,
    /// Warn once the publisher cache grows past this many topics. Publishers
    /// are never evicted automatically.
    pub publisher_warn_threshold: Option<usize>,
}

/// Everything `topica` reads from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bus: BusConfig,
    pub logging: LoggingConfig,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl BusConfig {
    pub fn validate(&self) -> TopicaResult<()> {
        ensure!(
            self.publisher_warn_threshold != Some(0),
            ConfigError::Invalid {
                field: "bus.publisher_warn_threshold".to_string(),
                reason: "must be greater than zero; omit it to disable the warning".to_string(),
            }
        );
        Ok(())
    }
}

impl Settings {
    /// Defaults, then `topica.{toml,yaml,json,...}` in the working directory
    /// if present, then `TOPICA_*` environment variables.
    pub fn load() -> TopicaResult<Self> {
        Self::build(File::with_name(DEFAULT_FILE).required(false))
    }

    /// Like [`Settings::load`], with a settings file that must exist.
    pub fn load_from(path: impl AsRef<Path>) -> TopicaResult<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> TopicaResult<Self>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let defaults = Settings::default();
        let cfg = Config::builder()
            // defaults
            .set_default("bus.log_delivery_failures", defaults.bus.log_delivery_failures)
            .map_err(load_error)?
            .set_default("bus.trace_publish", defaults.bus.trace_publish)
            .map_err(load_error)?
            .set_default("logging.level", defaults.logging.level.clone())
            .map_err(load_error)?
            .set_default("logging.format", defaults.logging.format.as_str())
            .map_err(load_error)?
            .add_source(file)
            // TOPICA_BUS__TRACE_PUBLISH -> bus.trace_publish
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(load_error)?;

        let settings: Settings = cfg.try_deserialize().map_err(load_error)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> TopicaResult<()> {
        self.bus.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

fn load_error(err: ::config::ConfigError) -> StackError {
    StackError::new(ConfigError::Load {
        reason: err.to_string(),
    })
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            log_delivery_failures: true,
            trace_publish: false,
            publisher_warn_threshold: Some(10_000),
        }
    }
}
