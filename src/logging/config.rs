use serde::{Deserialize, Serialize};
use topica_error::{ensure, ConfigError, TopicaResult};
use tracing_subscriber::EnvFilter;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logging setup used by [`init_logging`](super::init_logging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level, e.g. `info`, or a full directive such as
    /// `warn,topica=debug`. `RUST_LOG` wins when set.
    pub level: String,
    /// Extra directives appended to `level`, e.g. `topica::publish=trace`.
    pub directives: Vec<String>,
    pub format: LogFormat,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
    pub ansi: bool,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl LoggingConfig {
    /// `level` followed by every extra directive, comma separated.
    pub fn filter_directive(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn validate(&self) -> TopicaResult<()> {
        ensure!(
            !self.level.trim().is_empty(),
            ConfigError::Invalid {
                field: "logging.level".to_string(),
                reason: "must not be empty".to_string(),
            }
        );
        let directive = self.filter_directive();
        if let Err(e) = EnvFilter::try_new(&directive) {
            topica_error::bail!(ConfigError::Invalid {
                field: "logging.level".to_string(),
                reason: format!("bad filter directive '{directive}': {e}"),
            });
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            format: LogFormat::Compact,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
            ansi: true,
        }
    }
}
