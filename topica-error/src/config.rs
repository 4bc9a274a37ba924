use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors raised while loading settings or installing the logging stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setting has a value the bus cannot work with.
    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: String, reason: String },

    /// Settings sources could not be read or deserialized.
    #[error("failed to load settings: {reason}")]
    Load { reason: String },

    /// The tracing subscriber could not be installed.
    #[error("failed to initialize logging: {reason}")]
    LoggingInit { reason: String },
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } => StatusCode::ConfigInvalid,
            Self::Load { .. } => StatusCode::ConfigLoadFailed,
            Self::LoggingInit { .. } => StatusCode::LoggingInitFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "config".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::Invalid { field, .. } = self {
            tags.push(("field", field.clone()));
        }
        tags
    }
}
