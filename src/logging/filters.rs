use topica_error::{ConfigError, StackError, TopicaResult};
use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// `RUST_LOG` if it is set and valid, otherwise the configured directive.
pub fn build_filter(config: &LoggingConfig) -> TopicaResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config.filter_directive();
    EnvFilter::try_new(&directive).map_err(|e| {
        StackError::new(ConfigError::Invalid {
            field: "logging.level".to_string(),
            reason: format!("bad filter directive '{directive}': {e}"),
        })
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        env,
        sync::{Arc, Mutex},
    };

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    /// Collects formatted output in memory.
    #[derive(Clone, Default)]
    pub(crate) struct VecMakeWriter(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl VecMakeWriter {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl<'a> fmt::MakeWriter<'a> for VecMakeWriter {
        type Writer = VecWriterGuard;

        fn make_writer(&'a self) -> Self::Writer {
            VecWriterGuard(self.0.clone())
        }
    }

    pub(crate) struct VecWriterGuard(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for VecWriterGuard {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    #[serial]
    fn test_config_directive_without_env() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        let filter = build_filter(&config).expect("valid directive");
        assert!(filter.to_string().contains("warn"));
    }

    #[test]
    #[serial]
    fn test_env_wins_over_config() {
        env::set_var("RUST_LOG", "debug");
        let filter = build_filter(&LoggingConfig::default());
        env::remove_var("RUST_LOG");

        assert!(filter.expect("valid env").to_string().contains("debug"));
    }

    #[test]
    #[serial]
    fn test_invalid_directive_is_an_error() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "topica=notalevel".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_filter(&config).is_err());
    }

    /// warn passes a `warn` filter, info does not.
    #[test]
    #[serial]
    fn test_filter_drops_lower_levels() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        let writer = VecMakeWriter::default();
        let layer = fmt::layer()
            .with_writer(writer.clone())
            .with_ansi(false)
            .with_filter(build_filter(&config).unwrap());
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("quiet info line");
            tracing::warn!("loud warn line");
        });

        let out = writer.contents();
        assert!(out.contains("loud warn line"));
        assert!(!out.contains("quiet info line"));
    }
}
