use std::sync::Arc;

use tracing::warn;

use super::{locking::LockingEventBus, standard::StandardEventBus};
use crate::{
    config::BusConfig,
    error::{FailureHandler, PublicationError},
};

/// Configures and builds event buses.
///
/// ```
/// use topica::{BusConfig, StandardEventBus};
///
/// let bus = StandardEventBus::<String>::builder()
///     .config(&BusConfig::default())
///     .failure_handler(|err| eprintln!("{err}"))
///     .build();
/// assert_eq!(bus.publisher_count(), 0);
/// ```
pub struct EventBusBuilder<M> {
    failure_handler: Option<FailureHandler<M>>,
    config: BusConfig,
}

impl<M: 'static> EventBusBuilder<M> {
    pub fn new() -> Self {
        Self {
            failure_handler: None,
            config: BusConfig::default(),
        }
    }

    /// Replaces the default failure handler, which logs each failure with
    /// `warn!` unless `log_delivery_failures` is off.
    pub fn failure_handler<F>(
        mut self,
        handler: F,
    ) -> Self
    where
        F: Fn(&PublicationError<M>) + Send + Sync + 'static,
    {
        self.failure_handler = Some(Arc::new(handler));
        self
    }

    pub fn config(
        mut self,
        config: &BusConfig,
    ) -> Self {
        self.config = config.clone();
        self
    }

    pub fn build(self) -> StandardEventBus<M> {
        let failure_handler = self
            .failure_handler
            .unwrap_or_else(|| default_failure_handler(&self.config));
        StandardEventBus::from_parts(failure_handler, &self.config)
    }

    /// Builds a bus that can be shared between threads.
    pub fn build_locking(self) -> LockingEventBus<M> {
        LockingEventBus::from_bus(self.build())
    }
}

impl<M: 'static> Default for EventBusBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn default_failure_handler<M: 'static>(config: &BusConfig) -> FailureHandler<M> {
    if !config.log_delivery_failures {
        return Arc::new(|_: &PublicationError<M>| {});
    }
    Arc::new(|err: &PublicationError<M>| {
        warn!(
            topic = %err.topic(),
            subscription = err.subscription().id().get(),
            subscriber = err.subscription().subscriber().get(),
            error = %err.cause(),
            "message delivery failed"
        );
    })
}
