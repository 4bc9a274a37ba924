/// Event buses: single-owner and lock-protected.
pub mod bus;
/// Bus and logging settings.
pub mod config;
/// Delivery failures and handler results.
pub mod error;
/// `tracing-subscriber` setup.
pub mod logging;
/// Publishers and the topic to publisher cache.
pub mod publish;
/// Subscriptions, their builder and registries.
pub mod subscribe;
/// Hierarchical topics.
pub mod topic;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Buses.
pub use crate::bus::{EventBusBuilder, LockingEventBus, StandardEventBus};
/// Settings.
pub use crate::config::{BusConfig, Settings};
/// Handler and delivery errors.
pub use crate::error::{FailureHandler, HandlerResult, PublicationError};
/// Logging setup.
pub use crate::logging::{init_logging, LogFormat, LoggingConfig};
/// Publishing side.
pub use crate::publish::{OptimizedPublisher, PublishSummary, Publisher, StandardPublisherRegistry};
/// Subscribing side.
pub use crate::subscribe::{
    CancelHandle, MessageSubscriber, SubscriberId, Subscription, SubscriptionBuilder,
    SubscriptionId, SubscriptionRegistry, TopicFilter,
};
/// Topics.
pub use crate::topic::Topic;
/// Library-level errors.
pub use topica_error::{ErrorExt, StackError, StatusCode, TopicaResult};
