//! Subscribing side: subscriptions, their builder and the registries.

pub mod builder;
pub mod registry;
pub mod subscriber;
pub mod subscription;
pub mod updating;

pub use builder::SubscriptionBuilder;
pub use registry::{StandardSubscriptionRegistry, SubscriptionRegistry};
pub use subscriber::MessageSubscriber;
pub use subscription::{
    detached_sink, CancelHandle, CancelSink, MessageHandler, SubscriberId, Subscription,
    SubscriptionId, TopicFilter,
};
pub use updating::PublisherUpdatingSubscriptionRegistry;
