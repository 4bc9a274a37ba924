use tracing::debug;

use super::{
    registry::SubscriptionRegistry,
    subscription::{SubscriberId, Subscription},
};
use crate::{
    publish::{Publisher, StandardPublisherRegistry},
    topic::Topic,
};

/// Subscription registry that keeps a publisher cache in sync.
///
/// Every successful change of the wrapped registry is pushed to the cache
/// right away, and new publishers are seeded from the registry. Together
/// that keeps every cached publisher equal to the set of registered
/// subscriptions accepting its topic.
pub struct PublisherUpdatingSubscriptionRegistry<R, M> {
    registry: R,
    publishers: StandardPublisherRegistry<M>,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<R, M> PublisherUpdatingSubscriptionRegistry<R, M>
where
    R: SubscriptionRegistry<M>,
{
    pub fn new(
        registry: R,
        publishers: StandardPublisherRegistry<M>,
    ) -> Self {
        Self {
            registry,
            publishers,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn publishers(&self) -> &StandardPublisherRegistry<M> {
        &self.publishers
    }

    /// Publisher of `topic`, seeded from the registry on first use.
    pub fn get_publisher(
        &mut self,
        topic: &Topic,
    ) -> Publisher<M> {
        let registry = &self.registry;
        self.publishers
            .find_or_create_publisher(topic, |topic| registry.find_subscriptions_for_topic(topic))
    }

    pub fn find_publisher(
        &self,
        topic: &Topic,
    ) -> Option<Publisher<M>> {
        self.publishers.find_publisher(topic)
    }

    pub fn remove_publisher(
        &mut self,
        topic: &Topic,
    ) -> bool {
        self.publishers.remove_publisher(topic)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<R, M> SubscriptionRegistry<M> for PublisherUpdatingSubscriptionRegistry<R, M>
where
    R: SubscriptionRegistry<M>,
{
    fn register(
        &mut self,
        subscription: Subscription<M>,
    ) -> bool {
        if !self.registry.register(subscription.clone()) {
            return false;
        }
        self.publishers.add_subscription_to_publishers(&subscription);
        debug!(
            subscription = subscription.id().get(),
            subscriber = subscription.subscriber().get(),
            topic = %subscription.topic(),
            "subscription registered"
        );
        true
    }

    fn unregister(
        &mut self,
        subscription: &Subscription<M>,
    ) -> bool {
        if !self.registry.unregister(subscription) {
            return false;
        }
        self.publishers.remove_subscription_from_publishers(subscription);
        debug!(
            subscription = subscription.id().get(),
            topic = %subscription.topic(),
            "subscription unregistered"
        );
        true
    }

    fn register_all(
        &mut self,
        subscriptions: Vec<Subscription<M>>,
    ) -> Vec<Subscription<M>> {
        let added = self.registry.register_all(subscriptions);
        for subscription in &added {
            self.publishers.add_subscription_to_publishers(subscription);
        }
        debug!(added = added.len(), "subscriptions registered in bulk");
        added
    }

    fn unregister_all(
        &mut self,
        subscriber: SubscriberId,
    ) -> Vec<Subscription<M>> {
        let removed = self.registry.unregister_all(subscriber);
        for subscription in &removed {
            self.publishers.remove_subscription_from_publishers(subscription);
        }
        debug!(
            subscriber = subscriber.get(),
            removed = removed.len(),
            "subscriber unregistered"
        );
        removed
    }

    fn find_subscriptions_for_topic(
        &self,
        topic: &Topic,
    ) -> Vec<Subscription<M>> {
        self.registry.find_subscriptions_for_topic(topic)
    }
}
