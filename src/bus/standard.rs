use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::debug;

use super::builder::EventBusBuilder;
use crate::{
    config::BusConfig,
    error::{FailureHandler, HandlerResult},
    publish::{PublishSummary, Publisher, StandardPublisherRegistry},
    subscribe::{
        CancelHandle, CancelSink, MessageSubscriber, PublisherUpdatingSubscriptionRegistry,
        StandardSubscriptionRegistry, SubscriberId, Subscription, SubscriptionRegistry,
        TopicFilter,
    },
    topic::Topic,
};

type Registry<M> = PublisherUpdatingSubscriptionRegistry<StandardSubscriptionRegistry<M>, M>;

/// Event bus without internal locking.
///
/// Every change takes `&mut self`, so the borrow checker enforces the
/// single-writer contract; wrap it in [`LockingEventBus`](super::LockingEventBus)
/// to share it between threads. [`Publisher`] handles obtained from it can
/// still be published to from anywhere.
///
/// A handler cannot reach the bus while it is being published to, so a
/// subscription that cancels itself is only marked and queued. The queue is
/// drained at the start of the next `&mut self` call, after every
/// [`publish`](Self::publish), or by [`apply_cancellations`](Self::apply_cancellations).
/// Until then the marked subscription is skipped by deliveries and hidden
/// from queries.
pub struct StandardEventBus<M> {
    registry: Registry<M>,
    cancelled: Arc<Mutex<Vec<Subscription<M>>>>,
    anonymous: SubscriberId,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<M: 'static> StandardEventBus<M> {
    /// Bus with default settings and a failure handler that logs.
    pub fn new() -> Self {
        EventBusBuilder::new().build()
    }

    pub fn builder() -> EventBusBuilder<M> {
        EventBusBuilder::new()
    }

    pub(crate) fn from_parts(
        failure_handler: FailureHandler<M>,
        config: &BusConfig,
    ) -> Self {
        Self {
            registry: PublisherUpdatingSubscriptionRegistry::new(
                StandardSubscriptionRegistry::new(),
                StandardPublisherRegistry::new(failure_handler, config),
            ),
            cancelled: Arc::new(Mutex::new(Vec::new())),
            anonymous: SubscriberId::new(),
        }
    }

    /// Owner of the subscriptions made with [`on`](Self::on).
    pub fn anonymous_subscriber(&self) -> SubscriberId {
        self.anonymous
    }

    /// Registers a prepared subscription. Returns `false` if it was already
    /// registered or is cancelled.
    pub fn add_subscription(
        &mut self,
        subscription: Subscription<M>,
    ) -> bool {
        self.apply_cancellations();
        self.registry.register(subscription)
    }

    /// Registers many subscriptions; returns those that were new.
    pub fn add_subscriptions<I>(
        &mut self,
        subscriptions: I,
    ) -> Vec<Subscription<M>>
    where
        I: IntoIterator<Item = Subscription<M>>,
    {
        self.apply_cancellations();
        self.registry
            .register_all(subscriptions.into_iter().collect())
    }

    /// Unsubscribes. In-flight publishes may still deliver to it; later ones
    /// will not.
    ///
    /// Pending self-cancellations are applied first. A once-subscription
    /// that already fired through a held [`Publisher`] handle is therefore
    /// gone by the time it is looked up, and this returns `false`.
    pub fn remove_subscription(
        &mut self,
        subscription: &Subscription<M>,
    ) -> bool {
        self.apply_cancellations();
        self.registry.unregister(subscription)
    }

    /// Unsubscribes everything owned by `subscriber`.
    pub fn remove_all_subscriptions(
        &mut self,
        subscriber: SubscriberId,
    ) -> Vec<Subscription<M>> {
        self.apply_cancellations();
        self.registry.unregister_all(subscriber)
    }

    /// Subscribes `handler` to `topic` and its subtopics.
    pub fn subscribe<F>(
        &mut self,
        topic: &Topic,
        subscriber: SubscriberId,
        topic_filter: Option<TopicFilter>,
        handler: F,
    ) -> Subscription<M>
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        let subscription = Subscription::new(topic, subscriber, topic_filter, handler);
        self.add_subscription(subscription.clone());
        subscription
    }

    /// Shorthand for [`subscribe`](Self::subscribe) with the bus's anonymous
    /// subscriber and no topic filter.
    pub fn on<F>(
        &mut self,
        topic: &Topic,
        handler: F,
    ) -> Subscription<M>
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        let anonymous = self.anonymous;
        self.subscribe(topic, anonymous, None, handler)
    }

    /// Subscribes a handler that receives its own [`CancelHandle`].
    pub fn cancellable_on<F>(
        &mut self,
        topic: &Topic,
        subscriber: SubscriberId,
        handler: F,
    ) -> (Subscription<M>, CancelHandle<M>)
    where
        F: Fn(&M, &CancelHandle<M>) -> HandlerResult + Send + Sync + 'static,
    {
        let (subscription, cancel) =
            Subscription::cancellable(topic, subscriber, None, self.cancel_sink(), handler);
        self.add_subscription(subscription.clone());
        (subscription, cancel)
    }

    /// Subscribes a handler that runs for the first matching message only.
    pub fn once<F>(
        &mut self,
        topic: &Topic,
        subscriber: SubscriberId,
        handler: F,
    ) -> Subscription<M>
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        let subscription = Subscription::once(topic, subscriber, None, self.cancel_sink(), handler);
        self.add_subscription(subscription.clone());
        subscription
    }

    /// Publisher of `topic`, created and seeded on first use.
    pub fn get_publisher(
        &mut self,
        topic: &Topic,
    ) -> Publisher<M> {
        self.apply_cancellations();
        self.registry.get_publisher(topic)
    }

    pub fn find_publisher(
        &self,
        topic: &Topic,
    ) -> Option<Publisher<M>> {
        self.registry.find_publisher(topic)
    }

    /// Drops the cached publisher of `topic`. Handles still held elsewhere
    /// become empty; the next [`get_publisher`](Self::get_publisher) builds
    /// a fresh one.
    pub fn dispose_publisher(
        &mut self,
        topic: &Topic,
    ) -> bool {
        self.apply_cancellations();
        self.registry.remove_publisher(topic)
    }

    /// Live subscriptions accepting `topic`, in id order.
    pub fn find_subscriptions_for_topic(
        &self,
        topic: &Topic,
    ) -> Vec<Subscription<M>> {
        self.registry.find_subscriptions_for_topic(topic)
    }

    /// Cached publishers currently delivering to `subscription`.
    pub fn find_publishers_for(
        &self,
        subscription: &Subscription<M>,
    ) -> Vec<Publisher<M>> {
        self.registry.publishers().find_publishers_for(subscription)
    }

    pub fn publisher_count(&self) -> usize {
        self.registry.publishers().len()
    }

    /// Registered subscriptions, including cancelled ones not yet drained.
    pub fn subscription_count(&self) -> usize {
        self.registry.registry().len()
    }

    /// Publishes `message` on `topic`.
    pub fn publish(
        &mut self,
        topic: &Topic,
        message: &M,
    ) -> PublishSummary {
        let summary = self.get_publisher(topic).publish(message);
        self.apply_cancellations();
        summary
    }

    /// Registers every subscription `subscriber` declares; returns the new
    /// ones.
    pub fn register_subscriber<S>(
        &mut self,
        subscriber: &S,
    ) -> Vec<Subscription<M>>
    where
        S: MessageSubscriber<M> + ?Sized,
    {
        let added = self.add_subscriptions(subscriber.subscriptions());
        debug!(
            subscriber = subscriber.subscriber_id().get(),
            added = added.len(),
            "subscriber registered"
        );
        added
    }

    /// Removes every subscription owned by `subscriber`.
    pub fn unregister_subscriber<S>(
        &mut self,
        subscriber: &S,
    ) -> Vec<Subscription<M>>
    where
        S: MessageSubscriber<M> + ?Sized,
    {
        self.remove_all_subscriptions(subscriber.subscriber_id())
    }

    /// Unregisters subscriptions that cancelled themselves since the last
    /// call. Returns how many were removed.
    pub fn apply_cancellations(&mut self) -> usize {
        let pending = std::mem::take(&mut *self.cancelled.lock());
        pending
            .iter()
            .filter(|subscription| self.registry.unregister(subscription))
            .count()
    }

    /// Sink queueing self-cancelled subscriptions of this bus.
    pub(crate) fn cancel_sink(&self) -> CancelSink<M> {
        let queue: Weak<Mutex<Vec<Subscription<M>>>> = Arc::downgrade(&self.cancelled);
        Arc::new(move |subscription: &Subscription<M>| {
            if let Some(queue) = queue.upgrade() {
                queue.lock().push(subscription.clone());
            }
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<M: 'static> Default for StandardEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for StandardEventBus<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StandardEventBus")
            .field("subscriptions", self.registry.registry())
            .field("publishers", self.registry.publishers())
            .field("pending_cancellations", &self.cancelled.lock().len())
            .finish()
    }
}
