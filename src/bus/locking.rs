use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;

use super::{builder::EventBusBuilder, standard::StandardEventBus};
use crate::{
    error::HandlerResult,
    publish::{PublishSummary, Publisher},
    subscribe::{
        CancelHandle, CancelSink, MessageSubscriber, SubscriberId, Subscription, TopicFilter,
    },
    topic::Topic,
};

/// Thread-safe event bus: a [`StandardEventBus`] behind a `parking_lot`
/// read-write lock.
///
/// Clones share the same bus. Publishing only takes the lock long enough
/// to look up the publisher; handlers run with no bus lock held, so they
/// may subscribe, unsubscribe or publish themselves. Self-cancellation
/// takes effect immediately.
pub struct LockingEventBus<M> {
    inner: Arc<RwLock<StandardEventBus<M>>>,
}

impl<M: 'static> LockingEventBus<M> {
    pub fn new() -> Self {
        EventBusBuilder::new().build_locking()
    }

    pub fn builder() -> EventBusBuilder<M> {
        EventBusBuilder::new()
    }

    pub(crate) fn from_bus(bus: StandardEventBus<M>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(bus)),
        }
    }

    pub fn anonymous_subscriber(&self) -> SubscriberId {
        self.inner.read().anonymous_subscriber()
    }

    pub fn add_subscription(
        &self,
        subscription: Subscription<M>,
    ) -> bool {
        self.inner.write().add_subscription(subscription)
    }

    pub fn add_subscriptions<I>(
        &self,
        subscriptions: I,
    ) -> Vec<Subscription<M>>
    where
        I: IntoIterator<Item = Subscription<M>>,
    {
        self.inner.write().add_subscriptions(subscriptions)
    }

    pub fn remove_subscription(
        &self,
        subscription: &Subscription<M>,
    ) -> bool {
        self.inner.write().remove_subscription(subscription)
    }

    pub fn remove_all_subscriptions(
        &self,
        subscriber: SubscriberId,
    ) -> Vec<Subscription<M>> {
        self.inner.write().remove_all_subscriptions(subscriber)
    }

    pub fn subscribe<F>(
        &self,
        topic: &Topic,
        subscriber: SubscriberId,
        topic_filter: Option<TopicFilter>,
        handler: F,
    ) -> Subscription<M>
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner
            .write()
            .subscribe(topic, subscriber, topic_filter, handler)
    }

    pub fn on<F>(
        &self,
        topic: &Topic,
        handler: F,
    ) -> Subscription<M>
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner.write().on(topic, handler)
    }

    pub fn cancellable_on<F>(
        &self,
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

    /// Subscribes a handler that runs for exactly one message, even when
    /// several threads publish at once.
    pub fn once<F>(
        &self,
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

    /// Publisher of `topic`. The write lock is only taken to create it.
    pub fn get_publisher(
        &self,
        topic: &Topic,
    ) -> Publisher<M> {
        if let Some(publisher) = self.inner.read().find_publisher(topic) {
            return publisher;
        }
        self.inner.write().get_publisher(topic)
    }

    pub fn find_publisher(
        &self,
        topic: &Topic,
    ) -> Option<Publisher<M>> {
        self.inner.read().find_publisher(topic)
    }

    pub fn dispose_publisher(
        &self,
        topic: &Topic,
    ) -> bool {
        self.inner.write().dispose_publisher(topic)
    }

    pub fn find_subscriptions_for_topic(
        &self,
        topic: &Topic,
    ) -> Vec<Subscription<M>> {
        self.inner.read().find_subscriptions_for_topic(topic)
    }

    pub fn find_publishers_for(
        &self,
        subscription: &Subscription<M>,
    ) -> Vec<Publisher<M>> {
        self.inner.read().find_publishers_for(subscription)
    }

    pub fn publisher_count(&self) -> usize {
        self.inner.read().publisher_count()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.read().subscription_count()
    }

    /// Publishes `message` on `topic`. Handlers run on the calling thread
    /// after the lock is released.
    pub fn publish(
        &self,
        topic: &Topic,
        message: &M,
    ) -> PublishSummary {
        let publisher = self.get_publisher(topic);
        publisher.publish(message)
    }

    pub fn register_subscriber<S>(
        &self,
        subscriber: &S,
    ) -> Vec<Subscription<M>>
    where
        S: MessageSubscriber<M> + ?Sized,
    {
        self.inner.write().register_subscriber(subscriber)
    }

    pub fn unregister_subscriber<S>(
        &self,
        subscriber: &S,
    ) -> Vec<Subscription<M>>
    where
        S: MessageSubscriber<M> + ?Sized,
    {
        self.inner.write().unregister_subscriber(subscriber)
    }

    /// Sink that unregisters right away. Must not be invoked while this
    /// thread holds the bus lock.
    fn cancel_sink(&self) -> CancelSink<M> {
        let bus: Weak<RwLock<StandardEventBus<M>>> = Arc::downgrade(&self.inner);
        Arc::new(move |subscription: &Subscription<M>| {
            if let Some(bus) = bus.upgrade() {
                bus.write().remove_subscription(subscription);
            }
        })
    }
}

impl<M> Clone for LockingEventBus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: 'static> Default for LockingEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for LockingEventBus<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.inner.try_read() {
            Some(bus) => f.debug_tuple("LockingEventBus").field(&*bus).finish(),
            None => f.write_str("LockingEventBus(<locked>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_clones_share_state() {
        let bus: LockingEventBus<u32> = LockingEventBus::new();
        let other = bus.clone();
        let topic = Topic::root("Shared");
        let total = Arc::new(AtomicUsize::new(0));
        {
            let total = Arc::clone(&total);
            other.on(&topic, move |n: &u32| {
                total.fetch_add(*n as usize, Ordering::SeqCst);
                Ok(())
            });
        }

        bus.publish(&topic, &5);
        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert_eq!(other.publisher_count(), 1);
    }

    #[test]
    fn test_self_cancel_is_immediate() {
        let bus: LockingEventBus<u32> = LockingEventBus::new();
        let topic = Topic::root("Ticks");
        let (subscription, _) =
            bus.cancellable_on(&topic, SubscriberId::new(), |_: &u32, cancel| {
                cancel.cancel();
                Ok(())
            });

        assert_eq!(bus.publish(&topic, &1).delivered, 1);
        assert_eq!(bus.subscription_count(), 0);
        assert!(bus.find_publishers_for(&subscription).is_empty());
        assert_eq!(bus.publish(&topic, &2).total(), 0);
    }

    #[test]
    fn test_handler_may_subscribe_while_publishing() {
        let bus: LockingEventBus<u32> = LockingEventBus::new();
        let topic = Topic::root("Grow");
        {
            let inner_bus = bus.clone();
            let inner_topic = topic.clone();
            bus.once(&topic, SubscriberId::new(), move |_: &u32| {
                inner_bus.on(&inner_topic, |_: &u32| Ok(()));
                Ok(())
            });
        }

        // delivery works on the snapshot taken before the handler ran
        assert_eq!(bus.publish(&topic, &1).delivered, 1);
        assert_eq!(bus.find_subscriptions_for_topic(&topic).len(), 1);
        assert_eq!(bus.publish(&topic, &2).delivered, 1);
    }

    #[test]
    fn test_cancel_after_bus_dropped() {
        let bus: LockingEventBus<u32> = LockingEventBus::new();
        let (_subscription, cancel) =
            bus.cancellable_on(&Topic::root("Gone"), SubscriberId::new(), |_: &u32, _| Ok(()));
        drop(bus);
        assert!(cancel.cancel());
        assert!(!cancel.cancel());
    }

    #[test]
    fn test_debug_does_not_deadlock() {
        let bus: LockingEventBus<u32> = LockingEventBus::new();
        let _guard = bus.inner.write();
        assert_eq!(format!("{bus:?}"), "LockingEventBus(<locked>)");
    }
}
