use std::{
    cmp::Ordering as CmpOrdering,
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Weak,
    },
};

use crate::{error::HandlerResult, topic::Topic};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a subscription. Grows with creation order, which is also the
/// delivery order inside a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Identity of the party that owns a group of subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Extra predicate on the published topic, on top of the hierarchy check.
pub type TopicFilter = Arc<dyn Fn(&Topic) -> bool + Send + Sync>;

/// Type-erased message handler.
pub type MessageHandler<M> = Box<dyn Fn(&M) -> HandlerResult + Send + Sync>;

/// Invoked once when a subscription cancels itself. Each bus installs its own.
pub type CancelSink<M> = Arc<dyn Fn(&Subscription<M>) + Send + Sync>;

/// A registered interest: a topic, its owner, an optional topic filter and
/// the handler.
///
/// Cheap to clone; clones share identity. Equality, hashing and ordering use
/// [`SubscriptionId`] only.
pub struct Subscription<M> {
    inner: Arc<SubscriptionInner<M>>,
}

pub(crate) struct SubscriptionInner<M> {
    id: SubscriptionId,
    topic: Topic,
    subscriber: SubscriberId,
    topic_filter: Option<TopicFilter>,
    handler: MessageHandler<M>,
    cancelled: AtomicBool,
}

/// Capability to cancel one subscription, handed to its own handler.
///
/// Holds the subscription weakly, so it never keeps a dropped subscription
/// alive.
pub struct CancelHandle<M> {
    target: Weak<SubscriptionInner<M>>,
    sink: CancelSink<M>,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl SubscriberId {
    /// Allocates a process-unique subscriber id.
    pub fn new() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl<M: 'static> Subscription<M> {
    /// Creates a plain subscription.
    ///
    /// It receives every message published on `topic` or any of its
    /// subtopics, narrowed by `topic_filter` when present.
    pub fn new<F>(
        topic: &Topic,
        subscriber: SubscriberId,
        topic_filter: Option<TopicFilter>,
        handler: F,
    ) -> Self
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        Self::from_parts(topic.clone(), subscriber, topic_filter, Box::new(handler))
    }

    /// Creates a subscription whose handler may cancel it.
    ///
    /// `sink` is told about the cancellation; buses pass a sink that removes
    /// the subscription from their registry.
    pub fn cancellable<F>(
        topic: &Topic,
        subscriber: SubscriberId,
        topic_filter: Option<TopicFilter>,
        sink: CancelSink<M>,
        handler: F,
    ) -> (Self, CancelHandle<M>)
    where
        F: Fn(&M, &CancelHandle<M>) -> HandlerResult + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|target: &Weak<SubscriptionInner<M>>| {
            let own = CancelHandle {
                target: target.clone(),
                sink: Arc::clone(&sink),
            };
            SubscriptionInner {
                id: next_subscription_id(),
                topic: topic.clone(),
                subscriber,
                topic_filter,
                handler: Box::new(move |message: &M| handler(message, &own)),
                cancelled: AtomicBool::new(false),
            }
        });

        let handle = CancelHandle {
            target: Arc::downgrade(&inner),
            sink,
        };
        (Self { inner }, handle)
    }

    /// Creates a subscription that is delivered at most one message.
    ///
    /// The subscription cancels itself before the handler runs, so a publish
    /// made from inside the handler does not reach it again.
    pub fn once<F>(
        topic: &Topic,
        subscriber: SubscriberId,
        topic_filter: Option<TopicFilter>,
        sink: CancelSink<M>,
        handler: F,
    ) -> Self
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        let (subscription, _) =
            Self::cancellable(topic, subscriber, topic_filter, sink, move |message, cancel| {
                if cancel.cancel() {
                    handler(message)
                } else {
                    Ok(())
                }
            });
        subscription
    }

    pub(crate) fn from_parts(
        topic: Topic,
        subscriber: SubscriberId,
        topic_filter: Option<TopicFilter>,
        handler: MessageHandler<M>,
    ) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                id: next_subscription_id(),
                topic,
                subscriber,
                topic_filter,
                handler,
                cancelled: AtomicBool::new(false),
            }),
        }
    }
}

impl<M> Subscription<M> {
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    pub fn topic(&self) -> &Topic {
        &self.inner.topic
    }

    pub fn subscriber(&self) -> SubscriberId {
        self.inner.subscriber
    }

    pub fn topic_filter(&self) -> Option<&TopicFilter> {
        self.inner.topic_filter.as_ref()
    }

    /// Whether a message published on `topic` is for this subscription.
    ///
    /// `topic` must be the subscription's topic or one of its subtopics, and
    /// pass the topic filter if there is one.
    pub fn accepts_topic(
        &self,
        topic: &Topic,
    ) -> bool {
        topic.is_subtopic_of(&self.inner.topic)
            && self
                .inner
                .topic_filter
                .as_ref()
                .map_or(true, |filter| filter(topic))
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Runs the handler. Does not look at the cancelled flag.
    pub fn handle(
        &self,
        message: &M,
    ) -> HandlerResult {
        (self.inner.handler)(message)
    }
}

impl<M> CancelHandle<M> {
    /// Cancels the subscription.
    ///
    /// Only the first call on any handle of the subscription wins: it marks
    /// the subscription, notifies the sink and returns `true`. Every later
    /// call returns `false`.
    pub fn cancel(&self) -> bool {
        let Some(inner) = self.target.upgrade() else {
            return false;
        };
        if inner
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        tracing::debug!(
            subscription = inner.id.get(),
            topic = %inner.topic,
            "subscription cancelled"
        );
        (self.sink)(&Subscription { inner });
        true
    }

    /// `true` once cancelled, or when the subscription no longer exists.
    pub fn is_cancelled(&self) -> bool {
        self.target
            .upgrade()
            .map_or(true, |inner| inner.cancelled.load(Ordering::Acquire))
    }
}

/// Sink that only marks the subscription. For subscriptions managed outside
/// a bus.
pub fn detached_sink<M>() -> CancelSink<M> {
    Arc::new(|_: &Subscription<M>| {})
}

fn next_subscription_id() -> SubscriptionId {
    SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for SubscriberId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<M> Clone for Subscription<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> PartialEq for Subscription<M> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<M> Eq for Subscription<M> {}

impl<M> Hash for Subscription<M> {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.inner.id.hash(state);
    }
}

impl<M> PartialOrd for Subscription<M> {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Subscription<M> {
    fn cmp(
        &self,
        other: &Self,
    ) -> CmpOrdering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id.0)
            .field("topic", &self.inner.topic)
            .field("subscriber", &self.inner.subscriber.0)
            .field("filtered", &self.inner.topic_filter.is_some())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<M> Clone for CancelHandle<M> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<M> fmt::Debug for CancelHandle<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
