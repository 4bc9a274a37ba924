use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::trace;

use super::optimized::OptimizedPublisher;
use crate::{error::FailureHandler, subscribe::Subscription, topic::Topic};

/// Outcome of one publish call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err`; each one was reported.
    pub failed: usize,
}

/// Cached fan-out entry of one topic.
///
/// A cheap handle: clones share the entry, and the cache keeps swapping the
/// entry's [`OptimizedPublisher`] as subscriptions come and go. Holding a
/// `Publisher` is the fast path for a hot topic.
pub struct Publisher<M> {
    inner: Arc<PublisherInner<M>>,
}

struct PublisherInner<M> {
    topic: Topic,
    current: RwLock<OptimizedPublisher<M>>,
    failures: FailureHandler<M>,
    trace_publish: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl PublishSummary {
    /// Handlers invoked.
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl<M> Publisher<M> {
    pub(crate) fn new(
        topic: Topic,
        initial: OptimizedPublisher<M>,
        failures: FailureHandler<M>,
        trace_publish: bool,
    ) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                topic,
                current: RwLock::new(initial),
                failures,
                trace_publish,
            }),
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.inner.topic
    }

    /// Delivers `message` to the subscriptions current at call time.
    ///
    /// The lock is held only to clone the snapshot; handlers run without it,
    /// so they may subscribe, unsubscribe or publish again.
    pub fn publish(
        &self,
        message: &M,
    ) -> PublishSummary {
        let snapshot = self.snapshot();
        let failures = &self.inner.failures;
        let summary = snapshot.publish(&self.inner.topic, message, &mut |err| failures(&err));

        if self.inner.trace_publish {
            trace!(
                topic = %self.inner.topic,
                delivered = summary.delivered,
                failed = summary.failed,
                "message published"
            );
        }
        summary
    }

    /// The current version of the fan-out list.
    pub fn snapshot(&self) -> OptimizedPublisher<M> {
        self.inner.current.read().clone()
    }

    /// Live subscriptions, in delivery order.
    pub fn subscriptions(&self) -> Vec<Subscription<M>> {
        self.snapshot()
            .subscriptions()
            .iter()
            .filter(|subscription| !subscription.is_cancelled())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles point at the same cache entry.
    pub fn ptr_eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Swaps in the version computed from the current one.
    pub(crate) fn update<F>(
        &self,
        f: F,
    ) where
        F: FnOnce(&OptimizedPublisher<M>) -> OptimizedPublisher<M>,
    {
        let mut current = self.inner.current.write();
        let next = f(&current);
        *current = next;
    }

    pub(crate) fn clear(&self) {
        *self.inner.current.write() = OptimizedPublisher::Empty;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<M> Clone for Publisher<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> PartialEq for Publisher<M> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other)
    }
}

impl<M> Eq for Publisher<M> {}

impl<M> fmt::Debug for Publisher<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.inner.topic)
            .field("subscriptions", &*self.inner.current.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use anyhow::anyhow;

    use super::*;
    use crate::{
        error::PublicationError,
        subscribe::{detached_sink, SubscriberId},
    };

    fn silent() -> FailureHandler<u32> {
        Arc::new(|_: &PublicationError<u32>| {})
    }

    #[test]
    fn test_publish_reaches_current_subscriptions() {
        let topic = Topic::root("Ticks");
        let calls = Arc::new(AtomicUsize::new(0));
        let publisher = Publisher::new(topic.clone(), OptimizedPublisher::Empty, silent(), false);
        assert_eq!(publisher.publish(&1), PublishSummary::default());

        let subscription = {
            let calls = Arc::clone(&calls);
            Subscription::new(&topic, SubscriberId::new(), None, move |n: &u32| {
                calls.fetch_add(*n as usize, Ordering::SeqCst);
                Ok(())
            })
        };
        publisher.update(|current| current.added(&subscription));

        let summary = publisher.publish(&5);
        assert_eq!(summary.delivered, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(publisher.subscriptions(), vec![subscription]);
    }

    #[test]
    fn test_failures_go_to_handler() {
        let topic = Topic::root("Ticks");
        let reports = Arc::new(Mutex::new(Vec::new()));
        let failures: FailureHandler<u32> = {
            let reports = Arc::clone(&reports);
            Arc::new(move |err: &PublicationError<u32>| {
                reports.lock().unwrap().push(err.to_string());
            })
        };
        let failing = Subscription::new(&topic, SubscriberId::new(), None, |_: &u32| {
            Err(anyhow!("rejected"))
        });
        let publisher = Publisher::new(
            topic,
            OptimizedPublisher::from_subscriptions(vec![failing]),
            failures,
            true,
        );

        let summary = publisher.publish(&0);
        assert!(!summary.is_clean());
        assert_eq!(summary.total(), 1);
        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("rejected"));
    }

    #[test]
    fn test_subscriptions_hide_cancelled() {
        let topic = Topic::root("Ticks");
        let (subscription, cancel) = Subscription::cancellable(
            &topic,
            SubscriberId::new(),
            None,
            detached_sink(),
            |_: &u32, _| Ok(()),
        );
        let publisher = Publisher::new(
            topic,
            OptimizedPublisher::from_subscriptions(vec![subscription]),
            silent(),
            false,
        );

        assert_eq!(publisher.len(), 1);
        cancel.cancel();
        assert!(publisher.is_empty());
        assert_eq!(publisher.snapshot().len(), 1);
    }

    #[test]
    fn test_handles_share_the_entry() {
        let topic = Topic::root("Ticks");
        let publisher = Publisher::new(topic.clone(), OptimizedPublisher::Empty, silent(), false);
        let other = Publisher::new(topic, OptimizedPublisher::Empty, silent(), false);

        assert_eq!(publisher, publisher.clone());
        assert_ne!(publisher, other);
    }

    #[test]
    fn test_clear_empties_entry() {
        let topic = Topic::root("Ticks");
        let subscription = Subscription::new(&topic, SubscriberId::new(), None, |_: &u32| Ok(()));
        let publisher = Publisher::new(
            topic,
            OptimizedPublisher::from_subscriptions(vec![subscription]),
            silent(),
            false,
        );
        let held = publisher.clone();

        publisher.clear();
        assert!(held.is_empty());
        assert_eq!(held.publish(&1).total(), 0);
    }
}
