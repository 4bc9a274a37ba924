use std::collections::{hash_map::Entry, HashMap};

use tracing::{debug, warn};

use super::{optimized::OptimizedPublisher, publisher::Publisher};
use crate::{
    config::BusConfig, error::FailureHandler, subscribe::Subscription, topic::Topic,
};

/// Topic to publisher cache.
///
/// Holds one [`Publisher`] per topic that was ever asked for, plus a
/// dependency index: for a subscription topic `K`, every cached publisher
/// whose topic is a subtopic of `K`. A subscription added or removed at `K`
/// only touches those publishers.
///
/// Every cached publisher holds exactly the registered subscriptions that
/// accept its topic, as long as all registry changes are pushed through
/// [`add_subscription_to_publishers`](Self::add_subscription_to_publishers)
/// and [`remove_subscription_from_publishers`](Self::remove_subscription_from_publishers).
pub struct StandardPublisherRegistry<M> {
    publishers: HashMap<Topic, Publisher<M>>,
    dependents: HashMap<Topic, Vec<Publisher<M>>>,
    failure_handler: FailureHandler<M>,
    trace_publish: bool,
    warn_threshold: Option<usize>,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<M> StandardPublisherRegistry<M> {
    pub fn new(
        failure_handler: FailureHandler<M>,
        config: &BusConfig,
    ) -> Self {
        Self {
            publishers: HashMap::new(),
            dependents: HashMap::new(),
            failure_handler,
            trace_publish: config.trace_publish,
            warn_threshold: config.publisher_warn_threshold,
        }
    }

    /// Cached publisher of `topic`. Never creates one.
    pub fn find_publisher(
        &self,
        topic: &Topic,
    ) -> Option<Publisher<M>> {
        self.publishers.get(topic).cloned()
    }

    /// Cached publisher of `topic`, created on first use.
    ///
    /// `seed` is called only on creation and must return the registered
    /// subscriptions that accept `topic`. A topic nobody listens to still
    /// gets a valid, empty publisher.
    pub fn find_or_create_publisher<F>(
        &mut self,
        topic: &Topic,
        seed: F,
    ) -> Publisher<M>
    where
        F: FnOnce(&Topic) -> Vec<Subscription<M>>,
    {
        if let Some(existing) = self.publishers.get(topic) {
            return existing.clone();
        }

        let initial = OptimizedPublisher::from_subscriptions(seed(topic));
        let seeded = initial.len();
        let publisher = Publisher::new(
            topic.clone(),
            initial,
            self.failure_handler.clone(),
            self.trace_publish,
        );

        for (key, dependents) in self.dependents.iter_mut() {
            if topic.is_subtopic_of(key) {
                dependents.push(publisher.clone());
            }
        }
        if let Entry::Vacant(slot) = self.dependents.entry(topic.clone()) {
            let mut dependents: Vec<_> = self
                .publishers
                .values()
                .filter(|existing| existing.topic().is_subtopic_of(topic))
                .cloned()
                .collect();
            dependents.push(publisher.clone());
            slot.insert(dependents);
        }

        self.publishers.insert(topic.clone(), publisher.clone());
        debug!(topic = %topic, subscriptions = seeded, "publisher created");

        if let Some(limit) = self.warn_threshold {
            if limit.checked_add(1) == Some(self.publishers.len()) {
                warn!(
                    publishers = self.publishers.len(),
                    limit,
                    "publisher cache exceeds the configured threshold; dispose unused topics"
                );
            }
        }

        publisher
    }

    /// Pushes a newly registered subscription into every dependent publisher
    /// whose topic it accepts.
    pub fn add_subscription_to_publishers(
        &mut self,
        subscription: &Subscription<M>,
    ) {
        for publisher in self.dependents_of(subscription.topic()) {
            if subscription.accepts_topic(publisher.topic()) {
                publisher.update(|current| current.added(subscription));
            }
        }
    }

    /// Drops an unregistered subscription from every dependent publisher.
    pub fn remove_subscription_from_publishers(
        &mut self,
        subscription: &Subscription<M>,
    ) {
        for publisher in self.dependents_of(subscription.topic()) {
            publisher.update(|current| current.removed(subscription));
        }
    }

    /// Evicts the publisher of `topic` and clears it, so handles still held
    /// elsewhere stop delivering. Returns whether one was cached.
    pub fn remove_publisher(
        &mut self,
        topic: &Topic,
    ) -> bool {
        let Some(publisher) = self.publishers.remove(topic) else {
            return false;
        };

        self.dependents.retain(|_, dependents| {
            dependents.retain(|dependent| !dependent.ptr_eq(&publisher));
            !dependents.is_empty()
        });
        publisher.clear();

        debug!(topic = %topic, "publisher disposed");
        true
    }

    /// Cached publishers that currently deliver to `subscription`, ordered by
    /// topic id.
    pub fn find_publishers_for(
        &self,
        subscription: &Subscription<M>,
    ) -> Vec<Publisher<M>> {
        let mut found: Vec<_> = self
            .publishers
            .values()
            .filter(|publisher| publisher.snapshot().contains(subscription))
            .cloned()
            .collect();
        found.sort_unstable_by(|a, b| a.topic().cmp(b.topic()));
        found
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// Topics with a cached publisher, ordered by id.
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<_> = self.publishers.keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    /// Dependents of `key`, indexing them on first use.
    fn dependents_of(
        &mut self,
        key: &Topic,
    ) -> &[Publisher<M>] {
        let publishers = &self.publishers;
        self.dependents.entry(key.clone()).or_insert_with(|| {
            publishers
                .values()
                .filter(|publisher| publisher.topic().is_subtopic_of(key))
                .cloned()
                .collect()
        })
    }
}

impl<M> std::fmt::Debug for StandardPublisherRegistry<M> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("StandardPublisherRegistry")
            .field("publishers", &self.publishers.len())
            .field("indexed_topics", &self.dependents.len())
            .finish()
    }
}
