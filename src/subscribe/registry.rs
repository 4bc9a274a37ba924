use std::collections::{BTreeSet, HashMap};

use super::subscription::{SubscriberId, Subscription};
use crate::topic::Topic;

/// Index of live subscriptions, grouped by subscriber.
///
/// Knows nothing about publishers. Keeping publishers in sync is the job of
/// [`PublisherUpdatingSubscriptionRegistry`](super::PublisherUpdatingSubscriptionRegistry).
pub trait SubscriptionRegistry<M> {
    /// Adds `subscription`. Returns `false` if it was already present or is
    /// cancelled.
    fn register(
        &mut self,
        subscription: Subscription<M>,
    ) -> bool;

    /// Removes `subscription`. Returns whether it was present.
    fn unregister(
        &mut self,
        subscription: &Subscription<M>,
    ) -> bool;

    /// Registers every subscription and returns the ones that were actually
    /// added, in id order.
    fn register_all(
        &mut self,
        subscriptions: Vec<Subscription<M>>,
    ) -> Vec<Subscription<M>> {
        let mut added: Vec<_> = subscriptions
            .into_iter()
            .filter(|subscription| self.register(subscription.clone()))
            .collect();
        added.sort_unstable();
        added
    }

    /// Removes and returns every subscription owned by `subscriber`, in id
    /// order.
    fn unregister_all(
        &mut self,
        subscriber: SubscriberId,
    ) -> Vec<Subscription<M>>;

    /// Every live subscription that accepts messages published on `topic`,
    /// in id order.
    ///
    /// Only used to seed a new publisher; publishing never goes through here.
    fn find_subscriptions_for_topic(
        &self,
        topic: &Topic,
    ) -> Vec<Subscription<M>>;
}

/// Default [`SubscriptionRegistry`]: `subscriber -> ordered set`.
pub struct StandardSubscriptionRegistry<M> {
    subscriptions: HashMap<SubscriberId, BTreeSet<Subscription<M>>>,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<M> StandardSubscriptionRegistry<M> {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
        }
    }

    /// Total number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn contains(
        &self,
        subscription: &Subscription<M>,
    ) -> bool {
        self.subscriptions
            .get(&subscription.subscriber())
            .is_some_and(|set| set.contains(subscription))
    }

    /// Subscriptions owned by `subscriber`, in id order.
    pub fn subscriptions_of(
        &self,
        subscriber: SubscriberId,
    ) -> Vec<Subscription<M>> {
        self.subscriptions
            .get(&subscriber)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<M> SubscriptionRegistry<M> for StandardSubscriptionRegistry<M> {
    fn register(
        &mut self,
        subscription: Subscription<M>,
    ) -> bool {
        if subscription.is_cancelled() {
            return false;
        }
        self.subscriptions
            .entry(subscription.subscriber())
            .or_default()
            .insert(subscription)
    }

    fn unregister(
        &mut self,
        subscription: &Subscription<M>,
    ) -> bool {
        let subscriber = subscription.subscriber();
        let Some(set) = self.subscriptions.get_mut(&subscriber) else {
            return false;
        };
        let removed = set.remove(subscription);
        if set.is_empty() {
            self.subscriptions.remove(&subscriber);
        }
        removed
    }

    fn unregister_all(
        &mut self,
        subscriber: SubscriberId,
    ) -> Vec<Subscription<M>> {
        self.subscriptions
            .remove(&subscriber)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    fn find_subscriptions_for_topic(
        &self,
        topic: &Topic,
    ) -> Vec<Subscription<M>> {
        let mut found: Vec<_> = self
            .subscriptions
            .values()
            .flatten()
            .filter(|subscription| !subscription.is_cancelled() && subscription.accepts_topic(topic))
            .cloned()
            .collect();
        found.sort_unstable();
        found
    }
}

impl<M> Default for StandardSubscriptionRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for StandardSubscriptionRegistry<M> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("StandardSubscriptionRegistry")
            .field("subscribers", &self.subscriptions.len())
            .field("subscriptions", &self.len())
            .finish()
    }
}
