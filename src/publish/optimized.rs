use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use anyhow::anyhow;

use super::publisher::PublishSummary;
use crate::{error::PublicationError, subscribe::Subscription, topic::Topic};

/// Immutable fan-out list of one topic.
///
/// `added` and `removed` never touch the receiver; they return the next
/// version, or a clone of `self` when nothing changes. A publish that already
/// holds a version keeps iterating it while newer versions get swapped in.
///
/// Shapes: `Empty`, `Single`, and `Many` for two or more subscriptions
/// sorted by [`SubscriptionId`](crate::subscribe::SubscriptionId).
pub enum OptimizedPublisher<M> {
    Empty,
    Single(Subscription<M>),
    Many(Arc<[Subscription<M>]>),
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<M> OptimizedPublisher<M> {
    /// Builds the smallest shape that holds `subscriptions`. Duplicates
    /// collapse.
    pub fn from_subscriptions<I>(subscriptions: I) -> Self
    where
        I: IntoIterator<Item = Subscription<M>>,
    {
        let mut list: Vec<_> = subscriptions.into_iter().collect();
        list.sort_unstable();
        list.dedup();
        Self::from_sorted(list)
    }

    fn from_sorted(mut list: Vec<Subscription<M>>) -> Self {
        match list.len() {
            0 => Self::Empty,
            1 => list.pop().map_or(Self::Empty, Self::Single),
            _ => Self::Many(list.into()),
        }
    }

    /// Subscriptions in delivery order.
    pub fn subscriptions(&self) -> &[Subscription<M>] {
        match self {
            Self::Empty => &[],
            Self::Single(subscription) => std::slice::from_ref(subscription),
            Self::Many(list) => list,
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn contains(
        &self,
        subscription: &Subscription<M>,
    ) -> bool {
        self.subscriptions().binary_search(subscription).is_ok()
    }

    /// The version that also holds `subscription`.
    pub fn added(
        &self,
        subscription: &Subscription<M>,
    ) -> Self {
        match self {
            Self::Empty => Self::Single(subscription.clone()),
            Self::Single(existing) if existing == subscription => self.clone(),
            Self::Single(existing) => {
                let mut list = vec![existing.clone(), subscription.clone()];
                list.sort_unstable();
                Self::Many(list.into())
            }
            Self::Many(list) => match list.binary_search(subscription) {
                Ok(_) => self.clone(),
                Err(pos) => {
                    let mut next = Vec::with_capacity(list.len() + 1);
                    next.extend_from_slice(&list[..pos]);
                    next.push(subscription.clone());
                    next.extend_from_slice(&list[pos..]);
                    Self::Many(next.into())
                }
            },
        }
    }

    /// The version without `subscription`. Collapses to `Single` or `Empty`
    /// when few enough remain.
    pub fn removed(
        &self,
        subscription: &Subscription<M>,
    ) -> Self {
        match self {
            Self::Single(existing) if existing == subscription => Self::Empty,
            Self::Empty | Self::Single(_) => self.clone(),
            Self::Many(list) => match list.binary_search(subscription) {
                Ok(pos) => {
                    let mut next = list.to_vec();
                    next.remove(pos);
                    Self::from_sorted(next)
                }
                Err(_) => self.clone(),
            },
        }
    }

    /// Whether both values are the same version (not merely equal content).
    pub fn ptr_eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Single(a), Self::Single(b)) => a == b,
            (Self::Many(a), Self::Many(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Delivers `message` to every live subscription, in id order.
    ///
    /// A handler that returns `Err` or panics is reported through
    /// `on_failure` and does not stop the loop. Cancelled subscriptions are
    /// skipped.
    pub fn publish(
        &self,
        topic: &Topic,
        message: &M,
        on_failure: &mut dyn FnMut(PublicationError<M>),
    ) -> PublishSummary {
        let mut summary = PublishSummary::default();
        for subscription in self.subscriptions() {
            if subscription.is_cancelled() {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscription.handle(message)))
                .unwrap_or_else(|payload| Err(panic_cause(payload)));
            match outcome {
                Ok(()) => summary.delivered += 1,
                Err(cause) => {
                    summary.failed += 1;
                    on_failure(PublicationError::new(
                        topic.clone(),
                        subscription.clone(),
                        cause,
                    ));
                }
            }
        }
        summary
    }
}

fn panic_cause(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow!("handler panicked: {message}")
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<M> Clone for OptimizedPublisher<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Single(subscription) => Self::Single(subscription.clone()),
            Self::Many(list) => Self::Many(Arc::clone(list)),
        }
    }
}

impl<M> Default for OptimizedPublisher<M> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Equal when holding the same subscriptions, whatever the version.
impl<M> PartialEq for OptimizedPublisher<M> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.subscriptions() == other.subscriptions()
    }
}

impl<M> Eq for OptimizedPublisher<M> {}

impl<M> fmt::Debug for OptimizedPublisher<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let ids: Vec<u64> = self.subscriptions().iter().map(|s| s.id().get()).collect();
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Single(_) => f.debug_tuple("Single").field(&ids[0]).finish(),
            Self::Many(_) => f.debug_tuple("Many").field(&ids).finish(),
        }
    }
}
