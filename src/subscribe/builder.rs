use std::sync::Arc;

use super::subscription::{MessageHandler, SubscriberId, Subscription, TopicFilter};
use crate::{error::HandlerResult, topic::Topic};

type Decorator<M, U> = Box<dyn FnOnce(MessageHandler<U>) -> MessageHandler<M> + Send>;

/// Assembles a [`Subscription`] step by step.
///
/// `M` is the bus message type, `U` the type the final handler sees after
/// the mapping steps. Message filters and mappings run in the order they
/// were added.
///
/// ```ignore
/// let subscription = Subscription::builder(&orders, owner)
///     .reject_subtopics()
///     .filter_mapped(|event: &Event| event.as_order())
///     .filter_message(|order: &Order| order.total > 100)
///     .build(|order| notify(order));
/// ```
pub struct SubscriptionBuilder<M, U = M> {
    topic: Topic,
    subscriber: SubscriberId,
    topic_filter: Option<TopicFilter>,
    decorate: Decorator<M, U>,
}

impl<M: 'static> Subscription<M> {
    pub fn builder(
        topic: &Topic,
        subscriber: SubscriberId,
    ) -> SubscriptionBuilder<M, M> {
        SubscriptionBuilder {
            topic: topic.clone(),
            subscriber,
            topic_filter: None,
            decorate: Box::new(|handler: MessageHandler<M>| handler),
        }
    }
}

impl<M: 'static, U: 'static> SubscriptionBuilder<M, U> {
    /// Adds a predicate on the published topic. Several calls are ANDed.
    pub fn filter_topic<P>(
        mut self,
        predicate: P,
    ) -> Self
    where
        P: Fn(&Topic) -> bool + Send + Sync + 'static,
    {
        let combined: TopicFilter = match self.topic_filter.take() {
            None => Arc::new(predicate),
            Some(previous) => Arc::new(move |topic: &Topic| previous(topic) && predicate(topic)),
        };
        self.topic_filter = Some(combined);
        self
    }

    /// Accepts only messages published on exactly this topic.
    pub fn reject_subtopics(self) -> Self {
        let exact = self.topic.clone();
        self.filter_topic(move |topic| *topic == exact)
    }

    /// Skips messages for which `predicate` is false. Skipped messages count
    /// as delivered.
    pub fn filter_message<P>(
        self,
        predicate: P,
    ) -> Self
    where
        P: Fn(&U) -> bool + Send + Sync + 'static,
    {
        let outer = self.decorate;
        Self {
            decorate: Box::new(move |handler: MessageHandler<U>| {
                let filtered: MessageHandler<U> = Box::new(move |message: &U| {
                    if predicate(message) {
                        handler(message)
                    } else {
                        Ok(())
                    }
                });
                outer(filtered)
            }),
            ..self
        }
    }

    /// Hands the handler `f(message)` instead of the message.
    pub fn mapped<R, F>(
        self,
        f: F,
    ) -> SubscriptionBuilder<M, R>
    where
        R: 'static,
        F: Fn(&U) -> R + Send + Sync + 'static,
    {
        let outer = self.decorate;
        SubscriptionBuilder {
            topic: self.topic,
            subscriber: self.subscriber,
            topic_filter: self.topic_filter,
            decorate: Box::new(move |handler: MessageHandler<R>| {
                let mapped: MessageHandler<U> = Box::new(move |message: &U| handler(&f(message)));
                outer(mapped)
            }),
        }
    }

    /// Maps and filters in one step: `None` skips the message.
    pub fn filter_mapped<R, F>(
        self,
        f: F,
    ) -> SubscriptionBuilder<M, R>
    where
        R: 'static,
        F: Fn(&U) -> Option<R> + Send + Sync + 'static,
    {
        let outer = self.decorate;
        SubscriptionBuilder {
            topic: self.topic,
            subscriber: self.subscriber,
            topic_filter: self.topic_filter,
            decorate: Box::new(move |handler: MessageHandler<R>| {
                let mapped: MessageHandler<U> = Box::new(move |message: &U| match f(message) {
                    Some(value) => handler(&value),
                    None => Ok(()),
                });
                outer(mapped)
            }),
        }
    }

    pub fn build<F>(
        self,
        handler: F,
    ) -> Subscription<M>
    where
        F: Fn(&U) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: MessageHandler<U> = Box::new(handler);
        let handler = (self.decorate)(handler);
        Subscription::from_parts(self.topic, self.subscriber, self.topic_filter, handler)
    }
}
