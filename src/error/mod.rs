use std::{any::Any, fmt, sync::Arc};

use topica_error::{ErrorExt, StatusCode};

use crate::{subscribe::Subscription, topic::Topic};

/// What a message handler returns. An `Err` counts as a delivery failure.
pub type HandlerResult = anyhow::Result<()>;

/// Receives every delivery failure of a bus.
///
/// Called on the publishing thread, right after the failing handler returned
/// and before the remaining subscriptions are served.
pub type FailureHandler<M> = Arc<dyn Fn(&PublicationError<M>) + Send + Sync>;

/// A handler failed while a message published on `topic` was delivered to
/// `subscription`.
pub struct PublicationError<M> {
    topic: Topic,
    subscription: Subscription<M>,
    cause: anyhow::Error,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<M> PublicationError<M> {
    pub fn new(
        topic: Topic,
        subscription: Subscription<M>,
        cause: anyhow::Error,
    ) -> Self {
        Self {
            topic,
            subscription,
            cause,
        }
    }

    /// Topic the message was published on (not the subscription's topic).
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn subscription(&self) -> &Subscription<M> {
        &self.subscription
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    pub fn into_cause(self) -> anyhow::Error {
        self.cause
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<M> fmt::Debug for PublicationError<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("PublicationError")
            .field("topic", &self.topic)
            .field("subscription", &self.subscription)
            .field("cause", &self.cause)
            .finish()
    }
}

impl<M> fmt::Display for PublicationError<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "delivery of '{}' to subscription {} failed: {}",
            self.topic,
            self.subscription.id(),
            self.cause
        )
    }
}

impl<M> std::error::Error for PublicationError<M> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause: &(dyn std::error::Error + 'static) = &*self.cause;
        Some(cause)
    }
}

impl<M: 'static> ErrorExt for PublicationError<M> {
    fn status_code(&self) -> StatusCode {
        StatusCode::DeliveryFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
            ("topic", self.topic.name().to_string()),
            ("subscriber", self.subscription.subscriber().to_string()),
        ]
    }
}
