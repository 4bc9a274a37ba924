use super::subscription::{SubscriberId, Subscription};

/// A component that declares its own subscriptions.
///
/// The bus registers them in one go with
/// [`register_subscriber`](crate::bus::StandardEventBus::register_subscriber)
/// and drops them all with `unregister_subscriber`. Subscriptions should be
/// created with [`subscriber_id`](Self::subscriber_id) as their owner;
/// `unregister_subscriber` only removes subscriptions owned by that id.
pub trait MessageSubscriber<M> {
    fn subscriber_id(&self) -> SubscriberId;

    /// The subscriptions to register. Called once per registration, so it
    /// should return the same subscriptions every time.
    fn subscriptions(&self) -> Vec<Subscription<M>>;
}
