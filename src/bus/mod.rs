//! Event buses tying the subscription registry to the publisher cache.

pub mod builder;
pub mod locking;
pub mod standard;

pub use builder::EventBusBuilder;
pub use locking::LockingEventBus;
pub use standard::StandardEventBus;
