//! Publishing side: copy-on-write fan-out lists and the topic cache.

pub mod optimized;
pub mod publisher;
pub mod registry;

pub use optimized::OptimizedPublisher;
pub use publisher::{PublishSummary, Publisher};
pub use registry::StandardPublisherRegistry;
