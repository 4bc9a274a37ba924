//! Settings of the bus and of the logging stack.

pub mod settings;

pub use settings::{BusConfig, Settings, DEFAULT_FILE, ENV_PREFIX};
