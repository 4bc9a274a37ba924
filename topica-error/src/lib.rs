pub mod config;
pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;

// Flat re-exports so callers do not need the module paths.
pub use config::*;
pub use ext::*;
pub use stack::*;
pub use status_code::*;

pub type TopicaResult<T> = Result<T, StackError>;
