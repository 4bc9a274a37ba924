use std::{any::Any, error::Error};

use crate::StatusCode;

/// Object-safe extension implemented by every error of the bus.
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode;

    /// The error as [`Any`](std::any::Any), for downcasting out of a
    /// [`StackError`](crate::StackError).
    fn as_any(&self) -> &dyn Any;

    /// Key/value pairs attached to log events.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Short type name of the error (no module path, no generics).
    fn type_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or("Unknown").to_string()
    }
}
