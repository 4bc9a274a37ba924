/// Returns early with the given error converted into a
/// [`StackError`](crate::StackError).
///
/// ```
/// use topica_error::{bail, ConfigError, TopicaResult};
///
/// fn check_level(level: &str) -> TopicaResult<()> {
///     if level.is_empty() {
///         bail!(ConfigError::Invalid {
///             field: "logging.level".into(),
///             reason: "must not be empty".into(),
///         });
///     }
///     Ok(())
/// }
///
/// assert!(check_level("").is_err());
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
}

/// Calls [`bail!`] with `$err` when the condition is false.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
}
