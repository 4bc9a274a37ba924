use std::fmt;

use crate::{ErrorExt, StatusCode};

/// A bus error plus the steps that were running when it surfaced.
///
/// Contexts are stored outermost last and printed outermost first:
/// `building bus -> validating settings: invalid setting ...`.
pub struct StackError {
    inner: Box<dyn ErrorExt>,
    contexts: Vec<String>,
}

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            inner: Box::new(err),
            contexts: Vec::new(),
        }
    }

    /// Wraps the error in one more step.
    pub fn context(
        mut self,
        step: impl Into<String>,
    ) -> Self {
        self.contexts.push(step.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StackError")
            .field("status_code", &self.status_code())
            .field("error", &self.inner.to_string())
            .field("contexts", &self.contexts)
            .finish()
    }
}

impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, step) in self.contexts.iter().enumerate().rev() {
            let separator = if i == 0 { ": " } else { " -> " };
            write!(f, "{step}{separator}")?;
        }
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + 'static) = &*self.inner;
        Some(inner)
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}
