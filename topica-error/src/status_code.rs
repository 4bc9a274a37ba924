use std::fmt;

use num_enum::TryFromPrimitive;

/// Numeric codes attached to every bus error.
///
/// # Ranges
/// - 3xxx: delivery
/// - 5xxx: configuration and logging setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    /// A subscriber's handler returned an error or panicked.
    DeliveryFailed = 3000,

    ConfigInvalid = 5000,
    ConfigLoadFailed = 5001,
    LoggingInitFailed = 5002,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Looks a code up by its number, e.g. one read back from a log tag.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    pub fn is_delivery_error(&self) -> bool {
        (3000..=3999).contains(&self.code())
    }

    pub fn is_config_error(&self) -> bool {
        (5000..=5999).contains(&self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}
