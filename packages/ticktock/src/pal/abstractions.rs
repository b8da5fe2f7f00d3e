//! Platform abstraction trait definitions.

use std::fmt::Debug;

use crate::Nanos;

/// Provides timestamps for measuring elapsed time.
pub(crate) trait Platform: Debug + 'static {
    /// Gets the current timestamp.
    ///
    /// Timestamps must never decrease between two calls.
    fn now(&self) -> Nanos;
}
