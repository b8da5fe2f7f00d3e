//! Real platform implementation using the monotonic clock of the operating system.

use std::sync::LazyLock;
use std::time::Instant;

use crate::Nanos;
use crate::pal::abstractions::Platform;

// All timestamps are relative to this, so they fit comfortably into a u64.
static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Real implementation of the platform abstraction using [`Instant`].
#[derive(Clone, Debug)]
pub(crate) struct RealPlatform;

impl Platform for RealPlatform {
    fn now(&self) -> Nanos {
        // u64 nanoseconds last for 584 years of process uptime.
        Nanos::try_from(ORIGIN.elapsed().as_nanos()).unwrap_or(Nanos::MAX)
    }
}
