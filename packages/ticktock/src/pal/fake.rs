//! Fake platform implementation for testing.

use std::cell::Cell;
use std::rc::Rc;

use crate::Nanos;
use crate::pal::abstractions::Platform;

#[derive(Debug, Default)]
struct FakePlatformState {
    now: Cell<Nanos>,

    // Added to the time after every read, to simulate time passing between reads.
    step: Cell<Nanos>,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Multiple clones of the same `FakePlatform` share the same underlying time, allowing
/// tests to move time forward after handing the platform to the code under test.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakePlatform {
    state: Rc<FakePlatformState>,
}

impl FakePlatform {
    /// Creates a new fake platform at time zero, with time only moving when told to.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a new fake platform whose time advances by `step` after every read.
    pub(crate) fn stepping(step: Nanos) -> Self {
        let platform = Self::new();
        platform.state.step.set(step);
        platform
    }

    pub(crate) fn set_now(&self, now: Nanos) {
        self.state.now.set(now);
    }

    pub(crate) fn advance(&self, by: Nanos) {
        self.state.now.set(self.state.now.get().saturating_add(by));
    }
}

impl Platform for FakePlatform {
    fn now(&self) -> Nanos {
        let now = self.state.now.get();
        self.state.now.set(now.saturating_add(self.state.step.get()));
        now
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_stands_still() {
        let platform = FakePlatform::new();

        assert_eq!(platform.now(), 0);
        assert_eq!(platform.now(), 0);
    }

    #[test]
    fn set_and_advance() {
        let platform = FakePlatform::new();

        platform.set_now(100);
        assert_eq!(platform.now(), 100);

        platform.advance(50);
        assert_eq!(platform.now(), 150);
    }

    #[test]
    fn stepping_advances_after_each_read() {
        let platform = FakePlatform::stepping(1);

        assert_eq!(platform.now(), 0);
        assert_eq!(platform.now(), 1);
        assert_eq!(platform.now(), 2);
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.set_now(7);
        assert_eq!(platform2.now(), 7);
    }
}
