//! Platform abstraction layer for time sources.
//!
//! Clocks and registries never read the time directly. They go through a facade that is
//! either the real monotonic clock of the platform, a caller-supplied function or (in tests)
//! a fake whose time is controlled by the test.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::Platform;
pub(crate) use facade::PlatformFacade;
#[cfg(test)]
pub(crate) use fake::FakePlatform;
