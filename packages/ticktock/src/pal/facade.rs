//! Platform facade for switching between real, caller-supplied and fake implementations.

use std::fmt;
use std::rc::Rc;

use crate::Nanos;
use crate::pal::abstractions::Platform;
#[cfg(test)]
use crate::pal::fake::FakePlatform;
use crate::pal::real::RealPlatform;

/// Facade that allows switching between platform implementations.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    /// The monotonic clock of the operating system.
    Real(RealPlatform),

    /// A time source supplied by the user of the crate.
    Custom(Rc<dyn Fn() -> Nanos>),

    /// Fake platform implementation for testing.
    #[cfg(test)]
    Fake(FakePlatform),
}

impl PlatformFacade {
    pub(crate) fn real() -> Self {
        Self::Real(RealPlatform)
    }

    pub(crate) fn custom(source: impl Fn() -> Nanos + 'static) -> Self {
        Self::Custom(Rc::new(source))
    }

    #[cfg(test)]
    pub(crate) fn fake(fake_platform: FakePlatform) -> Self {
        Self::Fake(fake_platform)
    }
}

impl Platform for PlatformFacade {
    fn now(&self) -> Nanos {
        match self {
            Self::Real(platform) => platform.now(),
            Self::Custom(source) => source(),
            #[cfg(test)]
            Self::Fake(platform) => platform.now(),
        }
    }
}

impl fmt::Debug for PlatformFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(platform) => f.debug_tuple("Real").field(platform).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").finish_non_exhaustive(),
            #[cfg(test)]
            Self::Fake(platform) => f.debug_tuple("Fake").field(platform).finish(),
        }
    }
}
