use std::borrow::Cow;
use std::fmt;

use crate::CallSite;

/// Identifies a clock (a timed origin) within a registry.
///
/// A named clock is identified by its name alone, wherever it is started from. An unnamed
/// clock is identified by the call site that starts it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ClockKey {
    /// The clock was given an explicit name.
    Named(Cow<'static, str>),

    /// The clock is identified by the location of its `tick`.
    Site(CallSite),
}

impl ClockKey {
    pub(crate) fn resolve(name: Option<Cow<'static, str>>, site: &CallSite) -> Self {
        name.map_or_else(|| Self::Site(site.clone()), Self::Named)
    }
}

impl fmt::Display for ClockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Site(site) => write!(f, "{site}"),
        }
    }
}

/// Identifies an end point of a clock, i.e. one distinct place where it is stopped.
///
/// Each end point accumulates its own statistics.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum EndpointKey {
    /// The clock was stopped with an explicit end point name.
    Named(Cow<'static, str>),

    /// The clock was stopped without a name; the location of the `tock` identifies it.
    Site(CallSite),

    /// The clock was stopped by a [`ClockScope`][crate::ClockScope] guard being dropped.
    Scope,

    /// The clock was stopped after a closure passed to [`Clock::measure()`][crate::Clock::measure]
    /// returned.
    Wrapped,
}
