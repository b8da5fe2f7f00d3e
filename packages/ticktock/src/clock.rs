use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};

use crate::error::Result;
use crate::naming::{Naming, clock_display_name};
use crate::{CallSite, ClockKey, ClockRegistry, EndpointKey, Error, Nanos, RunningStats};

/// A timed origin: a point in the code that is repeatedly started and stopped.
///
/// A clock is started with [`start()`][Self::start] (or obtained already started from
/// [`ClockRegistry::tick()`]) and stopped at one or more end points. Each distinct end point
/// accumulates its own [`RunningStats`]. Stopping a clock does not reset it, so a single
/// start can be followed by several stops that each measure from the same start.
///
/// `Clock` is a handle - clones refer to the same clock, which is owned by the
/// [`ClockRegistry`] that created it.
///
/// # Example
///
/// ```
/// use ticktock::ClockRegistry;
///
/// let registry = ClockRegistry::new();
///
/// for _ in 0..3 {
///     let clock = registry.tick_named("load_config");
///     // ... load the configuration ...
///     clock.stop_named("loaded").unwrap();
///     // ... validate it ...
///     clock.stop_named("validated").unwrap();
/// }
///
/// let clock = registry.tick_named("load_config");
/// assert_eq!(clock.endpoint_count(), 2);
/// ```
///
/// # Thread safety
///
/// This type is single-threaded. Each thread that needs to time code uses its own
/// registry and clocks.
#[derive(Clone)]
pub struct Clock {
    state: Rc<RefCell<ClockState>>,
    registry: ClockRegistry,
}

impl Clock {
    pub(crate) fn new(state: Rc<RefCell<ClockState>>, registry: ClockRegistry) -> Self {
        Self { state, registry }
    }

    /// Starts (or restarts) the clock, returning the start timestamp.
    ///
    /// Starting an already started clock moves the start to now - starts do not nest.
    ///
    /// Returns `None` without doing anything if the clock is disabled.
    pub fn start(&self) -> Option<Nanos> {
        if !self.is_enabled() {
            return None;
        }

        let now = self.registry.now();
        self.state.borrow_mut().pending_start = Some(now);
        Some(now)
    }

    /// Stops the clock at an end point identified by the location of this call.
    ///
    /// Returns the nanoseconds elapsed since the clock was started, or `None` without doing
    /// anything if the clock is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] if the clock was never started.
    ///
    /// Returns [`Error::Output`] if this observation triggered a render that failed.
    #[track_caller]
    pub fn stop(&self) -> Result<Option<Nanos>> {
        let site = CallSite::caller();
        self.stop_at(EndpointKey::Site(site.clone()), site)
    }

    /// Stops the clock at an explicitly named end point.
    ///
    /// All stops with the same name share statistics, wherever they are called from.
    ///
    /// # Errors
    ///
    /// Same as [`stop()`][Self::stop].
    #[track_caller]
    pub fn stop_named(&self, name: impl Into<Cow<'static, str>>) -> Result<Option<Nanos>> {
        self.stop_at(EndpointKey::Named(name.into()), CallSite::caller())
    }

    /// Stops the clock at an arbitrary end point, recording `site` as its location.
    ///
    /// This is the general form of [`stop()`][Self::stop], intended for wrappers that time
    /// code on behalf of their caller.
    ///
    /// # Errors
    ///
    /// Same as [`stop()`][Self::stop].
    pub fn stop_at(&self, endpoint: EndpointKey, site: CallSite) -> Result<Option<Nanos>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let (elapsed, first_observation) = {
            let mut state = self.state.borrow_mut();

            let Some(start) = state.pending_start else {
                return Err(Error::NotStarted {
                    clock: state.name.clone(),
                });
            };

            let elapsed = self.registry.now().saturating_sub(start);
            (elapsed, state.record(endpoint, site, elapsed))
        };

        // The first observation of an end point is always shown right away.
        self.registry.observed(first_observation)?;

        Ok(Some(elapsed))
    }

    /// Starts the clock and returns a guard that stops it when dropped.
    ///
    /// The statistics are recorded under the [`EndpointKey::Scope`] end point. Errors during
    /// the stop cannot be returned from a drop, so they are logged as warnings.
    ///
    /// # Example
    ///
    /// ```
    /// use ticktock::ClockRegistry;
    ///
    /// let registry = ClockRegistry::new();
    /// let clock = registry.clock(Some("handle_request".into()), ticktock::CallSite::caller());
    ///
    /// {
    ///     let _scope = clock.scope();
    ///     // ... handle the request ...
    /// }
    ///
    /// assert_eq!(clock.endpoint_count(), 1);
    /// ```
    #[track_caller]
    pub fn scope(&self) -> ClockScope {
        let site = CallSite::caller();
        self.start();

        ClockScope {
            clock: self.clone(),
            site,
        }
    }

    /// Times a closure, recording the statistics under the [`EndpointKey::Wrapped`] end point.
    ///
    /// Errors during the stop are logged as warnings, never returned, so wrapping a
    /// function never changes its outcome.
    #[track_caller]
    pub fn measure<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let site = CallSite::caller();
        self.start();

        let result = f();

        if let Err(error) = self.stop_at(EndpointKey::Wrapped, site) {
            tracing::warn!(%error, "failed to stop a clock after a measured closure");
        }

        result
    }

    /// Enables this clock. The clock only measures if its registry is enabled, too.
    pub fn enable(&self) {
        self.state.borrow_mut().enabled = true;
    }

    /// Disables this clock, turning starts and stops into no-ops.
    pub fn disable(&self) {
        self.state.borrow_mut().enabled = false;
    }

    /// Whether both this clock and its registry are enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled && self.registry.is_enabled()
    }

    /// Sets the format used to render this clock, overriding the registry-wide format.
    ///
    /// Logs a warning and does nothing if the renderer does not support formatting.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid.
    pub fn set_format(&self, template: &str) -> Result<()> {
        let key = self.state.borrow().key.clone();
        self.registry.set_clock_format(&key, template)
    }

    /// The display name of the clock.
    #[must_use]
    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    /// The identity of the clock within its registry.
    #[must_use]
    pub fn key(&self) -> ClockKey {
        self.state.borrow().key.clone()
    }

    /// The timestamp of the most recent start, if the clock has been started.
    #[must_use]
    pub fn pending_start(&self) -> Option<Nanos> {
        self.state.borrow().pending_start
    }

    /// The registry that owns this clock.
    #[must_use]
    pub fn registry(&self) -> &ClockRegistry {
        &self.registry
    }

    /// Number of distinct end points this clock has been stopped at.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.state.borrow().endpoints.len()
    }

    /// A copy of the statistics of one end point, if the clock has been stopped there.
    #[must_use]
    pub fn stats(&self, endpoint: &EndpointKey) -> Option<RunningStats> {
        let state = self.state.borrow();

        state
            .endpoint_index
            .get(endpoint)
            .and_then(|index| state.endpoints.get(*index))
            .map(|endpoint| endpoint.stats.clone())
    }

    /// Inspects all end points of the clock, in the order they were first observed.
    ///
    /// # Panics
    ///
    /// Panics if `f` starts or stops this clock, which would modify the end points while
    /// they are being inspected.
    pub fn with_endpoints<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[Endpoint]) -> R,
    {
        f(&self.state.borrow().endpoints)
    }
}

impl PartialEq for Clock {
    /// Two handles are equal if they refer to the same clock.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for Clock {}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Stops a clock when dropped. Returned by [`Clock::scope()`].
#[derive(Debug)]
#[must_use = "the clock is stopped when the scope is dropped"]
pub struct ClockScope {
    clock: Clock,
    site: CallSite,
}

impl ClockScope {
    /// The clock this scope stops.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

impl Drop for ClockScope {
    fn drop(&mut self) {
        if let Err(error) = self.clock.stop_at(EndpointKey::Scope, self.site.clone()) {
            tracing::warn!(%error, "failed to stop a clock at the end of a scope");
        }
    }
}

/// The statistics of one end point of a clock, together with how it is named.
#[derive(Clone, Debug)]
pub struct Endpoint {
    key: EndpointKey,
    site: CallSite,
    naming: Naming,
    stats: RunningStats,
}

impl Endpoint {
    /// The identity of the end point within its clock.
    #[must_use]
    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    /// Where the clock was stopped when this end point was first observed.
    #[must_use]
    pub fn site(&self) -> &CallSite {
        &self.site
    }

    /// Display name of the clock and end point together, e.g. `parse-done`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.naming.get(crate::format::NamingField::Name)
    }

    /// Display name of the end point alone.
    #[must_use]
    pub fn tock_name(&self) -> &str {
        self.naming.get(crate::format::NamingField::TockName)
    }

    /// The statistics observed at this end point.
    #[must_use]
    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub(crate) fn naming(&self) -> &Naming {
        &self.naming
    }
}

/// Read-only view of a clock, handed to renderers.
#[derive(Clone, Copy, Debug)]
pub struct ClockView<'a> {
    state: &'a ClockState,
}

impl<'a> ClockView<'a> {
    pub(crate) fn new(state: &'a ClockState) -> Self {
        Self { state }
    }

    /// The display name of the clock.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.state.name
    }

    /// The identity of the clock within its registry.
    #[must_use]
    pub fn key(&self) -> &'a ClockKey {
        &self.state.key
    }

    /// Where the clock was first started from.
    #[must_use]
    pub fn tick_site(&self) -> &'a CallSite {
        &self.state.tick_site
    }

    /// The end points of the clock, in the order they were first observed.
    #[must_use]
    pub fn endpoints(&self) -> &'a [Endpoint] {
        &self.state.endpoints
    }
}

#[derive(Debug)]
pub(crate) struct ClockState {
    key: ClockKey,
    name: String,
    tick_site: CallSite,

    enabled: bool,
    pending_start: Option<Nanos>,

    // In order of first observation, which is also the display order.
    endpoints: Vec<Endpoint>,
    endpoint_index: HashMap<EndpointKey, usize>,
}

impl ClockState {
    pub(crate) fn new(key: ClockKey, tick_site: CallSite) -> Self {
        let name = clock_display_name(explicit_name(&key), &tick_site);

        Self {
            key,
            name,
            tick_site,
            enabled: true,
            pending_start: None,
            endpoints: Vec::new(),
            endpoint_index: HashMap::new(),
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Records an observation, returning whether it was the first one for this end point.
    fn record(&mut self, key: EndpointKey, site: CallSite, elapsed: Nanos) -> bool {
        if let Some(endpoint) = self
            .endpoint_index
            .get(&key)
            .and_then(|index| self.endpoints.get_mut(*index))
        {
            endpoint.stats.update(elapsed);
            return false;
        }

        let naming = Naming::new(
            explicit_name(&self.key),
            &self.name,
            &self.tick_site,
            &key,
            &site,
        );

        self.endpoint_index.insert(key.clone(), self.endpoints.len());
        self.endpoints.push(Endpoint {
            key,
            site,
            naming,
            stats: RunningStats::new(elapsed),
        });

        true
    }
}

fn explicit_name(key: &ClockKey) -> Option<&str> {
    match key {
        ClockKey::Named(name) => Some(name),
        ClockKey::Site(_) => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::pal::{FakePlatform, PlatformFacade};
    use crate::{Config, DEFAULT_PERIOD};

    assert_not_impl_any!(Clock: Send, Sync);
    assert_not_impl_any!(ClockScope: Send, Sync);

    fn registry_with(platform: &FakePlatform) -> ClockRegistry {
        ClockRegistry::builder()
            .config(Config::default())
            .renderer(crate::renderers::NullRenderer)
            .timer_platform(PlatformFacade::fake(platform.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn fixture_registry_ignores_environment() {
        let registry = registry_with(&FakePlatform::new());

        assert!(registry.is_enabled());
        assert_eq!(registry.period(), DEFAULT_PERIOD);
    }

    #[test]
    fn start_returns_timestamp() {
        let platform = FakePlatform::new();
        platform.set_now(123);
        let registry = registry_with(&platform);

        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        assert_eq!(clock.start(), Some(123));
        assert_eq!(clock.pending_start(), Some(123));
    }

    #[test]
    fn stop_returns_elapsed_since_start() {
        let platform = FakePlatform::new();
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        platform.set_now(100);
        clock.start();
        platform.set_now(250);

        assert_eq!(clock.stop().unwrap(), Some(150));
    }

    #[test]
    fn restart_overwrites_pending_start() {
        let platform = FakePlatform::new();
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        platform.set_now(100);
        clock.start();
        platform.set_now(200);
        clock.start();
        platform.set_now(210);

        assert_eq!(clock.stop().unwrap(), Some(10));
    }

    #[test]
    fn several_stops_measure_from_one_start() {
        let platform = FakePlatform::stepping(1);
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        clock.start(); // 0
        let first = clock.stop().unwrap(); // 1
        let second = clock.stop().unwrap(); // 2

        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(clock.endpoint_count(), 2);
    }

    #[test]
    fn stop_without_start_is_an_error_and_records_nothing() {
        let platform = FakePlatform::new();
        let registry = registry_with(&platform);
        let clock = registry.clock(Some("never_started".into()), CallSite::new("a.rs", 1));

        let error = clock.stop().unwrap_err();

        assert!(matches!(error, Error::NotStarted { ref clock } if clock == "never_started"));
        assert_eq!(clock.endpoint_count(), 0);
    }

    #[test]
    fn same_site_updates_same_endpoint() {
        let platform = FakePlatform::stepping(1);
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        for _ in 0..3 {
            clock.start();
            clock.stop().unwrap();
        }

        assert_eq!(clock.endpoint_count(), 1);
        clock.with_endpoints(|endpoints| {
            assert_eq!(endpoints[0].stats().count(), 3);
        });
    }

    #[test]
    fn different_names_create_different_endpoints() {
        let platform = FakePlatform::stepping(1);
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        clock.start();
        clock.stop_named("boomer").unwrap();
        clock.stop_named("boomer_2").unwrap();

        assert_eq!(clock.endpoint_count(), 2);
    }

    #[test]
    fn same_name_from_different_sites_shares_endpoint() {
        let platform = FakePlatform::stepping(1);
        let registry = registry_with(&platform);
        let clock = registry.clock(Some("ok".into()), CallSite::new("a.rs", 1));

        clock.start();
        clock.stop_named("boomer").unwrap();
        clock.stop_named("boomer").unwrap();

        assert_eq!(clock.endpoint_count(), 1);
        let stats = clock.stats(&EndpointKey::Named("boomer".into())).unwrap();
        assert_eq!(stats.count(), 2);
    }

    #[test]
    fn disabled_clock_is_a_no_op() {
        let platform = FakePlatform::stepping(1);
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        clock.disable();

        assert!(!clock.is_enabled());
        assert_eq!(clock.start(), None);
        assert_eq!(clock.stop().unwrap(), None);
        assert_eq!(clock.pending_start(), None);
        assert_eq!(clock.endpoint_count(), 0);

        clock.enable();
        assert!(clock.is_enabled());
    }

    #[test]
    fn registry_disable_wins_over_clock_enable() {
        let platform = FakePlatform::new();
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));

        registry.disable();
        clock.enable();

        assert!(!clock.is_enabled());
    }

    #[test]
    fn scope_records_under_scope_endpoint() {
        let platform = FakePlatform::stepping(5);
        let registry = registry_with(&platform);
        let clock = registry.clock(Some("work".into()), CallSite::new("a.rs", 1));

        {
            let scope = clock.scope();
            assert_eq!(scope.clock(), &clock);
        }

        let stats = clock.stats(&EndpointKey::Scope).unwrap();
        assert_eq!(stats.count(), 1);
        assert_eq!(stats.last(), 5);
    }

    #[test]
    fn measure_returns_closure_result() {
        let platform = FakePlatform::stepping(5);
        let registry = registry_with(&platform);
        let clock = registry.clock(Some("work".into()), CallSite::new("a.rs", 1));

        let value = clock.measure(|| 42);
        let value_again = clock.measure(|| 43);

        assert_eq!(value, 42);
        assert_eq!(value_again, 43);
        assert_eq!(clock.stats(&EndpointKey::Wrapped).unwrap().count(), 2);
    }

    #[test]
    fn clones_are_the_same_clock() {
        let platform = FakePlatform::new();
        let registry = registry_with(&platform);
        let clock = registry.clock(None, CallSite::new("a.rs", 1));
        let other = registry.clock(None, CallSite::new("a.rs", 2));

        assert_eq!(clock.clone(), clock);
        assert_ne!(clock, other);
    }

    #[test]
    fn endpoints_keep_first_observation_order() {
        let platform = FakePlatform::stepping(1);
        let registry = registry_with(&platform);
        let clock = registry.clock(Some("c".into()), CallSite::new("a.rs", 1));

        clock.start();
        clock.stop_named("z").unwrap();
        clock.stop_named("a").unwrap();
        clock.stop_named("z").unwrap();

        let names = clock.with_endpoints(|endpoints| {
            endpoints
                .iter()
                .map(|e| e.tock_name().to_string())
                .collect::<Vec<_>>()
        });
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn restarting_while_inspecting_endpoints_panics() {
        let platform = FakePlatform::new();
        let registry = registry_with(&platform);
        let clock = registry.clock(Some("c".into()), CallSite::new("a.rs", 1));
        clock.start();
        clock.stop_named("e").unwrap();

        clock.with_endpoints(|_| clock.start());
    }
}
