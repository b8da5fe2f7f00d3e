use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;

use foldhash::{HashMap, HashMapExt};

use crate::clock::ClockState;
use crate::default_registry::register_live;
use crate::error::Result;
use crate::pal::{Platform, PlatformFacade};
use crate::{
    CallSite, Clock, ClockKey, ClockScope, ClockView, Config, FormatOptions, Nanos, Renderer,
    StandardRenderer,
};

/// Owns a set of clocks and decides when their statistics are rendered.
///
/// Every stop of a clock is an opportunity to render. The first observation of a new end
/// point is always rendered right away, further observations only once the render period
/// has elapsed since the previous render. There is no background activity: rendering only
/// ever happens inside the calls made by the instrumented code.
///
/// `ClockRegistry` is a handle - clones refer to the same registry. Statistics that were
/// observed but not yet rendered are rendered when the last handle is dropped.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use ticktock::ClockRegistry;
///
/// let registry = ClockRegistry::builder()
///     .period(Duration::from_millis(500))
///     .format("long")
///     .build()
///     .unwrap();
///
/// for _ in 0..10 {
///     let clock = registry.tick();
///     // ... do some work ...
///     clock.stop().unwrap();
/// }
///
/// assert_eq!(registry.len(), 1);
/// ```
///
/// # Thread safety
///
/// This type is single-threaded. Each thread has its own default registry, see
/// [`default_registry()`][crate::default_registry].
#[derive(Clone, Debug)]
pub struct ClockRegistry {
    core: Rc<RegistryCore>,
}

impl ClockRegistry {
    /// Creates a registry configured from the environment, rendering to standard output.
    #[expect(
        clippy::new_without_default,
        reason = "to avoid ambiguity with the per-thread default registry"
    )]
    #[must_use]
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("a registry without an explicit format cannot fail to build")
    }

    /// Creates a builder for a registry with custom settings.
    ///
    /// Settings not specified on the builder are taken from the environment.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Starts the clock identified by the location of this call, creating it if needed.
    ///
    /// Clocks are only disabled at creation time if the registry is disabled.
    #[track_caller]
    pub fn tick(&self) -> Clock {
        let clock = self.clock(None, CallSite::caller());
        clock.start();
        clock
    }

    /// Starts the clock with the given name, creating it if needed.
    #[track_caller]
    pub fn tick_named(&self, name: impl Into<Cow<'static, str>>) -> Clock {
        let clock = self.clock(Some(name.into()), CallSite::caller());
        clock.start();
        clock
    }

    /// Gets or creates a clock without starting it.
    ///
    /// The clock is identified by `name` if given, otherwise by `tick_site`. When the clock
    /// already exists, `tick_site` is ignored.
    pub fn clock(&self, name: Option<Cow<'static, str>>, tick_site: CallSite) -> Clock {
        let key = ClockKey::resolve(name, &tick_site);
        let mut state = self.core.state.borrow_mut();

        if let Some(clock) = state
            .clock_index
            .get(&key)
            .and_then(|index| state.clocks.get(*index))
        {
            return Clock::new(Rc::clone(clock), self.clone());
        }

        let mut clock_state = ClockState::new(key.clone(), tick_site);
        clock_state.set_enabled(self.is_enabled());

        tracing::debug!(clock = clock_state.name(), %key, "created clock");

        let clock = Rc::new(RefCell::new(clock_state));
        let index = state.clocks.len();
        state.clocks.push(Rc::clone(&clock));
        state.clock_index.insert(key, index);

        Clock::new(clock, self.clone())
    }

    /// Starts the clock identified by the location of this call and returns a guard that
    /// stops it when dropped.
    #[track_caller]
    pub fn scope(&self) -> ClockScope {
        self.clock(None, CallSite::caller()).scope()
    }

    /// Starts the clock with the given name and returns a guard that stops it when dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use ticktock::ClockRegistry;
    ///
    /// let registry = ClockRegistry::new();
    ///
    /// fn handle_request() {}
    ///
    /// {
    ///     let _scope = registry.scope_named("request");
    ///     handle_request();
    /// }
    /// ```
    #[track_caller]
    pub fn scope_named(&self, name: impl Into<Cow<'static, str>>) -> ClockScope {
        self.clock(Some(name.into()), CallSite::caller()).scope()
    }

    /// Times a closure with the clock identified by the location of this call.
    #[track_caller]
    pub fn measure<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.clock(None, CallSite::caller()).measure(f)
    }

    /// Times a closure with the clock with the given name.
    ///
    /// # Example
    ///
    /// ```
    /// use ticktock::ClockRegistry;
    ///
    /// let registry = ClockRegistry::new();
    ///
    /// let sum = registry.measure_named("sum", || (1..=100).sum::<u64>());
    /// assert_eq!(sum, 5050);
    /// ```
    #[track_caller]
    pub fn measure_named<F, R>(&self, name: impl Into<Cow<'static, str>>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.clock(Some(name.into()), CallSite::caller()).measure(f)
    }

    /// Renders the statistics of all clocks if they are due.
    ///
    /// They are due if `force` is set, if nothing was rendered yet or if more than the render
    /// period has elapsed since the previous render. Does nothing if the registry is disabled.
    ///
    /// A render requested while the registry is already rendering (e.g. from inside a
    /// renderer) is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer fails.
    pub fn consider_render(&self, force: bool) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let Ok(mut state) = self.core.state.try_borrow_mut() else {
            return Ok(());
        };

        let due = force
            || state.last_render.is_none_or(|last| {
                let since_last = self.core.refresh_clock.now().saturating_sub(last);
                Duration::from_nanos(since_last) > state.period
            });

        if !due {
            return Ok(());
        }

        state.render()?;
        state.last_render = Some(self.core.refresh_clock.now());

        Ok(())
    }

    /// Renders the statistics of all clocks now.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer fails.
    pub fn flush(&self) -> Result<()> {
        self.consider_render(true)
    }

    /// Removes all clocks. Settings and the renderer are kept.
    ///
    /// Handles to removed clocks stay usable but are no longer rendered.
    pub fn clear(&self) {
        let mut state = self.core.state.borrow_mut();
        state.clocks.clear();
        state.clock_index.clear();
        state.unrendered = false;

        tracing::debug!("cleared clock registry");
    }

    /// Enables the registry and every clock it currently owns.
    pub fn enable(&self) {
        self.set_enabled(true);
    }

    /// Disables the registry and every clock it currently owns.
    pub fn disable(&self) {
        self.set_enabled(false);
    }

    fn set_enabled(&self, enabled: bool) {
        self.core.enabled.set(enabled);

        for clock in &self.core.state.borrow().clocks {
            clock.borrow_mut().set_enabled(enabled);
        }
    }

    /// Whether the registry is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.core.enabled.get()
    }

    /// Minimum time between two renders that are not forced.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a render, e.g. by a custom [`Renderer`].
    #[must_use]
    pub fn period(&self) -> Duration {
        self.core.state.borrow().period
    }

    /// Sets the minimum time between two renders that are not forced.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a render, e.g. by a custom [`Renderer`].
    pub fn set_period(&self, period: Duration) {
        self.core.state.borrow_mut().period = period;
    }

    /// Changes how the renderer formats the statistics.
    ///
    /// Logs a warning and does nothing if the renderer does not support formatting.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid, in which case nothing is changed.
    pub fn set_format(&self, options: impl Into<FormatOptions>) -> Result<()> {
        let options = options.into();

        self.with_formatting(|formatting| formatting.apply(&options))
    }

    /// Sets the format of one clock, overriding the format set for all clocks.
    ///
    /// Logs a warning and does nothing if the renderer does not support formatting.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid, in which case nothing is changed.
    pub fn set_clock_format(&self, clock: &ClockKey, template: &str) -> Result<()> {
        self.with_formatting(|formatting| formatting.set_clock_format(clock.clone(), template))
    }

    fn with_formatting(&self, f: impl FnOnce(&mut StandardRenderer) -> Result<()>) -> Result<()> {
        let mut state = self.core.state.borrow_mut();

        match state.renderer.formatting() {
            Some(formatting) => f(formatting),
            None => {
                tracing::warn!("ignoring format change, the renderer does not support formatting");
                Ok(())
            }
        }
    }

    /// All clocks of the registry, in creation order.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a render, e.g. by a custom [`Renderer`].
    #[must_use]
    pub fn clocks(&self) -> Vec<Clock> {
        self.core
            .state
            .borrow()
            .clocks
            .iter()
            .map(|clock| Clock::new(Rc::clone(clock), self.clone()))
            .collect()
    }

    /// Number of clocks in the registry.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a render, e.g. by a custom [`Renderer`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.state.borrow().clocks.len()
    }

    /// Whether the registry has no clocks.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a render, e.g. by a custom [`Renderer`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.state.borrow().clocks.is_empty()
    }

    /// Inspects all clocks the way a renderer sees them.
    pub(crate) fn with_views<R>(&self, f: impl FnOnce(&[ClockView<'_>]) -> R) -> R {
        let state = self.core.state.borrow();
        let clocks = state
            .clocks
            .iter()
            .map(|clock| clock.borrow())
            .collect::<Vec<_>>();
        let views = clocks
            .iter()
            .map(|clock| ClockView::new(clock))
            .collect::<Vec<_>>();

        f(&views)
    }

    /// Reads the time source used for measurements.
    pub(crate) fn now(&self) -> Nanos {
        self.core.timer.now()
    }

    /// Called after a clock recorded an observation.
    pub(crate) fn observed(&self, first_observation: bool) -> Result<()> {
        if let Ok(mut state) = self.core.state.try_borrow_mut() {
            state.unrendered = true;
        }

        self.consider_render(first_observation)
    }

    /// Renders whatever has not been rendered yet, swallowing any failure.
    pub(crate) fn flush_unrendered(&self) {
        if !self.is_enabled() {
            return;
        }

        let Ok(mut state) = self.core.state.try_borrow_mut() else {
            return;
        };

        state.flush_unrendered();
    }

    pub(crate) fn upgrade(core: &Weak<RegistryCore>) -> Option<Self> {
        core.upgrade().map(|core| Self { core })
    }
}

/// Builds a [`ClockRegistry`] with custom settings. Created by [`ClockRegistry::builder()`].
#[must_use]
pub struct RegistryBuilder {
    config: Option<Config>,
    enabled: Option<bool>,
    period: Option<Duration>,
    format: Option<String>,
    renderer: Option<Box<dyn Renderer>>,
    timer: PlatformFacade,
    refresh_clock: PlatformFacade,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            config: None,
            enabled: None,
            period: None,
            format: None,
            renderer: None,
            timer: PlatformFacade::real(),
            refresh_clock: PlatformFacade::real(),
        }
    }

    /// Uses the given configuration instead of reading it from the environment.
    pub fn config(self, config: Config) -> Self {
        Self {
            config: Some(config),
            ..self
        }
    }

    /// Whether the registry starts out enabled.
    pub fn enabled(self, enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..self
        }
    }

    /// Minimum time between two renders that are not forced.
    pub fn period(self, period: Duration) -> Self {
        Self {
            period: Some(period),
            ..self
        }
    }

    /// Format of the renderer, as a preset name or a template.
    ///
    /// Ignored with a warning if the renderer does not support formatting.
    pub fn format(self, format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..self
        }
    }

    /// Renders with the given renderer instead of printing to standard output.
    pub fn renderer(self, renderer: impl Renderer + 'static) -> Self {
        Self {
            renderer: Some(Box::new(renderer)),
            ..self
        }
    }

    /// Measures durations with the given time source instead of the monotonic clock of the
    /// operating system.
    ///
    /// The time source returns nanoseconds and must never go backwards.
    pub fn timer(self, timer: impl Fn() -> Nanos + 'static) -> Self {
        Self {
            timer: PlatformFacade::custom(timer),
            ..self
        }
    }

    /// Decides when renders are due with the given time source instead of the monotonic
    /// clock of the operating system.
    ///
    /// The time source returns nanoseconds and must never go backwards.
    pub fn refresh_clock(self, refresh_clock: impl Fn() -> Nanos + 'static) -> Self {
        Self {
            refresh_clock: PlatformFacade::custom(refresh_clock),
            ..self
        }
    }

    #[cfg(test)]
    pub(crate) fn timer_platform(self, timer: PlatformFacade) -> Self {
        Self { timer, ..self }
    }

    #[cfg(test)]
    pub(crate) fn refresh_platform(self, refresh_clock: PlatformFacade) -> Self {
        Self {
            refresh_clock,
            ..self
        }
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly specified format is invalid.
    pub fn build(self) -> Result<ClockRegistry> {
        let config = self.config.unwrap_or_else(Config::from_env);

        let mut renderer = self.renderer.unwrap_or_else(|| {
            Box::new(StandardRenderer::from_config(&config, io::stdout()))
        });

        if let Some(format) = self.format {
            match renderer.formatting() {
                Some(formatting) => formatting.set_format(&format)?,
                None => tracing::warn!("ignoring format, the renderer does not support formatting"),
            }
        }

        let core = Rc::new(RegistryCore {
            enabled: Cell::new(self.enabled.unwrap_or(config.enabled())),
            timer: self.timer,
            refresh_clock: self.refresh_clock,
            state: RefCell::new(RegistryState {
                period: self.period.unwrap_or(config.period()),
                last_render: None,
                clocks: Vec::new(),
                clock_index: HashMap::new(),
                renderer,
                unrendered: false,
            }),
        });

        register_live(&core);

        Ok(ClockRegistry { core })
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .field("period", &self.period)
            .field("format", &self.format)
            .field("renderer", &self.renderer)
            .field("timer", &self.timer)
            .field("refresh_clock", &self.refresh_clock)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct RegistryCore {
    enabled: Cell<bool>,

    // Measurements and render throttling use separate time sources, so measurements can be
    // driven by a synthetic timer while the throttle still follows real time.
    timer: PlatformFacade,
    refresh_clock: PlatformFacade,

    state: RefCell<RegistryState>,
}

impl Drop for RegistryCore {
    fn drop(&mut self) {
        if !self.enabled.get() {
            return;
        }

        self.state.get_mut().flush_unrendered();
    }
}

#[derive(Debug)]
struct RegistryState {
    period: Duration,
    last_render: Option<Nanos>,

    // In creation order, which is also the render order.
    clocks: Vec<Rc<RefCell<ClockState>>>,
    clock_index: HashMap<ClockKey, usize>,

    renderer: Box<dyn Renderer>,

    // Whether anything was observed since the last render.
    unrendered: bool,
}

impl RegistryState {
    fn render(&mut self) -> Result<()> {
        let clocks = self
            .clocks
            .iter()
            .map(|clock| clock.borrow())
            .collect::<Vec<Ref<'_, ClockState>>>();
        let views = clocks
            .iter()
            .map(|clock| ClockView::new(clock))
            .collect::<Vec<_>>();

        tracing::trace!(clocks = views.len(), "rendering");
        self.renderer.render(&views)?;

        self.unrendered = false;
        Ok(())
    }

    fn flush_unrendered(&mut self) {
        if !self.unrendered {
            return;
        }

        // Nobody is left to report a failure to, so failures (even panics) are dropped.
        drop(panic::catch_unwind(AssertUnwindSafe(|| self.render())));
    }
}
