//! The per-thread default registry and the free functions that operate on it.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::error::Result;
use crate::registry::RegistryCore;
use crate::{Clock, ClockRegistry, ClockScope, FormatOptions};

thread_local! {
    static DEFAULT_REGISTRY: RefCell<Option<ClockRegistry>> = const { RefCell::new(None) };

    static LIVE_REGISTRIES: LiveRegistries = const {
        LiveRegistries {
            registries: RefCell::new(Vec::new()),
        }
    };
}

/// Every registry created on the current thread, for flushing them when the thread ends.
struct LiveRegistries {
    registries: RefCell<Vec<Weak<RegistryCore>>>,
}

impl LiveRegistries {
    fn upgrade_all(&self) -> Vec<ClockRegistry> {
        self.registries
            .borrow()
            .iter()
            .filter_map(ClockRegistry::upgrade)
            .collect()
    }
}

impl Drop for LiveRegistries {
    fn drop(&mut self) {
        // Registries still alive at this point are held by other thread-locals or leaked.
        for registry in self.upgrade_all() {
            registry.flush_unrendered();
        }
    }
}

pub(crate) fn register_live(core: &Rc<RegistryCore>) {
    // During thread teardown the list may already be gone, in which case the registry only
    // flushes when it is dropped.
    drop(LIVE_REGISTRIES.try_with(|live| {
        let mut registries = live.registries.borrow_mut();
        registries.retain(|registry| registry.strong_count() > 0);
        registries.push(Rc::downgrade(core));
    }));
}

/// The default registry of the current thread, created from the environment on first use.
///
/// # Panics
///
/// Panics if called while the thread is shutting down and its thread-local storage has
/// already been destroyed.
#[must_use]
pub fn default_registry() -> ClockRegistry {
    DEFAULT_REGISTRY.with(|slot| slot.borrow_mut().get_or_insert_with(ClockRegistry::new).clone())
}

/// Replaces the default registry of the current thread, returning the previous one.
///
/// # Example
///
/// ```
/// use ticktock::{ClockRegistry, LoggingRenderer};
///
/// let registry = ClockRegistry::builder()
///     .renderer(LoggingRenderer::new())
///     .build()
///     .unwrap();
///
/// let _previous = ticktock::set_default_registry(registry.clone());
///
/// let clock = ticktock::tick();
/// clock.stop().unwrap();
///
/// assert_eq!(registry.len(), 1);
/// ```
pub fn set_default_registry(registry: ClockRegistry) -> Option<ClockRegistry> {
    DEFAULT_REGISTRY.with(|slot| slot.borrow_mut().replace(registry))
}

/// Starts the clock identified by the location of this call in the default registry.
///
/// # Example
///
/// ```
/// let clock = ticktock::tick();
/// // ... do some work ...
/// clock.stop().unwrap();
/// ```
#[track_caller]
pub fn tick() -> Clock {
    default_registry().tick()
}

/// Starts the clock with the given name in the default registry.
#[track_caller]
pub fn tick_named(name: impl Into<Cow<'static, str>>) -> Clock {
    default_registry().tick_named(name)
}

/// Starts the clock identified by the location of this call in the default registry and
/// returns a guard that stops it when dropped.
#[track_caller]
pub fn scope() -> ClockScope {
    default_registry().scope()
}

/// Times a closure with the clock identified by the location of this call in the default
/// registry.
#[track_caller]
pub fn measure<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    default_registry().measure(f)
}

/// Removes all clocks from the default registry.
pub fn clear() {
    default_registry().clear();
}

/// Enables the default registry and all of its clocks.
pub fn enable() {
    default_registry().enable();
}

/// Disables the default registry and all of its clocks.
pub fn disable() {
    default_registry().disable();
}

/// Sets the render period of the default registry.
pub fn set_period(period: Duration) {
    default_registry().set_period(period);
}

/// Changes how the default registry formats the statistics.
///
/// # Errors
///
/// Returns an error if the template is invalid.
pub fn set_format(options: impl Into<FormatOptions>) -> Result<()> {
    default_registry().set_format(options)
}

/// Renders every registry of the current thread that has statistics not yet rendered.
///
/// Failures are ignored. This is what happens automatically when the thread ends, and is
/// useful before the process exits in ways that skip thread-local destructors (such as
/// `std::process::exit`).
pub fn flush_all() {
    let registries = LIVE_REGISTRIES
        .try_with(LiveRegistries::upgrade_all)
        .unwrap_or_default();

    for registry in registries {
        registry.flush_unrendered();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::renderers::NullRenderer;
    use crate::{ClockView, Config, Renderer};

    #[derive(Debug)]
    struct CountingRenderer(Rc<Cell<usize>>);

    impl Renderer for CountingRenderer {
        fn render(&mut self, _clocks: &[ClockView<'_>]) -> Result<()> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    fn registry(renders: &Rc<Cell<usize>>) -> ClockRegistry {
        ClockRegistry::builder()
            .config(Config::default())
            .renderer(CountingRenderer(Rc::clone(renders)))
            .build()
            .unwrap()
    }

    // Every test runs on its own thread, so each starts with a fresh default registry.

    #[test]
    fn default_registry_is_created_once_per_thread() {
        let first = default_registry();
        first.tick_named("x");

        assert_eq!(default_registry().len(), 1);
    }

    #[test]
    fn set_default_registry_returns_previous() {
        let first = ClockRegistry::builder()
            .config(Config::default())
            .renderer(NullRenderer)
            .build()
            .unwrap();
        let second = ClockRegistry::builder()
            .config(Config::default())
            .renderer(NullRenderer)
            .build()
            .unwrap();

        drop(set_default_registry(first.clone()));
        let previous = set_default_registry(second.clone());

        tick_named("c");

        assert!(previous.is_some_and(|previous| previous.is_empty()));
        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn free_functions_operate_on_default_registry() {
        let renders = Rc::new(Cell::new(0));
        let registry = registry(&renders);
        drop(set_default_registry(registry.clone()));

        set_period(Duration::from_secs(5));
        assert_eq!(registry.period(), Duration::from_secs(5));

        let clock = tick();
        clock.stop().unwrap();
        assert_eq!(renders.get(), 1);

        disable();
        assert!(!registry.is_enabled());
        enable();
        assert!(registry.is_enabled());

        // Formatting is unsupported by the counting renderer, which is not an error.
        set_format("long").unwrap();

        let value = measure(|| 5);
        assert_eq!(value, 5);

        clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn flush_all_renders_only_unrendered_registries() {
        let renders = Rc::new(Cell::new(0));
        let busy = registry(&renders);
        let idle = registry(&renders);

        let clock = busy.tick_named("c");
        clock.stop_named("done").unwrap();
        clock.stop_named("done").unwrap();
        idle.tick_named("c").stop().unwrap();
        assert_eq!(renders.get(), 2);

        flush_all();
        assert_eq!(renders.get(), 3);

        // Nothing new since the flush.
        flush_all();
        assert_eq!(renders.get(), 3);
    }

    #[test]
    fn dropped_registries_leave_the_live_list() {
        let renders = Rc::new(Cell::new(0));
        drop(registry(&renders));
        let _kept = registry(&renders);

        let live = LIVE_REGISTRIES.with(|live| live.registries.borrow().len());

        // The dropped registry is pruned when the next one is registered.
        assert_eq!(live, 1);
    }
}
