#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in ticktock packages.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

const ERR_POISONED_LOCK: &str = "poisoned lock - a test has already panicked";

/// An in-memory output sink whose clones share the same contents.
///
/// Hand one clone to the code under test and inspect the output through another.
///
/// # Example
///
/// ```rust
/// use std::io::Write;
///
/// use testing::SharedBuffer;
///
/// let buffer = SharedBuffer::new();
/// let mut writer = buffer.clone();
/// writer.write_all(b"hello").unwrap();
///
/// assert_eq!(buffer.text(), "hello");
/// ```
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text.
    ///
    /// # Panics
    ///
    /// Panics if the written bytes are not valid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8(self.bytes.borrow().clone()).expect("output is valid UTF-8")
    }

    /// Everything written so far, split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    /// Discards everything written so far.
    pub fn clear(&self) {
        self.bytes.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Like [`SharedBuffer`] but usable across threads, for output written by code that runs
/// (or is torn down) on another thread.
#[derive(Clone, Debug, Default)]
pub struct SyncBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SyncBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text.
    ///
    /// # Panics
    ///
    /// Panics if the written bytes are not valid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        let bytes = self.bytes.lock().expect(ERR_POISONED_LOCK).clone();
        String::from_utf8(bytes).expect("output is valid UTF-8")
    }

    /// Everything written so far, split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for SyncBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect(ERR_POISONED_LOCK)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An output sink that fails every write.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("this writer always fails"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("this writer always fails"))
    }
}

/// A time source that returns `start`, then `start + step`, then `start + 2 * step` and so on.
///
/// # Example
///
/// ```rust
/// let timer = testing::stepping_timer(1, 1);
///
/// assert_eq!(timer(), 1);
/// assert_eq!(timer(), 2);
/// assert_eq!(timer(), 3);
/// ```
pub fn stepping_timer(start: u64, step: u64) -> impl Fn() -> u64 {
    let next = Cell::new(start);

    move || {
        let now = next.get();
        next.set(now.saturating_add(step));
        now
    }
}

/// A time source controlled by the test, whose clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualTimer {
    now: Rc<Cell<u64>>,
}

impl ManualTimer {
    /// Creates a timer that stands at zero until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the time forward.
    pub fn advance(&self, nanos: u64) {
        self.now.set(self.now.get().saturating_add(nanos));
    }

    /// The current time.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// A time source that reads this timer, for handing to the code under test.
    #[must_use]
    pub fn source(&self) -> impl Fn() -> u64 + 'static {
        let now = Rc::clone(&self.now);
        move || now.get()
    }
}

/// A `tracing` event captured by [`capture_events()`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct CapturedEvent {
    /// Level of the event.
    pub level: Level,

    /// Target of the event.
    pub target: String,

    /// The fields of the event, rendered as text. The message is under `message`.
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// The value of a field, rendered as text.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The value of a field parsed as a number.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not a number.
    #[must_use]
    pub fn number(&self, name: &str) -> f64 {
        self.field(name)
            .unwrap_or_else(|| panic!("event has no field '{name}': {self:?}"))
            .parse()
            .unwrap_or_else(|_| panic!("field '{name}' is not a number: {self:?}"))
    }
}

/// Runs `f` with a subscriber that records every event at or above `max_level` on the
/// current thread, returning the result of `f` and the events.
///
/// # Example
///
/// ```rust
/// use tracing::Level;
///
/// let ((), events) = testing::capture_events(Level::INFO, || {
///     tracing::info!(answer = 42, "hello");
///     tracing::debug!("too detailed");
/// });
///
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].field("answer"), Some("42"));
/// ```
pub fn capture_events<F, R>(max_level: Level, f: F) -> (R, Vec<CapturedEvent>)
where
    F: FnOnce() -> R,
{
    let events = Arc::new(Mutex::new(Vec::new()));

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(max_level))
        .with(CaptureLayer {
            events: Arc::clone(&events),
        });

    let result = tracing::subscriber::with_default(subscriber, f);

    let events = events.lock().expect(ERR_POISONED_LOCK).clone();
    (result, events)
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let metadata = event.metadata();

        self.events
            .lock()
            .expect(ERR_POISONED_LOCK)
            .push(CapturedEvent {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                fields: fields.0,
            });
    }
}

#[derive(Default)]
struct FieldCollector(BTreeMap<String, String>);

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl Debug for CaptureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureLayer").finish_non_exhaustive()
    }
}

impl Debug for FieldCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldCollector").field(&self.0).finish()
    }
}

/// Calculates the difference between two f64 values and considers
/// them equal if the difference is not more than `close_enough`.
///
/// This is a "correctly performed" floating point equality comparison.
#[must_use]
pub fn f64_diff_abs(a: f64, b: f64, close_enough: f64) -> f64 {
    let diff = (a - b).abs();

    if diff <= close_enough { 0.0 } else { diff }
}
