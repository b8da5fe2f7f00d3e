use tracing::Level;

use crate::{ClockView, Endpoint, Error, Nanos};

use super::Renderer;

/// Target of all events emitted by [`LoggingRenderer`].
pub const LOG_TARGET: &str = "ticktock";

/// How a [`LoggingRenderer`] attaches the statistics to its events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum LogFields {
    /// Each statistic is a separate field of the event (`mean`, `count`, ...).
    #[default]
    Named,

    /// All statistics are bundled into a single `extra` field.
    Extra,
}

/// Emits one `tracing` event per clock end point on every render.
///
/// Durations are reported in seconds. The events carry the fields `clock_name`,
/// `tick_name`, `tock_name`, `mean`, `std`, `min`, `max` and `count`, either directly or
/// bundled into one `extra` field (see [`LogFields`]).
///
/// # Example
///
/// ```
/// use ticktock::{ClockRegistry, LoggingRenderer};
/// use tracing::Level;
///
/// let registry = ClockRegistry::builder()
///     .renderer(LoggingRenderer::new().with_level(Level::DEBUG))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct LoggingRenderer {
    level: Level,
    fields: LogFields,
}

impl LoggingRenderer {
    /// Creates a renderer that logs at `INFO` level with named fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            fields: LogFields::Named,
        }
    }

    /// Sets the level of the emitted events.
    #[must_use]
    pub fn with_level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    /// Sets how the statistics are attached to the emitted events.
    #[must_use]
    pub fn with_fields(self, fields: LogFields) -> Self {
        Self { fields, ..self }
    }

    /// The level of the emitted events.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for LoggingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// The level of a tracing event must be a constant, so each level is its own call site.
macro_rules! event_at {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            Level::TRACE => tracing::event!(target: LOG_TARGET, Level::TRACE, $($rest)+),
            Level::DEBUG => tracing::event!(target: LOG_TARGET, Level::DEBUG, $($rest)+),
            Level::INFO => tracing::event!(target: LOG_TARGET, Level::INFO, $($rest)+),
            Level::WARN => tracing::event!(target: LOG_TARGET, Level::WARN, $($rest)+),
            _ => tracing::event!(target: LOG_TARGET, Level::ERROR, $($rest)+),
        }
    };
}

/// The statistics of one end point, in the shape they are logged in.
#[derive(Debug)]
struct LogRecord<'a> {
    clock_name: &'a str,
    tick_name: &'a str,
    tock_name: &'a str,
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
    count: u64,
}

impl<'a> LogRecord<'a> {
    fn new(clock: &ClockView<'a>, endpoint: &'a Endpoint) -> Self {
        let stats = endpoint.stats();

        Self {
            clock_name: endpoint.name(),
            tick_name: clock.name(),
            tock_name: endpoint.tock_name(),
            mean: stats.mean() / NANOS_PER_SECOND,
            std: stats.std() / NANOS_PER_SECOND,
            min: nanos_to_seconds(stats.min()),
            max: nanos_to_seconds(stats.max()),
            count: stats.count(),
        }
    }
}

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

#[expect(
    clippy::cast_precision_loss,
    reason = "sub-nanosecond precision loss on durations beyond 2^53 ns is irrelevant"
)]
fn nanos_to_seconds(nanos: Nanos) -> f64 {
    nanos as f64 / NANOS_PER_SECOND
}

impl Renderer for LoggingRenderer {
    fn render(&mut self, clocks: &[ClockView<'_>]) -> Result<(), Error> {
        for clock in clocks {
            for endpoint in clock.endpoints() {
                let record = LogRecord::new(clock, endpoint);

                match self.fields {
                    LogFields::Named => event_at!(
                        self.level,
                        clock_name = record.clock_name,
                        tick_name = record.tick_name,
                        tock_name = record.tock_name,
                        mean = record.mean,
                        std = record.std,
                        min = record.min,
                        max = record.max,
                        count = record.count,
                        "timing statistics"
                    ),
                    LogFields::Extra => {
                        event_at!(self.level, extra = ?record, "timing statistics");
                    }
                }
            }
        }

        Ok(())
    }
}
