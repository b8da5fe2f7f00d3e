//! Integration tests for the `tracing` events emitted by ticktock.

use testing::{FailingWriter, capture_events, f64_diff_abs, stepping_timer};
use ticktock::{
    ClockRegistry, Config, DEFAULT_PERIOD, LOG_TARGET, LogFields, LoggingRenderer, PERIOD_VAR,
    StandardRenderer,
};
use tracing::Level;

const SECOND: u64 = 1_000_000_000;

fn logging_registry(renderer: LoggingRenderer) -> ClockRegistry {
    ClockRegistry::builder()
        .config(Config::default())
        .renderer(renderer)
        .timer(stepping_timer(0, 3 * SECOND / 2))
        .build()
        .unwrap()
}

#[test]
fn statistics_are_logged_as_named_fields() {
    let registry = logging_registry(LoggingRenderer::new());

    let ((), events) = capture_events(Level::INFO, || {
        registry.tick_named("work").stop_named("done").unwrap();
    });

    assert_eq!(events.len(), 1);

    let event = &events[0];
    assert_eq!(event.level, Level::INFO);
    assert_eq!(event.target, LOG_TARGET);
    assert_eq!(event.field("message"), Some("timing statistics"));
    assert_eq!(event.field("clock_name"), Some("work-done"));
    assert_eq!(event.field("tick_name"), Some("work"));
    assert_eq!(event.field("tock_name"), Some("done"));
    assert_eq!(event.field("count"), Some("1"));
    assert_eq!(f64_diff_abs(event.number("mean"), 1.5, 1e-9), 0.0);
    assert_eq!(f64_diff_abs(event.number("std"), 0.0, 1e-9), 0.0);
    assert_eq!(f64_diff_abs(event.number("min"), 1.5, 1e-9), 0.0);
    assert_eq!(f64_diff_abs(event.number("max"), 1.5, 1e-9), 0.0);
}

#[test]
fn one_event_per_endpoint() {
    let registry = logging_registry(LoggingRenderer::new());

    let ((), events) = capture_events(Level::INFO, || {
        let clock = registry.tick_named("work");
        clock.stop_named("first").unwrap();
        clock.stop_named("second").unwrap();
    });

    // The first render has one end point, the second has both.
    let names: Vec<_> = events
        .iter()
        .map(|event| event.field("tock_name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["first", "first", "second"]);
}

#[test]
fn statistics_can_be_bundled_into_one_field() {
    let registry = logging_registry(LoggingRenderer::new().with_fields(LogFields::Extra));

    let ((), events) = capture_events(Level::INFO, || {
        registry.tick_named("work").stop_named("done").unwrap();
    });

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("clock_name"), None);

    let extra = events[0].field("extra").unwrap();
    assert!(extra.contains("clock_name: \"work-done\""), "{extra}");
    assert!(extra.contains("count: 1"), "{extra}");
}

#[test]
fn events_respect_the_configured_level() {
    let registry = logging_registry(LoggingRenderer::new().with_level(Level::DEBUG));

    let ((), quiet) = capture_events(Level::INFO, || {
        registry.tick_named("work").stop_named("done").unwrap();
    });
    assert!(quiet.is_empty());

    let ((), verbose) = capture_events(Level::DEBUG, || registry.flush().unwrap());
    let statistics: Vec<_> = verbose
        .iter()
        .filter(|event| event.target == LOG_TARGET)
        .collect();
    assert_eq!(statistics.len(), 1);
    assert_eq!(statistics[0].level, Level::DEBUG);
}

#[test]
fn format_change_without_formatting_support_is_a_warning() {
    let registry = logging_registry(LoggingRenderer::new());

    let (result, events) = capture_events(Level::WARN, || registry.set_format("long"));

    result.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, Level::WARN);
}

#[test]
fn invalid_configuration_value_is_a_warning() {
    let (config, events) = capture_events(Level::WARN, || {
        Config::from_lookup(|name| (name == PERIOD_VAR).then(|| "soon".to_string()))
    });

    assert_eq!(config.period(), DEFAULT_PERIOD);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("variable"), Some(PERIOD_VAR));
    assert_eq!(events[0].field("value"), Some("soon"));
}

#[test]
fn creating_a_clock_is_logged_at_debug() {
    let registry = logging_registry(LoggingRenderer::new());

    let (_clock, events) = capture_events(Level::DEBUG, || registry.tick_named("fresh"));

    let created: Vec<_> = events
        .iter()
        .filter(|event| event.field("message") == Some("created clock"))
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].field("clock"), Some("fresh"));

    // Getting the same clock again creates nothing.
    let (_clock, events) = capture_events(Level::DEBUG, || registry.tick_named("fresh"));
    assert!(
        events
            .iter()
            .all(|event| event.field("message") != Some("created clock"))
    );
}

#[test]
fn failure_at_the_end_of_a_scope_is_a_warning() {
    let registry = ClockRegistry::builder()
        .config(Config::default())
        .renderer(StandardRenderer::from_config(&Config::default(), FailingWriter))
        .build()
        .unwrap();

    let ((), events) = capture_events(Level::WARN, || {
        let _scope = registry.scope_named("doomed");
    });

    assert_eq!(events.len(), 1);
    assert!(events[0].field("error").is_some());
}

#[test]
fn failure_after_a_measured_closure_is_a_warning() {
    let registry = ClockRegistry::builder()
        .config(Config::default())
        .renderer(StandardRenderer::from_config(&Config::default(), FailingWriter))
        .build()
        .unwrap();

    let (value, events) = capture_events(Level::WARN, || registry.measure_named("doomed", || 7));

    assert_eq!(value, 7);
    assert_eq!(events.len(), 1);
    assert!(events[0].field("error").is_some());
}
