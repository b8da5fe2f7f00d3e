//! Measures the overhead that timing a region adds to it.
//!
//! Rendering is made as cheap as possible, so what remains is the cost of looking up the
//! clock, reading the timer twice and updating the statistics.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::cell::Cell;
use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use ticktock::{ClockRegistry, ClockView, Config, Error, Renderer};

/// Accepts every render without doing anything.
#[derive(Debug)]
struct DiscardingRenderer;

impl Renderer for DiscardingRenderer {
    fn render(&mut self, clocks: &[ClockView<'_>]) -> Result<(), Error> {
        black_box(clocks);
        Ok(())
    }
}

fn registry(enabled: bool) -> ClockRegistry {
    ClockRegistry::builder()
        .config(Config::default())
        .enabled(enabled)
        .period(Duration::from_secs(3600))
        .renderer(DiscardingRenderer)
        .build()
        .unwrap()
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("ticktock");

    let cell = Cell::new(1234);

    group.bench_function("baseline", |b| {
        b.iter(|| black_box(cell.get()));
    });

    let enabled = registry(true);

    group.bench_function("tick_stop_site", |b| {
        b.iter(|| {
            let clock = enabled.tick();
            black_box(cell.get());
            clock.stop().unwrap()
        });
    });

    group.bench_function("tick_stop_named", |b| {
        b.iter(|| {
            let clock = enabled.tick_named("bench");
            black_box(cell.get());
            clock.stop_named("done").unwrap()
        });
    });

    group.bench_function("scope", |b| {
        b.iter(|| {
            let _scope = enabled.scope();
            black_box(cell.get());
        });
    });

    group.bench_function("measure", |b| {
        b.iter(|| enabled.measure(|| black_box(cell.get())));
    });

    // A clock that is already running is restarted without a lookup.
    let clock = enabled.tick_named("reused");

    group.bench_function("start_stop_reused", |b| {
        b.iter(|| {
            clock.start();
            black_box(cell.get());
            clock.stop_named("done").unwrap()
        });
    });

    let disabled = registry(false);

    group.bench_function("tick_stop_disabled", |b| {
        b.iter(|| {
            let clock = disabled.tick();
            black_box(cell.get());
            clock.stop().unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, entrypoint);
criterion_main!(benches);
