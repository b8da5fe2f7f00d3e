//! Times a few regions of a small workload with the default registry and standard output.
//!
//! The statistics are redrawn in place every half second while the workload runs, and
//! rendered a final time when the program ends.
//!
//! Run with: `cargo run --example ticktock_basic`.
#![expect(
    clippy::arithmetic_side_effects,
    reason = "this is example code that does not need production-level safety"
)]

use std::hint::black_box;
use std::thread;
use std::time::Duration;

fn main() {
    ticktock::set_period(Duration::from_millis(500));
    ticktock::set_format("long").unwrap();

    for round in 0..40_u64 {
        let clock = ticktock::tick_named("round");

        let text = ticktock::measure(|| build_text(round));
        clock.stop_named("text").unwrap();

        {
            let _scope = ticktock::scope();
            black_box(text.chars().rev().collect::<String>());
        }

        thread::sleep(Duration::from_millis(25));
        clock.stop_named("slept").unwrap();
    }

    // Thread-local destructors of the main thread are not guaranteed to run.
    ticktock::flush_all();
}

fn build_text(round: u64) -> String {
    let mut text = String::new();

    for i in 0..1000 * (round % 4 + 1) {
        text.push_str(&i.to_string());
    }

    text
}
