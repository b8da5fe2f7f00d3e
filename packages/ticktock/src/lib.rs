#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Low-overhead timing of code regions, with running statistics that are periodically
//! rendered while the program runs.
//!
//! A region is timed by starting a clock at its beginning (a "tick") and stopping it at its
//! end (a "tock"). Every distinct place a clock is stopped at accumulates its own statistics
//! (count, mean, standard deviation, min, max, last) in constant time and space per
//! observation. The statistics of all clocks are rendered every now and then: right away
//! when a region is observed for the first time, afterwards at most once per render period.
//!
//! ```
//! # fn parse_input() {}
//! for _ in 0..100 {
//!     let clock = ticktock::tick();
//!     parse_input();
//!     clock.stop().unwrap();
//! }
//! ```
//!
//! With the default settings this keeps a line like the following up to date in the terminal:
//!
//! ```text
//! ⏱️ [main.rs:3-5] 12us340ns count=100
//! ```
//!
//! # Identifying clocks
//!
//! Clocks and end points are identified by the location in the source code where they are
//! started and stopped, captured at compile time. Alternatively, they can be named. Named
//! clocks can be started from several places and share their statistics, as can named end
//! points:
//!
//! ```
//! # fn read_file() -> Vec<u8> { Vec::new() }
//! # fn parse(_: &[u8]) {}
//! let clock = ticktock::tick_named("load");
//! let bytes = read_file();
//! clock.stop_named("read").unwrap();
//! parse(&bytes);
//! clock.stop_named("parsed").unwrap();
//! ```
//!
//! # Scopes and closures
//!
//! A region can also be timed with a guard that stops the clock when dropped, or by
//! wrapping it into a closure:
//!
//! ```
//! # fn handle_request() {}
//! {
//!     let _scope = ticktock::scope();
//!     handle_request();
//! }
//!
//! let answer = ticktock::measure(|| 6 * 7);
//! assert_eq!(answer, 42);
//! ```
//!
//! # Registries
//!
//! Clocks live in a [`ClockRegistry`], which owns the renderer and decides when to render.
//! The free functions of this crate operate on the default registry of the current thread.
//! Registries can also be created and used explicitly:
//!
//! ```
//! use std::time::Duration;
//!
//! use ticktock::{ClockRegistry, LoggingRenderer};
//!
//! let registry = ClockRegistry::builder()
//!     .renderer(LoggingRenderer::new())
//!     .period(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! let clock = registry.tick();
//! // ...
//! clock.stop().unwrap();
//! ```
//!
//! # Rendering
//!
//! The [`StandardRenderer`] (the default) writes one line per end point to standard output
//! or any other writer, formatted from a template. The [`LoggingRenderer`] emits a `tracing`
//! event per end point instead, and the [`MultiRenderer`] combines several renderers.
//! Custom renderers implement [`Renderer`].
//!
//! Statistics not yet rendered are rendered when their registry is dropped and when the
//! thread that owns it ends.
//!
//! # Configuration
//!
//! New registries take their defaults from the environment:
//!
//! * `TICKTOCK_DISABLE` - set to `1`, `true`, `yes` or `on` to turn all timing into no-ops.
//! * `TICKTOCK_DEFAULT_PERIOD` - the render period in seconds (default 2).
//! * `TICKTOCK_DEFAULT_FORMAT` - a preset name (`short`, `long`) or a template, see
//!   [`FormatTemplate`] (default `short`).
//!
//! # Thread safety
//!
//! Clocks and registries are single-threaded (neither `Send` nor `Sync`). The default
//! registry is therefore per thread, not per process: each thread that uses the free
//! functions gets its own default registry, times its own code and cannot see the clocks of
//! other threads. Its final render happens when the thread ends.
//!
//! With the default [`StandardRenderer`], every thread redraws its own block of lines on
//! standard output by moving the cursor up over its previous render. When several threads
//! render concurrently, their blocks interleave and overwrite each other. Programs that time
//! code on several threads should give each thread a registry that renders in "no update"
//! mode (see [`FormatOptions::no_update()`]), writes to its own sink or logs through a
//! [`LoggingRenderer`].

mod clock;
mod config;
mod data_types;
mod default_registry;
mod error;
mod format;
mod identity;
mod naming;
mod pal;
mod registry;
mod renderers;
mod stats;

pub use clock::*;
pub use config::*;
pub use data_types::*;
pub use default_registry::*;
pub use error::*;
pub use format::*;
pub use identity::*;
pub use registry::*;
pub use renderers::*;
pub use stats::*;
