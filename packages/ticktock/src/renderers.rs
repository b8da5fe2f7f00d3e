//! Renderers turn the statistics of a registry's clocks into output.

mod logging;
mod multi;
mod standard;

use std::fmt::Debug;

pub use logging::*;
pub use multi::*;
pub use standard::*;

use crate::{ClockView, Error};

/// Presents the statistics of all clocks of a registry.
///
/// A registry calls its renderer whenever it decides the statistics are due to be shown.
/// Every call receives all clocks of the registry, in creation order.
pub trait Renderer: Debug {
    /// Presents the current statistics of the given clocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics could not be written to the output.
    fn render(&mut self, clocks: &[ClockView<'_>]) -> Result<(), Error>;

    /// The formatting settings of the renderer, if it has any.
    ///
    /// Renderers without formatting settings ignore format changes made through the registry.
    fn formatting(&mut self) -> Option<&mut StandardRenderer> {
        None
    }
}

/// Renders nothing. Used by tests that only care about the statistics themselves.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct NullRenderer;

#[cfg(test)]
impl Renderer for NullRenderer {
    fn render(&mut self, _clocks: &[ClockView<'_>]) -> Result<(), Error> {
        Ok(())
    }
}
