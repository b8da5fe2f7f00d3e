use crate::{ClockView, Error};

use super::Renderer;

/// Forwards every render to several renderers, in order.
///
/// All renderers receive the same clocks. If one fails, its error is returned and the
/// renderers after it are skipped for that render.
///
/// Format changes made through the registry are not forwarded: configure the format of
/// each [`StandardRenderer`][super::StandardRenderer] before adding it.
///
/// # Example
///
/// ```
/// use ticktock::{ClockRegistry, LoggingRenderer, MultiRenderer, StandardRenderer};
///
/// let renderer = MultiRenderer::new()
///     .with(StandardRenderer::with_writer(std::io::stderr()))
///     .with(LoggingRenderer::new());
///
/// let registry = ClockRegistry::builder().renderer(renderer).build().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MultiRenderer {
    renderers: Vec<Box<dyn Renderer>>,
}

impl MultiRenderer {
    /// Creates a renderer that forwards to nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a renderer after the ones already added.
    #[must_use]
    pub fn with(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Number of renderers forwarded to.
    #[must_use]
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Whether there are no renderers to forward to.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl From<Vec<Box<dyn Renderer>>> for MultiRenderer {
    fn from(renderers: Vec<Box<dyn Renderer>>) -> Self {
        Self { renderers }
    }
}

impl Renderer for MultiRenderer {
    fn render(&mut self, clocks: &[ClockView<'_>]) -> Result<(), Error> {
        for renderer in &mut self.renderers {
            renderer.render(clocks)?;
        }

        Ok(())
    }
}
