use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::num::NonZero;

use foldhash::{HashMap, HashMapExt};

use crate::{ClockKey, ClockView, Config, DEFAULT_FORMAT, DEFAULT_MAX_TERMS, Error, FormatTemplate};

use super::Renderer;

const CLEAR_LINE: &str = "\x1b[0K";

type ExternalWrite = Box<dyn FnMut(&mut dyn FnMut())>;

/// Changes to the formatting of a [`StandardRenderer`], applied through
/// [`ClockRegistry::set_format()`][crate::ClockRegistry::set_format].
///
/// Settings that are not specified are left as they are.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use ticktock::FormatOptions;
///
/// let options = FormatOptions::new()
///     .template("long")
///     .max_terms(NonZero::new(3).unwrap())
///     .no_update(true);
///
/// // A bare template converts into options that only change the template.
/// let template_only: FormatOptions = "{name} {mean}".into();
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormatOptions {
    template: Option<String>,
    max_terms: Option<NonZero<usize>>,
    no_update: Option<bool>,
}

impl FormatOptions {
    /// Options that change nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default template (or preset name) for all clocks.
    #[must_use]
    pub fn template(self, template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..self
        }
    }

    /// Sets the maximum number of terms a duration is rendered with.
    #[must_use]
    pub fn max_terms(self, max_terms: NonZero<usize>) -> Self {
        Self {
            max_terms: Some(max_terms),
            ..self
        }
    }

    /// Sets whether every render appends new lines instead of redrawing the previous ones.
    #[must_use]
    pub fn no_update(self, no_update: bool) -> Self {
        Self {
            no_update: Some(no_update),
            ..self
        }
    }
}

impl From<&str> for FormatOptions {
    fn from(template: &str) -> Self {
        Self::new().template(template)
    }
}

impl From<String> for FormatOptions {
    fn from(template: String) -> Self {
        Self::new().template(template)
    }
}

/// Renders each clock end point as one line of text formatted from a template.
///
/// By default the block of lines printed by the previous render is redrawn in place using
/// terminal escape sequences, so a terminal shows a live view of the statistics. In
/// no-update mode every render appends a fresh block instead, which suits output that is
/// not a terminal (pipes, files, CI logs).
///
/// The default output is standard output.
///
/// # Example
///
/// ```
/// use ticktock::{ClockRegistry, StandardRenderer};
///
/// let renderer = StandardRenderer::with_writer(std::io::stderr())
///     .with_format("{name} took {mean}")
///     .unwrap()
///     .with_no_update(true);
///
/// let registry = ClockRegistry::builder()
///     .renderer(renderer)
///     .build()
///     .unwrap();
/// ```
pub struct StandardRenderer {
    out: Box<dyn Write>,

    default_format: FormatTemplate,
    clock_formats: HashMap<ClockKey, FormatTemplate>,
    max_terms: NonZero<usize>,
    no_update: bool,

    // How many lines the previous render printed, to know how far up to move to redraw them.
    printed_lines: usize,

    external_write: Option<ExternalWrite>,
}

impl StandardRenderer {
    /// Creates a renderer that writes to standard output, using the default format from
    /// the environment.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Output to the terminal is not observable from tests.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Creates a renderer that writes to the given sink, using the default format from
    /// the environment.
    #[must_use]
    pub fn with_writer(out: impl Write + 'static) -> Self {
        Self::from_config(&Config::from_env(), out)
    }

    /// Creates a renderer that writes to the given sink, using the default format from
    /// the given configuration.
    ///
    /// An invalid configured format is logged as a warning and the built-in default is used.
    ///
    /// # Example
    ///
    /// ```
    /// use ticktock::{Config, StandardRenderer};
    ///
    /// // Ignores whatever TICKTOCK_DEFAULT_FORMAT says.
    /// let renderer = StandardRenderer::from_config(&Config::default(), std::io::stderr());
    /// assert_eq!(renderer.default_format().source(), "⏱️ [{name}] {mean} count={count}");
    /// ```
    #[must_use]
    pub fn from_config(config: &Config, out: impl Write + 'static) -> Self {
        let default_format = FormatTemplate::parse(config.format()).unwrap_or_else(|error| {
            tracing::warn!(%error, "ignoring invalid default format");
            FormatTemplate::parse(DEFAULT_FORMAT).expect("built-in default format is valid")
        });

        Self {
            out: Box::new(out),
            default_format,
            clock_formats: HashMap::new(),
            max_terms: DEFAULT_MAX_TERMS,
            no_update: false,
            printed_lines: 0,
            external_write: None,
        }
    }

    /// Sets the default template (or preset name) for all clocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid.
    pub fn with_format(mut self, template: &str) -> Result<Self, Error> {
        self.set_format(template)?;
        Ok(self)
    }

    /// Sets the maximum number of terms a duration is rendered with.
    #[must_use]
    pub fn with_max_terms(self, max_terms: NonZero<usize>) -> Self {
        Self { max_terms, ..self }
    }

    /// Sets whether every render appends new lines instead of redrawing the previous ones.
    #[must_use]
    pub fn with_no_update(self, no_update: bool) -> Self {
        Self { no_update, ..self }
    }

    /// Routes every write through `hook`, which must call the function it receives exactly
    /// once.
    ///
    /// This lets a progress bar library suspend its own drawing while the statistics are
    /// written, e.g. `move |write| multi_progress.suspend(write)` with `indicatif`.
    #[must_use]
    pub fn with_external_write(self, hook: impl FnMut(&mut dyn FnMut()) + 'static) -> Self {
        Self {
            external_write: Some(Box::new(hook)),
            ..self
        }
    }

    /// Sets the default template (or preset name) for all clocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid, leaving the current format in place.
    pub fn set_format(&mut self, template: &str) -> Result<(), Error> {
        self.default_format = FormatTemplate::parse(template)?;
        Ok(())
    }

    /// Sets the template (or preset name) for one clock, overriding the default format.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid, leaving the current format in place.
    pub fn set_clock_format(&mut self, clock: ClockKey, template: &str) -> Result<(), Error> {
        self.clock_formats.insert(clock, FormatTemplate::parse(template)?);
        Ok(())
    }

    /// Applies all specified options at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid, in which case no option is applied.
    pub fn apply(&mut self, options: &FormatOptions) -> Result<(), Error> {
        let template = options
            .template
            .as_deref()
            .map(FormatTemplate::parse)
            .transpose()?;

        if let Some(template) = template {
            self.default_format = template;
        }

        if let Some(max_terms) = options.max_terms {
            self.max_terms = max_terms;
        }

        if let Some(no_update) = options.no_update {
            self.no_update = no_update;
        }

        Ok(())
    }

    /// The default format of all clocks without their own format.
    #[must_use]
    pub fn default_format(&self) -> &FormatTemplate {
        &self.default_format
    }

    /// The maximum number of terms a duration is rendered with.
    #[must_use]
    pub fn max_terms(&self) -> NonZero<usize> {
        self.max_terms
    }

    /// Whether every render appends new lines instead of redrawing the previous ones.
    #[must_use]
    pub fn no_update(&self) -> bool {
        self.no_update
    }

    fn compose(&self, clocks: &[ClockView<'_>]) -> (String, usize) {
        let mut block = String::new();
        let mut lines = 0_usize;

        if !self.no_update && self.printed_lines > 0 {
            // Cursor up, to the first line of the previous block.
            write!(block, "\x1b[{}A", self.printed_lines)
                .expect("writing to a String cannot fail");
        }

        for clock in clocks {
            let template = self
                .clock_formats
                .get(clock.key())
                .unwrap_or(&self.default_format);

            for endpoint in clock.endpoints() {
                if !self.no_update {
                    block.push_str(CLEAR_LINE);
                }

                block.push_str(&template.render(endpoint, self.max_terms));
                block.push('\n');
                lines = lines.saturating_add(1);
            }
        }

        (block, lines)
    }
}

impl Renderer for StandardRenderer {
    fn render(&mut self, clocks: &[ClockView<'_>]) -> Result<(), Error> {
        let (block, lines) = self.compose(clocks);

        let Self {
            out,
            external_write,
            ..
        } = self;

        let mut result = Ok(());
        {
            let mut write = || {
                result = out.write_all(block.as_bytes()).and_then(|()| out.flush());
            };

            match external_write {
                Some(hook) => hook(&mut write),
                None => write(),
            }
        }
        result?;

        self.printed_lines = lines;
        Ok(())
    }

    fn formatting(&mut self) -> Option<&mut StandardRenderer> {
        Some(self)
    }
}

impl Default for StandardRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StandardRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardRenderer")
            .field("default_format", &self.default_format.source())
            .field("clock_formats", &self.clock_formats.len())
            .field("max_terms", &self.max_terms)
            .field("no_update", &self.no_update)
            .field("printed_lines", &self.printed_lines)
            .field("external_write", &self.external_write.is_some())
            .finish_non_exhaustive()
    }
}
