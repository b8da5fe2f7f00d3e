//! Format templates that describe how the statistics of one clock end point are rendered.

use std::fmt::Write;
use std::num::NonZero;
use std::{iter, mem};

use crate::error::Result;
use crate::{Endpoint, Error, Nanos, RunningStats};

/// The built-in format used when nothing else is configured.
pub const DEFAULT_FORMAT: &str = "short";

/// Templates that can be referred to by name instead of spelling them out.
pub const PRESETS: &[(&str, &str)] = &[
    ("short", "⏱️ [{name}] {mean} count={count}"),
    (
        "long",
        "⏱️ [{name}] {mean} ({std} std) min={min} max={max} count={count} last={last}",
    ),
];

/// Number of duration terms rendered when not configured otherwise ("1m30s", not "1m30s5ms").
pub const DEFAULT_MAX_TERMS: NonZero<usize> = NonZero::new(2).expect("2 is not zero");

// Ordered from the most significant unit to the least significant one.
const UNITS: &[(Nanos, &str)] = &[
    (24 * 60 * 60 * 1_000_000_000, "d"),
    (60 * 60 * 1_000_000_000, "h"),
    (60 * 1_000_000_000, "m"),
    (1_000_000_000, "s"),
    (1_000_000, "ms"),
    (1_000, "us"),
    (1, "ns"),
];

/// Renders a duration in a compact human-readable form, e.g. `1m30s`.
///
/// The duration is decomposed greedily from days down to nanoseconds and one term is
/// emitted for each non-zero unit until `max_terms` terms have been emitted. Smaller
/// units beyond the cap are truncated, not rounded. A zero duration renders as `0ns`.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use ticktock::format_nanos;
///
/// let twenty_six_hours = 26 * 3_600_000_000_000;
/// assert_eq!(format_nanos(twenty_six_hours, NonZero::new(2).unwrap()), "1d2h");
/// assert_eq!(format_nanos(1_500, NonZero::new(1).unwrap()), "1us");
/// ```
#[must_use]
pub fn format_nanos(nanos: Nanos, max_terms: NonZero<usize>) -> String {
    let mut result = String::new();
    write_nanos(&mut result, nanos, max_terms);
    result
}

fn write_nanos(out: &mut String, nanos: Nanos, max_terms: NonZero<usize>) {
    if nanos == 0 {
        out.push_str("0ns");
        return;
    }

    let mut remainder = nanos;
    let mut terms = 0_usize;

    for (unit, suffix) in UNITS {
        let quantity = remainder
            .checked_div(*unit)
            .expect("unit sizes are non-zero constants");
        remainder = remainder
            .checked_rem(*unit)
            .expect("unit sizes are non-zero constants");

        if quantity != 0 {
            write!(out, "{quantity}{suffix}").expect("writing to a String cannot fail");
            terms = terms.saturating_add(1);
        }

        if terms >= max_terms.get() {
            return;
        }
    }
}

/// A statistic rendered as a human-readable duration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DurationField {
    Mean,
    Std,
    Min,
    Max,
    Last,
}

impl DurationField {
    fn value(self, stats: &RunningStats) -> Nanos {
        match self {
            Self::Mean => float_nanos(stats.mean()),
            Self::Std => float_nanos(stats.std()),
            Self::Min => stats.min(),
            Self::Max => stats.max(),
            Self::Last => stats.last(),
        }
    }
}

/// A statistic rendered as a plain number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ScalarField {
    Count,
}

/// A name or location of the clock or the end point. These never change for a given
/// end point, so they are computed once when the end point is first observed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NamingField {
    Name,
    TickName,
    TockName,
    TickLine,
    TockLine,
    TickFilename,
    TockFilename,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Field {
    Duration(DurationField),
    Scalar(ScalarField),
    Naming(NamingField),
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "mean" => Self::Duration(DurationField::Mean),
            "std" => Self::Duration(DurationField::Std),
            "min" => Self::Duration(DurationField::Min),
            "max" => Self::Duration(DurationField::Max),
            "last" => Self::Duration(DurationField::Last),
            "count" => Self::Scalar(ScalarField::Count),
            "name" => Self::Naming(NamingField::Name),
            "tick_name" => Self::Naming(NamingField::TickName),
            "tock_name" => Self::Naming(NamingField::TockName),
            "tick_line" => Self::Naming(NamingField::TickLine),
            "tock_line" => Self::Naming(NamingField::TockLine),
            "tick_filename" => Self::Naming(NamingField::TickFilename),
            "tock_filename" => Self::Naming(NamingField::TockFilename),
            _ => return None,
        })
    }

    fn write(self, out: &mut String, endpoint: &Endpoint, max_terms: NonZero<usize>) {
        match self {
            Self::Duration(field) => write_nanos(out, field.value(endpoint.stats()), max_terms),
            Self::Scalar(ScalarField::Count) => {
                write!(out, "{}", endpoint.stats().count())
                    .expect("writing to a String cannot fail");
            }
            Self::Naming(field) => out.push_str(endpoint.naming().get(field)),
        }
    }

    /// Numbers line up on the right, text on the left.
    fn default_align(self) -> Align {
        match self {
            Self::Scalar(_) => Align::Right,
            Self::Duration(_) | Self::Naming(_) => Align::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    fn parse(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Left),
            '>' => Some(Self::Right),
            '^' => Some(Self::Center),
            _ => None,
        }
    }
}

/// The `[[fill]align][width]` part of a `{field:spec}` placeholder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Padding {
    fill: char,
    align: Align,
    width: usize,
}

impl Padding {
    fn parse(spec: &str, field: Field) -> Option<Self> {
        let mut chars = spec.chars();
        let first = chars.next();
        let after_first = chars.as_str();
        let second = chars.next();
        let after_second = chars.as_str();

        let (fill, align, width) = match (first, second.and_then(Align::parse)) {
            (Some(fill), Some(align)) => (fill, align, after_second),
            _ => match first.and_then(Align::parse) {
                Some(align) => (' ', align, after_first),
                None => (' ', field.default_align(), spec),
            },
        };

        if !width.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let width = if width.is_empty() {
            0
        } else {
            width.parse().ok()?
        };

        Some(Self { fill, align, width })
    }

    fn write(self, out: &mut String, value: &str) {
        let missing = self.width.saturating_sub(value.chars().count());

        let before = match self.align {
            Align::Left => 0,
            Align::Right => missing,
            // An odd leftover goes to the right.
            Align::Center => missing.div_euclid(2),
        };
        let after = missing.saturating_sub(before);

        out.extend(iter::repeat_n(self.fill, before));
        out.push_str(value);
        out.extend(iter::repeat_n(self.fill, after));
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
    Padded(Field, Padding),
}

/// A format template compiled into literal text and field references.
///
/// Templates contain `{field}` placeholders. Use `{{` and `}}` for literal braces.
///
/// Duration fields (rendered like `1ms250us`): `mean`, `std`, `min`, `max`, `last`.
///
/// Scalar fields: `count`.
///
/// Naming fields: `name`, `tick_name`, `tock_name`, `tick_line`, `tock_line`,
/// `tick_filename`, `tock_filename`.
///
/// A placeholder may pad its value to a minimum width with `{field:[[fill]align][width]}`,
/// where `align` is `<` (left), `>` (right) or `^` (center). Without an explicit alignment,
/// `count` is aligned right and everything else left. For example `{mean:>10}` renders the
/// mean right-aligned in a column of ten characters. Other format specifications (precision,
/// sign, type) are not supported.
///
/// Instead of a template, the name of a preset (`short`, `long`) may be given.
///
/// # Example
///
/// ```
/// use ticktock::FormatTemplate;
///
/// let template = FormatTemplate::parse("{name}: {mean} over {count} runs").unwrap();
/// assert_eq!(template.source(), "{name}: {mean} over {count} runs");
///
/// assert!(FormatTemplate::parse("{median}").is_err());
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FormatTemplate {
    /// Compiles a template or resolves a preset name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the template references a field that does not exist
    /// and [`Error::MalformedTemplate`] if the braces do not pair up.
    pub fn parse(template: &str) -> Result<Self> {
        let source = PRESETS
            .iter()
            .find(|(name, _)| *name == template)
            .map_or(template, |(_, preset)| *preset);

        Ok(Self {
            source: source.to_string(),
            segments: compile(source)?,
        })
    }

    /// The template text, with any preset name resolved.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn render(&self, endpoint: &Endpoint, max_terms: NonZero<usize>) -> String {
        let mut out = String::with_capacity(self.source.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => field.write(&mut out, endpoint, max_terms),
                Segment::Padded(field, padding) => {
                    let mut value = String::new();
                    field.write(&mut value, endpoint, max_terms);
                    padding.write(&mut out, &value);
                }
            }
        }

        out
    }
}

fn compile(template: &str) -> Result<Vec<Segment>> {
    let malformed = |problem| Error::MalformedTemplate {
        template: template.to_string(),
        problem,
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(malformed("unmatched '{'")),
                        Some(c) => name.push(c),
                    }
                }

                let (name, spec) = name.split_once(':').unwrap_or((name.as_str(), ""));

                let field = Field::parse(name).ok_or_else(|| Error::UnknownField {
                    field: name.to_string(),
                    template: template.to_string(),
                })?;

                let segment = if spec.is_empty() {
                    Segment::Field(field)
                } else {
                    let padding = Padding::parse(spec, field)
                        .ok_or_else(|| malformed("invalid alignment or width after ':'"))?;
                    Segment::Padded(field, padding)
                };

                if !literal.is_empty() {
                    segments.push(Segment::Literal(mem::take(&mut literal)));
                }
                segments.push(segment);
            }
            '}' => return Err(malformed("unmatched '}'")),
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float to int casts saturate; statistics are never negative and fractions are dropped"
)]
fn float_nanos(value: f64) -> Nanos {
    value as Nanos
}
