use std::io;

use thiserror::Error;

/// Errors that can occur when timing code or configuring how timings are rendered.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A clock was stopped without ever having been started.
    ///
    /// This is a bug in the instrumented code: recording a zero instead would silently
    /// corrupt the statistics.
    #[error("clock '{clock}' was stopped without having been started")]
    NotStarted {
        /// Display name of the clock.
        clock: String,
    },

    /// A format template referenced a field that does not exist.
    #[error("field '{field}' is unknown in format template '{template}'")]
    UnknownField {
        /// The unrecognized field name.
        field: String,

        /// The template the field was found in.
        template: String,
    },

    /// A format template could not be parsed (e.g. an unmatched brace).
    #[error("format template '{template}' is malformed: {problem}")]
    MalformedTemplate {
        /// The template that failed to parse.
        template: String,

        /// A human-readable description of the problem.
        problem: &'static str,
    },

    /// A renderer failed to write to its output sink.
    #[error("failed to write timing statistics")]
    Output(#[from] io::Error),
}

/// A specialized `Result` type for ticktock operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
