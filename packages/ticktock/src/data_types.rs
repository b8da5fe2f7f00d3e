use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::path::Path;

/// A point in time or a span of time, expressed in nanoseconds.
///
/// Timestamps are only meaningful relative to other timestamps from the same time source.
pub type Nanos = u64;

/// The source code location of a `tick` or `tock` call.
///
/// Call sites are normally captured at compile time via `#[track_caller]`, so the
/// instrumented code never has to spell them out. Wrappers that time code on behalf of
/// someone else (or tests) can construct them explicitly.
///
/// # Example
///
/// ```
/// use ticktock::CallSite;
///
/// let here = CallSite::caller();
/// assert!(here.file().ends_with(".rs"));
///
/// let synthetic = CallSite::new("<generated>", 7);
/// assert_eq!(synthetic.line(), 7);
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CallSite {
    file: Cow<'static, str>,
    line: u32,
}

impl CallSite {
    /// Creates a call site from an explicit file and line.
    #[must_use]
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Captures the location of the caller.
    ///
    /// When called from a function marked `#[track_caller]`, the location propagates
    /// outward to the first caller that is not marked.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();

        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
        }
    }

    /// The file the call was made from, as recorded by the compiler or the creator.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The line the call was made from.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Whether the file exists on disk, relative to the working directory if not absolute.
    ///
    /// Synthetic call sites (generated code, REPLs, tests) typically do not.
    #[must_use]
    pub fn file_exists(&self) -> bool {
        Path::new(self.file()).exists()
    }

    /// The file name without any directory components, if the file exists on disk.
    ///
    /// Returns the file string as given otherwise, since we cannot tell what part of
    /// a synthetic name is meaningful.
    #[must_use]
    pub fn file_display(&self) -> &str {
        if !self.file_exists() {
            return self.file();
        }

        Path::new(self.file())
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_else(|| self.file())
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
