use std::env;
use std::time::Duration;

use crate::DEFAULT_FORMAT;

/// Environment variable that disables all timing when set to a truthy value.
pub const DISABLE_VAR: &str = "TICKTOCK_DISABLE";

/// Environment variable that sets the default render period, in (fractional) seconds.
pub const PERIOD_VAR: &str = "TICKTOCK_DEFAULT_PERIOD";

/// Environment variable that sets the default format (preset name or template).
pub const FORMAT_VAR: &str = "TICKTOCK_DEFAULT_FORMAT";

/// The render period used when nothing else is configured.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);

/// Process-level defaults for new registries and renderers.
///
/// Values are read once, when a registry or renderer is created. Unparseable values are
/// logged as warnings and replaced with the built-in defaults, so a typo in the environment
/// never prevents the instrumented program from running.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use ticktock::Config;
///
/// let config = Config::from_lookup(|name| match name {
///     "TICKTOCK_DEFAULT_PERIOD" => Some("0.5".to_string()),
///     _ => None,
/// });
///
/// assert!(config.enabled());
/// assert_eq!(config.period(), Duration::from_millis(500));
/// assert_eq!(config.format(), "short");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    enabled: bool,
    period: Duration,
    format: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(DISABLE_VAR) {
            match parse_flag(&value) {
                Some(disabled) => config.enabled = !disabled,
                None => tracing::warn!(
                    variable = DISABLE_VAR,
                    value = %value,
                    "ignoring unrecognized boolean value"
                ),
            }
        }

        if let Some(value) = lookup(PERIOD_VAR) {
            match parse_period(&value) {
                Some(period) => config.period = period,
                None => tracing::warn!(
                    variable = PERIOD_VAR,
                    value = %value,
                    "ignoring invalid period, expected a non-negative number of seconds"
                ),
            }
        }

        if let Some(value) = lookup(FORMAT_VAR) {
            config.format = value;
        }

        config
    }

    /// Whether timing is enabled.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Minimum time between two renders.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The default format, either a preset name or a template.
    ///
    /// Not validated here; renderers validate it when they are created.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            period: DEFAULT_PERIOD,
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_period(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
