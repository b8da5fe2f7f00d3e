use crate::format::NamingField;
use crate::{CallSite, EndpointKey};

/// The display name of a clock.
///
/// Explicitly named clocks are displayed by name. Otherwise the start call site is used:
/// `file.rs:line` if the file exists on disk, else just the line number, since synthetic
/// file names tend to be noise.
pub(crate) fn clock_display_name(name: Option<&str>, tick_site: &CallSite) -> String {
    match name {
        Some(name) => name.to_string(),
        None if tick_site.file_exists() => {
            format!("{}:{}", tick_site.file_display(), tick_site.line())
        }
        None => tick_site.line().to_string(),
    }
}

/// Precomputed values of the naming fields of one clock end point.
#[derive(Clone, Debug)]
pub(crate) struct Naming {
    name: String,
    tick_name: String,
    tock_name: String,
    tick_line: String,
    tock_line: String,
    tick_filename: String,
    tock_filename: String,
}

impl Naming {
    pub(crate) fn new(
        clock_name: Option<&str>,
        tick_name: &str,
        tick_site: &CallSite,
        endpoint: &EndpointKey,
        tock_site: &CallSite,
    ) -> Self {
        let tick = clock_name.map_or_else(
            || format!("{}:{}", tick_site.file_display(), tick_site.line()),
            str::to_string,
        );

        let tock_location = if tock_site.file() == tick_site.file() {
            tock_site.line().to_string()
        } else {
            format!("{}:{}", tock_site.file_display(), tock_site.line())
        };

        let (name, tock_name) = match endpoint {
            EndpointKey::Named(tock) => (format!("{tick}-{tock}"), tock.to_string()),
            EndpointKey::Site(_) => (format!("{tick}-{tock_location}"), tock_site.line().to_string()),
            EndpointKey::Scope | EndpointKey::Wrapped => {
                let tock_name = if matches!(endpoint, EndpointKey::Scope) {
                    "scope"
                } else {
                    "wrapped"
                };

                let name = match clock_name {
                    Some(name) => name.to_string(),
                    None if tock_site == tick_site => tick,
                    None => format!("{tick}-{tock_location}"),
                };

                (name, tock_name.to_string())
            }
        };

        Self {
            name,
            tick_name: tick_name.to_string(),
            tock_name,
            tick_line: tick_site.line().to_string(),
            tock_line: tock_site.line().to_string(),
            tick_filename: tick_site.file_display().to_string(),
            tock_filename: tock_site.file_display().to_string(),
        }
    }

    pub(crate) fn get(&self, field: NamingField) -> &str {
        match field {
            NamingField::Name => &self.name,
            NamingField::TickName => &self.tick_name,
            NamingField::TockName => &self.tock_name,
            NamingField::TickLine => &self.tick_line,
            NamingField::TockLine => &self.tock_line,
            NamingField::TickFilename => &self.tick_filename,
            NamingField::TockFilename => &self.tock_filename,
        }
    }
}
