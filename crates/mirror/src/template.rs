//! Path templating for the local record mirror.
//!
//! Mirror paths are rendered from a user-configured [upon] template using
//! single-brace placeholders, e.g. `{device}/{year}/{month}/{day}/{filename}`.
//!
//! # Template Variables
//!
//! | Variable   | Description                                  |
//! |------------|----------------------------------------------|
//! | `device`   | Configured device name                        |
//! | `year`     | Four digit capture year from the filename     |
//! | `month`    | Two digit capture month                       |
//! | `day`      | Two digit capture day                         |
//! | `filename` | Record filename as reported by the camera     |
//!
//! # Example
//!
//! ```
//! use camsync_mirror::{PathTemplate, RecordDate};
//!
//! let template: PathTemplate = "{device}/{year}-{month}/{filename}".parse().unwrap();
//! let date = RecordDate::from_filename("20240517101500_010.h264").unwrap();
//! let path = template.render("garage", &date, "20240517101500_010.h264").unwrap();
//! assert_eq!(path.to_str(), Some("garage/2024-05/20240517101500_010.h264"));
//! ```

use crate::date::RecordDate;
use crate::error::{Error, ErrorKind, Result};
use crate::path::validate as validate_path;
use exn::ResultExt;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::instrument;
use upon::{Engine, Syntax, Template};

/// Default mirror layout.
pub const DEFAULT_TEMPLATE: &str = "{device}/{year}/{month}/{day}/{filename}";
/// Default mirror root.
pub const DEFAULT_LOG_DIR: &str = "/data/logs";

/// Compiled mirror path template.
///
/// Constructed via [`FromStr`], which compiles the template eagerly and
/// performs a trial render so that syntax errors and unknown placeholders
/// surface at configuration time rather than halfway through a sync.
pub struct PathTemplate {
    engine: Engine<'static>,
    template: Template<'static>,
    source: String,
}
impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let engine = Engine::with_syntax(Syntax::builder().expr("{", "}").build());
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        let compiled = Self { engine, template, source: s.to_string() };
        let probe = RecordDate { year: "2000".into(), month: "01".into(), day: "01".into() };
        compiled.render("device", &probe, "filename")?;
        Ok(compiled)
    }
}
impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathTemplate").field(&self.source).finish()
    }
}

impl PathTemplate {
    /// The template string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders the template to a normalized path relative to the mirror root.
    #[instrument(level = "trace", skip(self, date), fields(date = %date))]
    pub fn render(&self, device: &str, date: &RecordDate, filename: &str) -> Result<PathBuf> {
        let rendered = self
            .template
            .render(
                &self.engine,
                upon::value! {
                    device: device,
                    year: date.year.as_str(),
                    month: date.month.as_str(),
                    day: date.day.as_str(),
                    filename: filename,
                },
            )
            .to_string()
            .or_raise(|| ErrorKind::Template)?;
        validate_path(&rendered)
    }
}
