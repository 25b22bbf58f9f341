//! Defines the colors used for log output on stderr.

use console::Style;
use once_cell::sync::Lazy;

pub(crate) static NORMAL: Lazy<Style> = Lazy::new(|| Style::new().for_stderr());
pub(crate) static DIM: Lazy<Style> = Lazy::new(|| Style::new().for_stderr().dim());
pub(crate) static YELLOW: Lazy<Style> =
    Lazy::new(|| Style::new().for_stderr().yellow().bright());
pub(crate) static PINK: Lazy<Style> = Lazy::new(|| Style::new().for_stderr().color256(197));

// Used for debug log messages
pub(crate) static BLUE: Lazy<Style> = Lazy::new(|| Style::new().for_stderr().blue().bright());

/// Returns the style for a given log level
pub(crate) fn color_for_level(level: log::Level) -> &'static Style {
    match level {
        log::Level::Error => &*PINK,
        log::Level::Warn => &*YELLOW,
        log::Level::Info => &*NORMAL,
        log::Level::Debug => &*BLUE,
        log::Level::Trace => &*DIM,
    }
}
