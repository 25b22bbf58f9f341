//! The `--verbose` and `--quiet` flags
//!
//! By default, warnings and errors are reported.
//! - `-q` only shows errors
//! - `-qq` silences all log output
//! - `-v` shows info, including the final statistics
//! - `-vv` shows debug
//! - `-vvv` shows trace

use std::fmt;

use log::{Level, LevelFilter};
use serde::Deserialize;

/// The level logged without any `-v` or `-q`
const BASE_LEVEL: Level = Level::Warn;

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    /// Pass many times for more log output
    ///
    /// By default, it'll report warnings and errors. Passing `-v` one time
    /// also prints info logging, `-vv` enables debug, and `-vvv` trace.
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "More output per occurrence",
        conflicts_with = "quiet",
    )]
    verbose: u8,

    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        help = "Less output per occurrence",
        conflicts_with = "verbose",
    )]
    quiet: u8,
}

impl Verbosity {
    /// Get the log level.
    ///
    /// `None` means all output is disabled.
    pub(crate) fn log_level(&self) -> Option<Level> {
        level_enum(self.verbosity())
    }

    /// Get the log level filter.
    pub(crate) fn log_level_filter(&self) -> LevelFilter {
        self.log_level().map_or(LevelFilter::Off, |level| level.to_level_filter())
    }

    fn verbosity(&self) -> i16 {
        level_value(BASE_LEVEL) - i16::from(self.quiet) + i16::from(self.verbose)
    }
}

// This can be deserialized from a string like "warn", "warning", "Warning"
// or "off" for example
impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let target = match s.to_lowercase().as_str() {
            "off" => -1,
            "error" => level_value(Level::Error),
            "warn" | "warning" => level_value(Level::Warn),
            "info" => level_value(Level::Info),
            "debug" => level_value(Level::Debug),
            "trace" => level_value(Level::Trace),
            level => {
                return Err(serde::de::Error::custom(format!(
                    "invalid log level `{level}`"
                )))
            }
        };

        let offset = target - level_value(BASE_LEVEL);
        let steps = u8::try_from(offset.unsigned_abs()).map_err(serde::de::Error::custom)?;
        Ok(if offset >= 0 {
            Verbosity {
                verbose: steps,
                quiet: 0,
            }
        } else {
            Verbosity {
                verbose: 0,
                quiet: steps,
            }
        })
    }
}

const fn level_value(level: Level) -> i16 {
    match level {
        Level::Error => 0,
        Level::Warn => 1,
        Level::Info => 2,
        Level::Debug => 3,
        Level::Trace => 4,
    }
}

const fn level_enum(verbosity: i16) -> Option<Level> {
    match verbosity {
        i16::MIN..=-1 => None,
        0 => Some(Level::Error),
        1 => Some(Level::Warn),
        2 => Some(Level::Info),
        3 => Some(Level::Debug),
        _ => Some(Level::Trace),
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log_level_filter())
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use rstest::rstest;
    use serde::de::value::{Error as ValueError, StrDeserializer};

    use super::*;

    #[derive(Debug, clap::Parser)]
    struct Cli {
        #[clap(flatten)]
        verbose: Verbosity,
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(Verbosity::default().log_level(), Some(Level::Warn));
    }

    #[rstest]
    #[case(&["gety", "-qq"], LevelFilter::Off)]
    #[case(&["gety", "-qqqq"], LevelFilter::Off)]
    #[case(&["gety", "-q"], LevelFilter::Error)]
    #[case(&["gety"], LevelFilter::Warn)]
    #[case(&["gety", "-v"], LevelFilter::Info)]
    #[case(&["gety", "-vv"], LevelFilter::Debug)]
    #[case(&["gety", "-vvvvv"], LevelFilter::Trace)]
    fn test_flags(#[case] args: &[&str], #[case] expected: LevelFilter) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose.log_level_filter(), expected);
    }

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("Error", LevelFilter::Error)]
    #[case("warning", LevelFilter::Warn)]
    #[case("info", LevelFilter::Info)]
    #[case("TRACE", LevelFilter::Trace)]
    fn test_deserialize(#[case] input: &str, #[case] expected: LevelFilter) {
        let verbosity = Verbosity::deserialize(StrDeserializer::<ValueError>::new(input)).unwrap();
        assert_eq!(verbosity.log_level_filter(), expected);
    }

    #[test]
    fn test_deserialize_invalid() {
        assert!(Verbosity::deserialize(StrDeserializer::<ValueError>::new("loud")).is_err());
    }
}
