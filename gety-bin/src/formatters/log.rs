use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

use crate::{formatters, verbosity::Verbosity};

/// Initialize the logging system with the given verbosity level.
pub(crate) fn init_logging(verbose: &Verbosity) {
    // Set a base level for all modules to `warn`.
    // It will be overridden by RUST_LOG if it's set.
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if std::env::var("RUST_LOG").is_err() {
        let level_filter = verbose.log_level_filter();

        // Other crates never log below `warn`, and never more than we do
        builder.filter_level(level_filter.min(LevelFilter::Warn));

        // Our own crates follow `-v` and `-q`
        builder
            .filter_module("gety", level_filter)
            .filter_module("gety_lib", level_filter);
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let color = formatters::color::color_for_level(level);
        writeln!(
            buf,
            "{} {}",
            color.apply_to(format!("[{level}]")),
            record.args()
        )
    });

    builder.init();
}
