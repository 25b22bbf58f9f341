//! `gety` sends one HTTP request per URL through an upstream proxy,
//! typically an intercepting proxy, and prints a line per response.
//!
//! URLs are read one per line from a file or from stdin:
//! ```sh
//! cat urls.txt | gety --GET --proxy http://127.0.0.1:8080
//! gety --HEAD --proxy http://127.0.0.1:8080 urls.txt
//! ```
//!
//! Only report some status codes, or responses whose body matches:
//! ```sh
//! gety --GET --proxy http://127.0.0.1:8080 --fc 200,403 urls.txt
//! gety --GET --proxy http://127.0.0.1:8080 --match '(?i)admin' urls.txt
//! ```
//!
//! Be gentle to the hosts, with at least ~2 seconds between requests to the
//! same host and a pause of 30 seconds after every 100 requests:
//! ```sh
//! gety --GET --proxy http://127.0.0.1:8080 --rl 2 --burst 100 --burst-cooldown 30 urls.txt
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io::{self, ErrorKind};
use std::path::PathBuf;

use anyhow::{bail, Context, Error, Result};
use clap::Parser;
use commands::{CommandParams, Input};
use formatters::log::init_logging;
use gety_lib::filter::ResponseFilter;
use gety_lib::ratelimit::HostRateLimiter;
use gety_lib::{BurstThrottle, LineSource, Runner};
use log::{debug, error};
use tokio::io::BufReader;

mod client;
mod commands;
mod formatters;
mod options;
mod parse;
mod verbosity;

use crate::options::{Config, GetyOptions, GETY_CONFIG_FILE};
use crate::parse::{parse_body_pattern, parse_duration_secs};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator, such as failing to read the input.
    #[allow(unused)]
    UnexpectedFailure = 1,
    ConfigError = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Parse the command line; help and version exit successfully, every other
/// argument error is a configuration error.
fn parse_args() -> GetyOptions {
    GetyOptions::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            // Nothing sensible left to do if stderr is gone
            let _ = e.print();
            std::process::exit(ExitCode::ConfigError as i32);
        }
        e.exit()
    })
}

/// Merge all provided config options into one.
/// This includes a potential config file and command-line arguments
fn load_config() -> Result<GetyOptions> {
    let mut opts = parse_args();

    init_logging(&opts.config.verbose);

    // Load a potentially existing config file and merge it into the config from
    // the CLI
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // If no config file was explicitly provided, we try to load the default
        // config file from the current directory if the file exits. This will
        // raise an error if the file is invalid, just like the explicit provided
        // config file.
        let default_config = PathBuf::from(GETY_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call gety entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigError as i32);
        }
    };

    let runtime = match opts.config.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .enable_all()
                .build()?
        }
        None => tokio::runtime::Runtime::new()?,
    };

    match runtime.block_on(run(&opts)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Run gety with the given options
async fn run(opts: &GetyOptions) -> Result<i32> {
    let params = match prepare(opts).await {
        Ok(params) => params,
        Err(e) => {
            error!("{e:#}");
            return Ok(ExitCode::ConfigError as i32);
        }
    };

    let exit_code = commands::dispatch(params).await?;
    Ok(exit_code as i32)
}

/// Validate the configuration and assemble everything a run needs.
/// Nothing is sent before this succeeded.
async fn prepare(opts: &GetyOptions) -> Result<CommandParams> {
    let cfg = &opts.config;

    let method = cfg.method()?;
    let client = client::create(cfg)?;
    let filter = ResponseFilter::new(
        cfg.fc.clone().unwrap_or_default(),
        parse_body_pattern(cfg.match_pattern.as_deref())?,
    );
    if cfg.concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }
    if (cfg.burst > 0) != (cfg.burst_cooldown > 0) {
        debug!("Burst throttling needs both --burst and --burst-cooldown, it is disabled");
    }

    let runner = Runner::builder()
        .client(client)
        .limiter(HostRateLimiter::new(parse_duration_secs(cfg.rl)))
        .filter(filter)
        .throttle(BurstThrottle::new(
            cfg.burst,
            parse_duration_secs(cfg.burst_cooldown),
        ))
        .concurrency(cfg.concurrency)
        .build();

    let input: Input = match opts.input_path() {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Cannot open input file `{}`", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    Ok(CommandParams {
        runner,
        source: LineSource::new(input, method),
    })
}
