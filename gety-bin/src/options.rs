use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fs, time::Duration};

use anyhow::{anyhow, bail, Context, Error, Result};
use clap::{builder::TypedValueParser, Parser};
use const_format::{concatcp, formatcp};
use gety_lib::filter::StatusFilter;
use gety_lib::{HeaderMap, HeaderName, HeaderValue, Method, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
use serde::{Deserialize, Deserializer};

use crate::verbosity::Verbosity;

pub(crate) const GETY_CONFIG_FILE: &str = "gety.toml";

/// Input path which stands for standard input
pub(crate) const STDIN_INPUT: &str = "-";

// this exists because clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const TIMEOUT_STR: &str = "30s";
const CONCURRENCY_STR: &str = concatcp!(DEFAULT_CONCURRENCY);
// We use a custom help message here because we want to show the default
// value of the config file, but also be able to check if the user has
// provided a custom value. If they didn't, we won't throw an error if
// the file doesn't exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    GETY_CONFIG_FILE,
);

/// The methods which can be selected
const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::HEAD, Method::PUT];

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    timeout: Duration = DEFAULT_TIMEOUT;
    concurrency: usize = DEFAULT_CONCURRENCY;
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a single header into a [`HeaderName`] and [`HeaderValue`]
///
/// Headers are expected to be in format `Header-Name: Header-Value`.
/// The header name and value are trimmed of whitespace.
///
/// If the header contains multiple colons, the part after the first colon is
/// considered the value.
///
/// # Errors
///
/// This fails if the header does not contain a `:` character or
/// if the header name contains non-ASCII characters.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    match header.split_once(':') {
        Some((name, value)) => {
            let name = name.trim();
            let name = HeaderName::from_str(name)
                .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
            Ok((name, value))
        }
        None => Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        )),
    }
}

/// Parses a single HTTP header into a tuple of (String, String)
///
/// This does NOT merge multiple headers into one.
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let header_str = value.to_str().ok_or_else(|| {
            clap::Error::raw(
                clap::error::ErrorKind::InvalidValue,
                "Header value contains invalid UTF-8",
            )
        })?;

        match parse_single_header(header_str) {
            Ok((name, value)) => {
                let Ok(value) = value.to_str() else {
                    return Err(clap::Error::raw(
                        clap::error::ErrorKind::InvalidValue,
                        "Header value contains invalid UTF-8",
                    ));
                };

                Ok((name.to_string(), value.to_string()))
            }
            Err(e) => Err(clap::Error::raw(
                clap::error::ErrorKind::InvalidValue,
                e.to_string(),
            )),
        }
    }
}

impl clap::builder::ValueParserFactory for HeaderParser {
    type Parser = HeaderParser;
    fn value_parser() -> Self::Parser {
        HeaderParser
    }
}

/// Extension trait for converting a Vec of header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`.
    /// Repeated names are kept.
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value for '{name}': {e}"))?;
            header_map.append(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// gety reads URLs, one per line, and sends one HTTP request per URL
/// through an upstream proxy. Responses passing the optional status-code and
/// body filters are printed as `METHOD URL -> CODE REASON`.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct GetyOptions {
    /// File to read URLs from, one per line.
    /// Reads from standard input if omitted or `-`.
    #[arg(value_name = "FILE", verbatim_doc_comment)]
    pub(crate) input: Option<PathBuf>,

    /// Configuration file to use
    #[arg(long = "config", value_name = "PATH")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl GetyOptions {
    /// The input file, or `None` for standard input
    pub(crate) fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|path| path.as_os_str() != STDIN_INPUT)
    }
}

// Custom deserializer function for the header field
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = std::collections::BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for gety
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Send GET requests
    #[arg(long = "GET", help_heading = "Method")]
    #[serde(skip)]
    pub(crate) get: bool,

    /// Send POST requests
    #[arg(long = "POST", help_heading = "Method")]
    #[serde(skip)]
    pub(crate) post: bool,

    /// Send HEAD requests
    #[arg(long = "HEAD", help_heading = "Method")]
    #[serde(skip)]
    pub(crate) head: bool,

    /// Send PUT requests
    #[arg(long = "PUT", help_heading = "Method")]
    #[serde(skip)]
    pub(crate) put: bool,

    /// Method used when none of the method flags is given.
    /// Only available in the configuration file.
    #[arg(skip)]
    #[serde(default)]
    pub(crate) method: Option<String>,

    /// Proxy all requests are sent through, e.g. `http://127.0.0.1:8080`
    #[arg(long, value_name = "URL")]
    #[serde(default)]
    pub(crate) proxy: Option<String>,

    /// Timeout per request, e.g. `10s` or `1m 30s`
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = TIMEOUT_STR
    )]
    #[serde(default = "timeout")]
    #[serde(with = "humantime_serde")]
    pub(crate) timeout: Duration,

    /// Do not follow redirects
    #[arg(long)]
    #[serde(default)]
    pub(crate) no_follow: bool,

    /// Minimum interval between two requests to the same host in seconds,
    /// randomized by up to half the interval in either direction.
    /// 0 disables rate limiting.
    #[arg(long = "rl", value_name = "SECS", default_value_t = 0, verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) rl: u64,

    /// Only report responses with one of these status codes, e.g. `200,403`
    #[arg(long = "fc", value_name = "CODES")]
    #[serde(default)]
    pub(crate) fc: Option<StatusFilter>,

    /// Only report responses whose body matches this regular expression
    #[arg(long = "match", value_name = "REGEX")]
    #[serde(default, rename = "match")]
    pub(crate) match_pattern: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    #[serde(default)]
    pub(crate) insecure: bool,

    /// Maximum number of requests in flight
    #[arg(short, long, value_name = "N", default_value = CONCURRENCY_STR)]
    #[serde(default = "concurrency")]
    pub(crate) concurrency: usize,

    /// Pause after this many requests. Requires `--burst-cooldown`.
    #[arg(long, value_name = "N", default_value_t = 0)]
    #[serde(default)]
    pub(crate) burst: usize,

    /// Length of the pause after each burst in seconds
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    #[serde(default)]
    pub(crate) burst_cooldown: u64,

    /// Custom request header, can be repeated
    #[arg(
        short = 'H',
        long = "header",
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for requests

Headers must be given in the format 'Header-Name: value'. The option can be
repeated; repeated header names are all sent.

Example: gety --GET --proxy http://127.0.0.1:8080 -H 'X-Api-Key: 123'"
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// Cookie sent to every host, as `name=value`. Can be repeated
    #[arg(long, value_name = "NAME=VALUE")]
    #[serde(default)]
    pub(crate) cookie: Vec<String>,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[arg(short = 'T', long, verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) threads: Option<usize>,

    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,
}

impl Config {
    /// The method selected by exactly one of the method flags, or else the
    /// method from the configuration file.
    pub(crate) fn method(&self) -> Result<Method> {
        let flags = [self.get, self.post, self.head, self.put];
        let mut selected = METHODS
            .iter()
            .zip(flags)
            .filter_map(|(method, set)| set.then(|| method.clone()));

        match (selected.next(), selected.next()) {
            (Some(method), None) => Ok(method),
            (Some(_), Some(_)) => bail!("Only one of --GET, --POST, --HEAD or --PUT may be given"),
            (None, _) => match &self.method {
                Some(method) => parse_method(method),
                None => bail!("One of --GET, --POST, --HEAD or --PUT is required"),
            },
        }
    }

    /// Combine headers from the config file with the ones from the CLI.
    ///
    /// Header names set on the command line replace the same names from the
    /// file; all other file headers are added.
    fn merge_headers(&mut self, other: Vec<(String, String)>) {
        let cli_names: HashSet<String> = self
            .header
            .iter()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        self.header.extend(
            other
                .into_iter()
                .filter(|(name, _)| !cli_names.contains(&name.to_ascii_lowercase())),
        );
    }

    /// Combine cookies from the config file with the ones from the CLI,
    /// with the CLI taking precedence for equal names.
    fn merge_cookies(&mut self, other: Vec<String>) {
        let cookie_name = |cookie: &String| {
            cookie
                .split_once('=')
                .map_or_else(|| cookie.trim().to_string(), |(name, _)| name.trim().to_string())
        };
        let cli_names: HashSet<String> = self.cookie.iter().map(cookie_name).collect();
        self.cookie.extend(
            other
                .into_iter()
                .filter(|cookie| !cli_names.contains(&cookie_name(cookie))),
        );
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        // Read configuration file
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // Special handling for headers and cookies before fold_in!
        self.merge_headers(toml.header);
        self.merge_cookies(toml.cookie);

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,
                ..cookie,
                // Keys which only exist on the command line
                ..get,
                ..post,
                ..head,
                ..put,

                // Keys with defaults to assign
                method: None,
                proxy: None,
                timeout: DEFAULT_TIMEOUT,
                no_follow: false,
                rl: 0,
                fc: None,
                match_pattern: None,
                insecure: false,
                concurrency: DEFAULT_CONCURRENCY,
                burst: 0,
                burst_cooldown: 0,
                threads: None,
                verbose: Verbosity::default(),
            }
        }
    }
}

/// Parse a method name from the configuration file
fn parse_method(method: &str) -> Result<Method> {
    let method = method.trim().to_ascii_uppercase();
    METHODS
        .iter()
        .find(|candidate| candidate.as_str() == method)
        .cloned()
        .ok_or_else(|| anyhow!("Unsupported method '{method}'; expected one of GET, POST, HEAD or PUT"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> GetyOptions {
        GetyOptions::try_parse_from(std::iter::once("gety").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        GetyOptions::command().debug_assert();
    }

    #[test]
    fn test_parse_custom_headers() {
        assert_eq!(
            parse_single_header("accept:text/html").unwrap(),
            (
                HeaderName::from_static("accept"),
                HeaderValue::from_static("text/html")
            )
        );
    }

    #[test]
    fn test_parse_custom_header_multiple_colons() {
        assert_eq!(
            parse_single_header("key:x-test:check=this").unwrap(),
            (
                HeaderName::from_static("key"),
                HeaderValue::from_static("x-test:check=this")
            )
        );
    }

    #[test]
    fn test_does_not_echo_sensitive_data() {
        let error = parse_single_header("My-Header💣: secret")
            .expect_err("Should not allow unicode as key");
        assert!(!error.to_string().contains("secret"));

        let error = parse_single_header("secret").expect_err("Should fail when no `:` given");
        assert!(!error.to_string().contains("secret"));
    }

    #[test]
    fn test_repeated_headers_are_kept() {
        let pairs = vec![
            ("X-Tag".to_string(), "a".to_string()),
            ("X-Tag".to_string(), "b".to_string()),
        ];
        let map = HeaderMap::from_header_pairs(&pairs).unwrap();
        let values: Vec<_> = map.get_all("x-tag").iter().collect();
        assert_eq!(values, ["a", "b"]);
    }

    #[test]
    fn test_defaults() {
        let opts = parse(&["--GET"]);
        assert_eq!(opts.config.timeout, Duration::from_secs(30));
        assert_eq!(opts.config.concurrency, 10);
        assert_eq!(opts.config.rl, 0);
        assert!(opts.config.fc.is_none());
        assert!(opts.input_path().is_none());
    }

    #[test]
    fn test_method_flags() {
        assert_eq!(parse(&["--GET"]).config.method().unwrap(), Method::GET);
        assert_eq!(parse(&["--POST"]).config.method().unwrap(), Method::POST);
        assert_eq!(parse(&["--HEAD"]).config.method().unwrap(), Method::HEAD);
        assert_eq!(parse(&["--PUT"]).config.method().unwrap(), Method::PUT);
    }

    #[test]
    fn test_method_is_required_and_exclusive() {
        assert!(parse(&[]).config.method().is_err());
        assert!(parse(&["--GET", "--PUT"]).config.method().is_err());
    }

    #[test]
    fn test_all_flags() {
        let opts = parse(&[
            "--HEAD",
            "--proxy",
            "http://127.0.0.1:8080",
            "--timeout",
            "5s",
            "--no-follow",
            "--rl",
            "2",
            "--fc",
            "200,403",
            "--insecure",
            "-c",
            "3",
            "--burst",
            "100",
            "--burst-cooldown",
            "30",
            "--match",
            "admin",
            "-H",
            "X-Api-Key: 1",
            "--cookie",
            "session=abc",
            "urls.txt",
        ]);
        let config = opts.config;

        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.no_follow);
        assert_eq!(config.rl, 2);
        assert_eq!(config.fc.unwrap().to_string(), "200,403");
        assert!(config.insecure);
        assert_eq!(config.concurrency, 3);
        assert_eq!((config.burst, config.burst_cooldown), (100, 30));
        assert_eq!(config.match_pattern.as_deref(), Some("admin"));
        assert_eq!(config.header, vec![("x-api-key".to_string(), "1".to_string())]);
        assert_eq!(config.cookie, vec!["session=abc"]);
        assert_eq!(opts.input, Some(PathBuf::from("urls.txt")));
    }

    #[test]
    fn test_dash_means_stdin() {
        assert!(parse(&["--GET", "-"]).input_path().is_none());
    }

    #[test]
    fn test_merge_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
method = "put"
proxy = "http://127.0.0.1:9000"
timeout = "10s"
fc = [200, 500]
concurrency = 4
cookie = ["session=file", "theme=dark"]

[header]
X-From-File = "yes"
X-Both = "file"
"#
        )
        .unwrap();

        let mut opts = parse(&["-H", "X-Both: cli", "--cookie", "session=cli", "-c", "2"]);
        let toml = Config::load_from_file(file.path()).unwrap();
        opts.config.merge(toml);
        let config = opts.config;

        assert_eq!(config.method().unwrap(), Method::PUT);
        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.fc.unwrap().to_string(), "200,500");
        // the CLI value wins
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.cookie, vec!["session=cli", "theme=dark"]);

        let names: Vec<_> = config.header.iter().map(|(name, value)| (name.as_str(), value.as_str())).collect();
        assert_eq!(names, vec![("x-both", "cli"), ("X-From-File", "yes")]);
    }

    #[test]
    fn test_unknown_config_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retries = 3").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method(" head ").unwrap(), Method::HEAD);
        assert!(parse_method("DELETE").is_err());
    }
}
