use std::fmt;

use thiserror::Error;

use crate::filter::StatusFilterError;

/// Possible errors when interacting with `gety_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Reading from the input stream failed
    #[error("Cannot read input: {0}")]
    ReadInput(#[source] std::io::Error),

    /// Writing a report or diagnostic line failed
    #[error("Cannot write output: {0}")]
    WriteOutput(#[source] std::io::Error),

    /// The given string can not be parsed into a valid URL
    #[error("Cannot parse '{0}' as URL: {1}")]
    ParseUrl(String, #[source] url::ParseError),

    /// A URL without a host (e.g. `file:///etc/hosts`) cannot be dispatched
    #[error("URL is missing a host")]
    InvalidUrlHost,

    /// The request could not be constructed from the work item
    #[error("Cannot build request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    /// Network error while sending the request or receiving the response head
    #[error("{0}")]
    NetworkRequest(#[source] reqwest::Error),

    /// Error while reading the response body
    #[error("Cannot read response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The underlying HTTP client could not be created
    #[error("Cannot build HTTP client: {0}")]
    BuildClient(#[source] reqwest::Error),

    /// The proxy URL is not usable
    #[error("Invalid proxy URL '{0}': {1}")]
    InvalidProxy(String, String),

    /// The given header could not be parsed.
    #[error("Header could not be parsed: {0}")]
    InvalidHeader(String),

    /// The given cookie is not of the form `name=value`
    #[error("Cookie must be of the form 'name=value', got '{0}'")]
    InvalidCookie(String),

    /// The status-code allow-list could not be parsed
    #[error("Invalid status code list: {0}")]
    InvalidStatusCodes(#[from] StatusFilterError),

    /// The body pattern is not a valid regular expression
    #[error("Invalid body pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The concurrency limit must allow at least one request in flight
    #[error("Concurrency limit must be at least 1")]
    ZeroConcurrency,
}

/// The stage of the request pipeline at which a work item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The raw line was not a dispatchable URL
    Parse,
    /// The request could not be constructed
    Build,
    /// The request could not be sent or no response was received
    Send,
    /// The response body could not be read
    Read,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Parse => "parse",
            Stage::Build => "build",
            Stage::Send => "send",
            Stage::Read => "read",
        };
        f.write_str(stage)
    }
}

/// A failure of a single work item.
///
/// Item errors are reported on the diagnostic channel and never abort the
/// run; they are not subject to response filtering.
#[derive(Error, Debug)]
#[error("{stage} {url}: {source}")]
pub struct ItemError {
    /// Pipeline stage which failed
    pub stage: Stage,
    /// The raw URL as read from the input
    pub url: String,
    /// Underlying cause
    #[source]
    pub source: ErrorKind,
}

impl ItemError {
    /// Create a new error for `url` which failed at `stage`
    #[must_use]
    pub fn new(stage: Stage, url: impl Into<String>, source: ErrorKind) -> Self {
        Self {
            stage,
            url: url.into(),
            source,
        }
    }

    /// Returns `true` if the request ran into the configured timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match &self.source {
            ErrorKind::NetworkRequest(e) | ErrorKind::ReadResponseBody(e) => e.is_timeout(),
            _ => false,
        }
    }
}
