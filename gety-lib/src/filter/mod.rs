mod body;
mod status;

pub use body::{BodyMatcher, BodyReader};
pub use status::{StatusFilter, StatusFilterError};

use http::StatusCode;
use log::trace;

use crate::Result;

/// Decides whether a completed request is reported.
///
/// Checks are applied in order and stop at the first rejection:
///
/// 1. The status code must be in the allow-list (if one is configured)
/// 2. The body must match the pattern (if one is configured)
///
/// The body is only read in the second step, so without a pattern it is
/// never read at all.
#[derive(Clone, Debug, Default)]
pub struct ResponseFilter {
    /// Status codes to report. Empty means all
    pub status: StatusFilter,
    /// Pattern the response body has to match
    pub body: Option<BodyMatcher>,
}

impl ResponseFilter {
    /// Create a new filter
    #[must_use]
    pub const fn new(status: StatusFilter, body: Option<BodyMatcher>) -> Self {
        Self { status, body }
    }

    /// A filter which reports everything
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Returns whether a response with `status` and `body` is reported.
    ///
    /// # Errors
    ///
    /// Fails if the body had to be read and reading it failed.
    pub async fn accept<B: BodyReader>(&self, status: StatusCode, body: B) -> Result<bool> {
        if !self.status.contains(status) {
            trace!("Dropping response with status {status}");
            return Ok(false);
        }

        let Some(matcher) = &self.body else {
            return Ok(true);
        };
        let bytes = body.read_body().await?;
        Ok(matcher.is_match(&bytes))
    }
}
