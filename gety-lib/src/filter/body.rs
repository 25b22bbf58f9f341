use async_trait::async_trait;
use regex::bytes::Regex;

use crate::{ErrorKind, Result};

/// Anything a response body can be read from.
///
/// Reading consumes the source, so a body is read at most once.
#[async_trait]
pub trait BodyReader: Send {
    /// Read the complete body
    async fn read_body(self) -> Result<Vec<u8>>;
}

#[async_trait]
impl BodyReader for reqwest::Response {
    async fn read_body(self) -> Result<Vec<u8>> {
        let bytes = self.bytes().await.map_err(ErrorKind::ReadResponseBody)?;
        Ok(bytes.to_vec())
    }
}

/// A regular expression searched for in response bodies.
///
/// Bodies are matched as raw bytes, so non-UTF-8 content can still match.
#[derive(Debug, Clone)]
pub struct BodyMatcher {
    pattern: Regex,
}

impl BodyMatcher {
    /// Compile `pattern`
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidPattern`] if `pattern` is not a valid
    /// regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// The source text of the pattern
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns `true` if the pattern occurs anywhere in `body`
    #[must_use]
    pub fn is_match(&self, body: &[u8]) -> bool {
        self.pattern.is_match(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_anywhere_in_body() {
        let matcher = BodyMatcher::new("hello").unwrap();
        assert!(matcher.is_match(b"<p>oh, hello there</p>"));
        assert!(!matcher.is_match(b"<p>goodbye</p>"));
    }

    #[test]
    fn test_match_non_utf8_body() {
        let matcher = BodyMatcher::new("admin").unwrap();
        assert!(matcher.is_match(b"\xff\xfe admin \x00"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            BodyMatcher::new("(unclosed"),
            Err(ErrorKind::InvalidPattern(_))
        ));
    }
}
