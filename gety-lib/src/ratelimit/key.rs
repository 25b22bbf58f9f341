use std::fmt;

use url::Url;

use crate::ErrorKind;
use crate::types::Result;

/// A type-safe representation of a host for rate limiting purposes.
///
/// The host name is normalized to lowercase. An explicit port is part of
/// the key, so `example.com:8080` and `example.com` are limited
/// independently.
///
/// # Examples
///
/// ```
/// use gety_lib::ratelimit::HostKey;
/// use url::Url;
///
/// let url = Url::parse("https://API.example.com:8443/v1/users").unwrap();
/// let host_key = HostKey::try_from(&url).unwrap();
/// assert_eq!(host_key.as_str(), "api.example.com:8443");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey(String);

impl HostKey {
    /// Get the host as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the host as an owned String
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<&Url> for HostKey {
    type Error = ErrorKind;

    fn try_from(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(ErrorKind::InvalidUrlHost)?;

        let host = host.to_lowercase();
        Ok(match url.port() {
            Some(port) => HostKey(format!("{host}:{port}")),
            None => HostKey(host),
        })
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HostKey {
    fn from(host: &str) -> Self {
        HostKey(host.to_lowercase())
    }
}

impl From<String> for HostKey {
    fn from(host: String) -> Self {
        HostKey(host.to_lowercase())
    }
}
