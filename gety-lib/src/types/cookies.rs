use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashSet;
use log::debug;
use reqwest::cookie::Jar;
use url::Url;

use crate::ratelimit::HostKey;
use crate::{ErrorKind, Result};

/// A cookie given on startup, sent with every request.
///
/// Parsed from `name=value`. Name and value are trimmed; the value may
/// itself contain `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialCookie {
    name: String,
    value: String,
}

impl InitialCookie {
    /// The cookie name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cookie value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for InitialCookie {
    type Err = ErrorKind;

    fn from_str(input: &str) -> Result<Self> {
        match input.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => Ok(Self {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(ErrorKind::InvalidCookie(input.to_string())),
        }
    }
}

impl fmt::Display for InitialCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Cookie jar shared by all requests of a run.
///
/// Cookies set by servers are stored as usual. The initial cookies are
/// seeded lazily: the first time a host is contacted they are added to the
/// jar for that host, so they travel together with server-set cookies.
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: Arc<Jar>,
    initial: Vec<InitialCookie>,
    seeded: DashSet<HostKey>,
}

impl CookieJar {
    /// Create a jar which seeds `initial` into every contacted host
    #[must_use]
    pub fn new(initial: Vec<InitialCookie>) -> Self {
        Self {
            inner: Arc::new(Jar::default()),
            initial,
            seeded: DashSet::new(),
        }
    }

    /// The underlying store, to be handed to the HTTP client
    #[must_use]
    pub fn store(&self) -> Arc<Jar> {
        Arc::clone(&self.inner)
    }

    /// Make sure the initial cookies are present for the host of `url`
    pub fn seed(&self, host: &HostKey, url: &Url) {
        if self.initial.is_empty() || !self.seeded.insert(host.clone()) {
            return;
        }
        debug!("Seeding {} initial cookie(s) for {host}", self.initial.len());
        for cookie in &self.initial {
            self.inner
                .add_cookie_str(&format!("{cookie}; Path=/"), url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    #[test]
    fn test_parse_cookie() {
        let cookie: InitialCookie = " session = abc=123 ".parse().unwrap();
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "abc=123");
        assert_eq!(cookie.to_string(), "session=abc=123");
    }

    #[test]
    fn test_parse_invalid_cookie() {
        assert!("novalue".parse::<InitialCookie>().is_err());
        assert!("=value".parse::<InitialCookie>().is_err());
    }

    #[test]
    fn test_seed_once_per_host() {
        let jar = CookieJar::new(vec!["a=1".parse().unwrap(), "b=2".parse().unwrap()]);
        let url = Url::parse("http://example.com/deep/path").unwrap();
        let host = HostKey::try_from(&url).unwrap();

        jar.seed(&host, &url);
        jar.seed(&host, &url);

        let root = Url::parse("http://example.com/").unwrap();
        let header = jar.store().cookies(&root).unwrap();
        let mut cookies: Vec<&str> = header.to_str().unwrap().split("; ").collect();
        cookies.sort_unstable();
        assert_eq!(cookies, ["a=1", "b=2"]);

        let other = Url::parse("http://other.com/").unwrap();
        assert!(jar.store().cookies(&other).is_none());
    }
}
