use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

use http::StatusCode;
use serde::de::Visitor;
use serde::Deserialize;
use thiserror::Error;

/// Errors when parsing a [`StatusFilter`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusFilterError {
    /// A list element is not an integer
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// An allow-list of HTTP status codes.
///
/// Parsed from a comma-separated list such as `200,403`. An empty list
/// allows every status code. Any integer is accepted; one which is no
/// valid status code simply never matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusFilter {
    codes: HashSet<i64>,
}

impl StatusFilter {
    /// Creates a filter which allows every status code
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns `true` if no restriction is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Returns whether `status` passes this filter
    #[must_use]
    pub fn contains(&self, status: StatusCode) -> bool {
        self.is_empty() || self.codes.contains(&i64::from(status.as_u16()))
    }
}

impl FromIterator<StatusCode> for StatusFilter {
    fn from_iter<T: IntoIterator<Item = StatusCode>>(iter: T) -> Self {
        Self {
            codes: iter
                .into_iter()
                .map(|status| i64::from(status.as_u16()))
                .collect(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = StatusFilterError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();

        let mut filter = Self::allow_all();
        if input.is_empty() {
            return Ok(filter);
        }

        for part in input.split(',') {
            let part = part.trim();
            let code = part
                .parse::<i64>()
                .map_err(|_| StatusFilterError::NotANumber(part.to_string()))?;
            filter.codes.insert(code);
        }
        Ok(filter)
    }
}

impl Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<i64> = self.codes.iter().copied().collect();
        codes.sort_unstable();
        let codes: Vec<String> = codes.iter().map(ToString::to_string).collect();
        write!(f, "{}", codes.join(","))
    }
}

struct StatusFilterVisitor;

impl<'de> Visitor<'de> for StatusFilterVisitor {
    type Value = StatusFilter;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a comma-separated string, a status code or a sequence of status codes")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        StatusFilter::from_str(v).map_err(serde::de::Error::custom)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let mut filter = StatusFilter::allow_all();
        filter.codes.insert(v);
        Ok(filter)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let v = i64::try_from(v).map_err(serde::de::Error::custom)?;
        self.visit_i64(v)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut filter = StatusFilter::allow_all();
        while let Some(code) = seq.next_element::<i64>()? {
            filter.codes.insert(code);
        }
        Ok(filter)
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(StatusFilterVisitor)
    }
}
