use std::fmt;

use http::{Method, StatusCode};

/// A single unit of work: one URL read from the input, to be requested with
/// the configured method.
///
/// Items have no identity beyond their text. The same URL appearing twice in
/// the input yields two independent items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// The URL exactly as read from the input (trimmed)
    pub url: String,
    /// The HTTP method to use
    pub method: Method,
}

impl WorkItem {
    /// Create a new work item
    #[must_use]
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// The outcome of a request which received a response.
///
/// Transport failures are not outcomes; see [`crate::ItemError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Method the request was sent with
    pub method: Method,
    /// The URL exactly as read from the input
    pub url: String,
    /// Status code of the final response
    pub status: StatusCode,
}

impl RequestOutcome {
    /// Create the outcome of `item` which was answered with `status`
    #[must_use]
    pub fn new(item: WorkItem, status: StatusCode) -> Self {
        Self {
            method: item.method,
            url: item.url,
            status,
        }
    }

    /// The canonical reason phrase of the status code, if it has one
    #[must_use]
    pub fn status_text(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }
}

/// Formats the report line, e.g. `GET http://example.com/ -> 200 OK`
impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.method,
            self.url,
            self.status.as_u16()
        )?;
        if let Some(text) = self.status_text() {
            write!(f, " {text}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        let item = WorkItem::new("http://b.test/", Method::GET);
        let outcome = RequestOutcome::new(item, StatusCode::NOT_FOUND);
        assert_eq!(outcome.to_string(), "GET http://b.test/ -> 404 Not Found");
    }

    #[test]
    fn test_outcome_display_unknown_reason() {
        let item = WorkItem::new("http://a.test/x?y=1", Method::PUT);
        let status = StatusCode::from_u16(599).unwrap();
        let outcome = RequestOutcome::new(item, status);
        assert_eq!(outcome.to_string(), "PUT http://a.test/x?y=1 -> 599");
    }
}
