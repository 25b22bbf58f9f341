//! Reading work items from an input stream, one URL per line.

use http::Method;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{ErrorKind, Result, WorkItem};

/// Yields one [`WorkItem`] per non-blank input line.
///
/// Surrounding whitespace is trimmed. Lines are not validated here; a
/// malformed URL only fails once its item is dispatched.
#[derive(Debug)]
pub struct LineSource<R> {
    lines: Lines<R>,
    method: Method,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    /// Read items from `reader`, each to be requested with `method`
    pub fn new(reader: R, method: Method) -> Self {
        Self {
            lines: reader.lines(),
            method,
        }
    }

    /// The next work item, or `None` at the end of the input.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ReadInput`] if the underlying reader fails or
    /// a line is not valid UTF-8.
    pub async fn next_item(&mut self) -> Result<Option<WorkItem>> {
        while let Some(line) = self.lines.next_line().await.map_err(ErrorKind::ReadInput)? {
            let url = line.trim();
            if !url.is_empty() {
                return Ok(Some(WorkItem::new(url, self.method.clone())));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncRead, BufReader, ReadBuf};

    use super::*;

    async fn collect(input: &str) -> Vec<String> {
        let mut source = LineSource::new(input.as_bytes(), Method::GET);
        let mut urls = Vec::new();
        while let Some(item) = source.next_item().await.unwrap() {
            urls.push(item.url);
        }
        urls
    }

    #[tokio::test]
    async fn test_trims_and_skips_blank_lines() {
        let input = "  http://a.test/  \n\n\t\nhttp://b.test/\r\n   \n";
        assert_eq!(collect(input).await, vec!["http://a.test/", "http://b.test/"]);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        assert_eq!(
            collect("http://a.test/\nhttp://b.test/").await,
            vec!["http://a.test/", "http://b.test/"]
        );
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        assert_eq!(
            collect("http://a.test/\nhttp://a.test/\n").await,
            vec!["http://a.test/", "http://a.test/"]
        );
    }

    #[tokio::test]
    async fn test_items_carry_method() {
        let mut source = LineSource::new(&b"http://a.test/\n"[..], Method::POST);
        let item = source.next_item().await.unwrap().unwrap();
        assert_eq!(item, WorkItem::new("http://a.test/", Method::POST));
        assert!(source.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(collect("").await.is_empty());
    }

    /// Yields a single line and then fails
    struct FailingReader {
        served: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.served {
                return Poll::Ready(Err(io::Error::other("disk on fire")));
            }
            self.served = true;
            buf.put_slice(b"http://a.test/\n");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_error() {
        let reader = BufReader::new(FailingReader { served: false });
        let mut source = LineSource::new(reader, Method::GET);

        assert!(source.next_item().await.unwrap().is_some());
        assert!(matches!(
            source.next_item().await,
            Err(ErrorKind::ReadInput(_))
        ));
    }
}
