//! The submission loop.
//!
//! Items are read one at a time. Before each submission the burst throttle
//! may pause the loop, then the item waits for a free dispatcher slot. Inside
//! its task an item is rate limited, sent, filtered and finally reported.

use std::sync::Arc;

use log::{debug, info};
use tokio::io::AsyncBufRead;
use typed_builder::TypedBuilder;

use crate::burst::BurstThrottle;
use crate::client::Client;
use crate::dispatcher::Dispatcher;
use crate::filter::ResponseFilter;
use crate::ratelimit::HostRateLimiter;
use crate::report::ReportSink;
use crate::source::LineSource;
use crate::stats::{Counters, Stats};
use crate::{ItemError, RequestOutcome, Result, Stage, WorkItem};

/// Default number of requests in flight, 10.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Drives a complete run.
#[derive(TypedBuilder, Debug)]
pub struct Runner {
    /// Client used for all requests
    client: Client,

    /// Per-host rate limiter, disabled by default
    #[builder(default = HostRateLimiter::disabled())]
    limiter: HostRateLimiter,

    /// Decides which responses are reported; reports everything by default
    #[builder(default)]
    filter: ResponseFilter,

    /// Pauses submission after every burst; disabled by default
    #[builder(default)]
    throttle: BurstThrottle,

    /// Maximum number of requests in flight
    #[builder(default = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

/// State shared by all tasks of a run
#[derive(Debug)]
struct Shared {
    client: Client,
    limiter: HostRateLimiter,
    filter: ResponseFilter,
    sink: ReportSink,
    counters: Counters,
}

impl Runner {
    /// Dispatch every item of `source` and send the results to `sink`.
    ///
    /// Returns once all submitted items have completed.
    ///
    /// # Errors
    ///
    /// Fails if the concurrency limit is zero, or if reading the input
    /// fails. In the latter case no further items are submitted, but items
    /// already in flight are still completed and reported.
    pub async fn run<R>(self, mut source: LineSource<R>, sink: ReportSink) -> Result<Stats>
    where
        R: AsyncBufRead + Unpin,
    {
        let Self {
            client,
            limiter,
            filter,
            mut throttle,
            concurrency,
        } = self;

        let dispatcher = Dispatcher::new(concurrency)?;
        let shared = Arc::new(Shared {
            client,
            limiter,
            filter,
            sink,
            counters: Counters::default(),
        });

        let result = loop {
            let item = match source.next_item().await {
                Ok(Some(item)) => item,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            if shared.sink.is_closed() {
                debug!("Output is closed, not submitting any further items");
                break Ok(());
            }

            if let Some(cooldown) = throttle.register() {
                shared
                    .sink
                    .notice(format!(
                        "burst of {} reached, cooling down for {cooldown:?}...",
                        throttle.size()
                    ))
                    .await;
                tokio::time::sleep(cooldown).await;
            }

            shared.counters.submitted();
            let task = Arc::clone(&shared);
            dispatcher.submit(async move { task.process(item).await }).await;
        };

        dispatcher.drain_and_wait().await;

        let stats = shared.counters.snapshot();
        info!("{stats}");
        result.map(|()| stats)
    }
}

impl Shared {
    async fn process(&self, item: WorkItem) {
        let response = match self.client.execute(&item, &self.limiter).await {
            Ok(response) => response,
            Err(error) => {
                if error.is_timeout() {
                    debug!("Timed out waiting for {item}");
                }
                self.counters.failed();
                self.sink.failed(error).await;
                return;
            }
        };

        let status = response.status();
        match self.filter.accept(status, response).await {
            Ok(true) => {
                self.counters.reported();
                self.sink.reported(RequestOutcome::new(item, status)).await;
            }
            Ok(false) => {
                self.counters.filtered();
                debug!("Filtered out {item} ({status})");
            }
            Err(e) => {
                self.counters.failed();
                self.sink.failed(ItemError::new(Stage::Read, item.url, e)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::str::FromStr;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use test_utils::{mock_proxy, mount_host};
    use tokio::io::{AsyncRead, BufReader, ReadBuf};
    use url::Url;
    use wiremock::MockServer;

    use super::*;
    use crate::filter::{BodyMatcher, StatusFilter};
    use crate::{report, ClientBuilder, ErrorKind};

    fn client(proxy: &MockServer) -> Client {
        ClientBuilder::builder()
            .proxy(Url::parse(&proxy.uri()).unwrap())
            .build()
            .client()
            .unwrap()
    }

    /// Run `runner` over `input` and return the sorted report lines, the
    /// diagnostic lines and the statistics
    async fn run(runner: Runner, input: &str) -> (Vec<String>, Vec<String>, Stats) {
        let (sink, handle) = report::spawn(Vec::new(), Vec::new(), 16);
        let source = LineSource::new(input.as_bytes(), Method::GET);

        let stats = runner.run(source, sink).await.unwrap();
        let (out, err) = handle.await.unwrap().unwrap();

        let mut out: Vec<String> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        out.sort();
        let err = String::from_utf8(err)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        (out, err, stats)
    }

    #[tokio::test]
    async fn test_end_to_end_through_proxy() {
        let proxy = mock_proxy!();
        mount_host!(proxy, "a.test", StatusCode::OK);
        mount_host!(proxy, "b.test", StatusCode::NOT_FOUND);

        let runner = Runner::builder().client(client(&proxy)).build();
        let (out, err, stats) = run(runner, "http://a.test/\nhttp://b.test/\n").await;

        assert_eq!(
            out,
            vec![
                "GET http://a.test/ -> 200 OK",
                "GET http://b.test/ -> 404 Not Found",
            ]
        );
        assert!(err.is_empty());
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.reported, 2);
    }

    #[tokio::test]
    async fn test_status_filter_drops_silently() {
        let proxy = mock_proxy!();
        mount_host!(proxy, "ok.test", StatusCode::OK);
        mount_host!(proxy, "moved.test", StatusCode::MOVED_PERMANENTLY);
        mount_host!(proxy, "forbidden.test", StatusCode::FORBIDDEN);
        mount_host!(proxy, "broken.test", StatusCode::INTERNAL_SERVER_ERROR);

        let runner = Runner::builder()
            .client(
                ClientBuilder::builder()
                    .proxy(Url::parse(&proxy.uri()).unwrap())
                    .follow_redirects(false)
                    .build()
                    .client()
                    .unwrap(),
            )
            .filter(ResponseFilter::new(
                StatusFilter::from_str("200,403").unwrap(),
                None,
            ))
            .build();
        let input = "http://ok.test/\nhttp://moved.test/\nhttp://forbidden.test/\nhttp://broken.test/\n";
        let (out, err, stats) = run(runner, input).await;

        assert_eq!(
            out,
            vec![
                "GET http://forbidden.test/ -> 403 Forbidden",
                "GET http://ok.test/ -> 200 OK",
            ]
        );
        assert!(err.is_empty());
        assert_eq!(stats.filtered, 2);
    }

    #[tokio::test]
    async fn test_body_filter() {
        let proxy = mock_proxy!();
        mount_host!(proxy, "a.test", StatusCode::OK, set_body_string("Welcome, admin"));
        mount_host!(proxy, "b.test", StatusCode::OK, set_body_string("Nothing here"));

        let runner = Runner::builder()
            .client(client(&proxy))
            .filter(ResponseFilter::new(
                StatusFilter::allow_all(),
                Some(BodyMatcher::new("(?i)ADMIN").unwrap()),
            ))
            .build();
        let (out, _, _) = run(runner, "http://a.test/\nhttp://b.test/\n").await;

        assert_eq!(out, vec!["GET http://a.test/ -> 200 OK"]);
    }

    #[tokio::test]
    async fn test_duplicates_are_requested_twice() {
        let proxy = mock_proxy!();
        mount_host!(proxy, "a.test", StatusCode::OK);

        let runner = Runner::builder().client(client(&proxy)).build();
        let (out, _, _) = run(runner, "http://a.test/\nhttp://a.test/\n").await;

        assert_eq!(out, vec!["GET http://a.test/ -> 200 OK"; 2]);
        assert_eq!(proxy.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_go_to_diagnostics() {
        let proxy = mock_proxy!();
        mount_host!(proxy, "a.test", StatusCode::OK);

        let runner = Runner::builder().client(client(&proxy)).concurrency(1).build();
        let (out, err, stats) = run(runner, "not a url\nhttp://a.test/\n").await;

        assert_eq!(out, vec!["GET http://a.test/ -> 200 OK"]);
        assert_eq!(err.len(), 1);
        assert!(err[0].starts_with("❌ parse not a url: "), "{}", err[0]);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.reported, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_cooldown_pauses_submission() {
        // Unparseable items fail without touching the network
        let runner = Runner::builder()
            .client(ClientBuilder::default().client().unwrap())
            .throttle(BurstThrottle::new(2, Duration::from_secs(10)))
            .build();
        let start = tokio::time::Instant::now();
        let (_, err, stats) = run(runner, "x1\nx2\nx3\nx4\nx5\n").await;

        // cooldowns before the 3rd and the 5th item, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(stats.submitted, 5);
        let notices: Vec<_> = err.iter().filter(|line| line.starts_with("🌩")).collect();
        assert_eq!(
            notices,
            vec!["🌩  burst of 2 reached, cooling down for 10s..."; 2]
        );
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let runner = Runner::builder()
            .client(ClientBuilder::default().client().unwrap())
            .concurrency(0usize)
            .build();
        let (sink, _handle) = report::spawn(Vec::new(), Vec::new(), 1);
        let source = LineSource::new(&b"http://a.test/\n"[..], Method::GET);

        assert!(matches!(
            runner.run(source, sink).await,
            Err(ErrorKind::ZeroConcurrency)
        ));
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
            buf.put_slice(b"not a url\n");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_error_drains_in_flight_items() {
        let runner = Runner::builder()
            .client(ClientBuilder::default().client().unwrap())
            .build();
        let (sink, handle) = report::spawn(Vec::new(), Vec::new(), 4);
        let source = LineSource::new(BufReader::new(FailingReader { served: false }), Method::GET);

        let result = runner.run(source, sink).await;
        let (_, err) = handle.await.unwrap().unwrap();

        assert!(matches!(result, Err(ErrorKind::ReadInput(_))));
        // the item read before the failure was still completed
        assert!(String::from_utf8(err).unwrap().starts_with("❌ parse not a url"));
    }
}
