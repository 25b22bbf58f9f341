//! `gety` is a library for sending one HTTP request per URL of a list,
//! through a single upstream proxy, and reporting the responses.
//!
//! A run is wired together from a [`Client`], an optional per-host
//! [`HostRateLimiter`](ratelimit::HostRateLimiter), an optional
//! [`BurstThrottle`], and a [`ResponseFilter`](filter::ResponseFilter)
//! deciding which responses are reported:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use gety_lib::{report, ClientBuilder, LineSource, Method, Result, Runner};
//! use gety_lib::ratelimit::HostRateLimiter;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClientBuilder::builder()
//!         .proxy(gety_lib::Url::parse("http://127.0.0.1:8080").unwrap())
//!         .build()
//!         .client()?;
//!
//!     let runner = Runner::builder()
//!         .client(client)
//!         .limiter(HostRateLimiter::new(Duration::from_secs(1)))
//!         .concurrency(4)
//!         .build();
//!
//!     let (sink, reporter) = report::spawn(tokio::io::stdout(), tokio::io::stderr(), 64);
//!     let source = LineSource::new(tokio::io::BufReader::new(tokio::io::stdin()), Method::GET);
//!     let stats = runner.run(source, sink).await?;
//!     reporter.await.expect("reporter panicked")?;
//!
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

mod burst;
mod client;
mod dispatcher;
mod runner;
mod source;
mod stats;
mod types;
mod waiter;

pub mod filter;
pub mod ratelimit;
pub mod report;

pub use burst::BurstThrottle;
pub use client::{Client, ClientBuilder, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use dispatcher::Dispatcher;
pub use runner::{Runner, DEFAULT_CONCURRENCY};
pub use source::LineSource;
pub use stats::Stats;
pub use types::*;

/// Re-exported so callers need no direct dependency on `http` or `url`
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use url::Url;
