//! Handler of request dispatch.
//!
//! All requests go out through a single upstream proxy. Besides that the
//! client adds the fixed custom headers, keeps cookies in a jar shared by all
//! requests, and consults the per-host rate limiter right before sending.

use std::time::Duration;

use http::HeaderMap;
use log::debug;
use reqwest::redirect;
use typed_builder::TypedBuilder;
use url::Url;

use crate::ratelimit::{HostKey, HostRateLimiter};
use crate::{CookieJar, ErrorKind, InitialCookie, ItemError, Result, Stage, WorkItem};

/// Default timeout before a request is deemed as failed, 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default user agent, `gety/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("gety/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Upstream proxy all requests are sent through.
    ///
    /// When unset, proxies from the environment are ignored as well and
    /// requests are sent directly.
    proxy: Option<Url>,

    /// Overall timeout per request, from connecting until the end of the
    /// response body.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,

    /// Follow redirects (up to reqwest's default limit of 10).
    /// When `false` the redirect response itself is returned.
    #[builder(default = true)]
    follow_redirects: bool,

    /// Accept invalid TLS certificates.
    allow_insecure: bool,

    /// Headers added to every request.
    ///
    /// A name may occur more than once; all values are sent.
    custom_headers: HeaderMap,

    /// Cookies sent to every host, along with whatever cookies the hosts set
    /// themselves.
    cookies: Vec<InitialCookie>,

    /// User agent, unless overridden by a custom `User-Agent` header.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The proxy URL is not usable.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let Self {
            proxy,
            timeout,
            follow_redirects,
            allow_insecure,
            custom_headers,
            cookies,
            user_agent,
        } = self;

        let jar = CookieJar::new(cookies);

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(allow_insecure)
            .cookie_provider(jar.store())
            .timeout(timeout)
            .redirect(if follow_redirects {
                redirect::Policy::default()
            } else {
                redirect::Policy::none()
            });

        let builder = match proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| ErrorKind::InvalidProxy(proxy.to_string(), e.to_string()))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let reqwest_client = builder.build().map_err(ErrorKind::BuildClient)?;

        Ok(Client {
            reqwest_client,
            jar,
            custom_headers,
        })
    }
}

/// Sends single requests.
///
/// Cheap to share between tasks behind an `Arc`; the underlying connection
/// pool and the cookie jar are shared by all requests.
#[derive(Debug)]
pub struct Client {
    reqwest_client: reqwest::Client,
    jar: CookieJar,
    custom_headers: HeaderMap,
}

impl Client {
    /// Send the request described by `item` and return the response head.
    ///
    /// The URL is parsed first, then `limiter` is consulted for its host,
    /// and only then the request is built and sent. The body of the
    /// returned response has not been read yet.
    ///
    /// # Errors
    ///
    /// Returns an [`ItemError`] tagged with the stage which failed.
    pub async fn execute(
        &self,
        item: &WorkItem,
        limiter: &HostRateLimiter,
    ) -> std::result::Result<reqwest::Response, ItemError> {
        let fail = |stage, source| ItemError::new(stage, item.url.as_str(), source);

        let url = Url::parse(&item.url)
            .map_err(|e| fail(Stage::Parse, ErrorKind::ParseUrl(item.url.clone(), e)))?;
        let host = HostKey::try_from(&url).map_err(|e| fail(Stage::Parse, e))?;

        limiter.gate(&host).await;
        self.jar.seed(&host, &url);

        let mut request = self
            .reqwest_client
            .request(item.method.clone(), url)
            .build()
            .map_err(|e| fail(Stage::Build, ErrorKind::BuildRequest(e)))?;
        for (name, value) in &self.custom_headers {
            request.headers_mut().append(name, value.clone());
        }

        debug!("Sending {item}");
        self.reqwest_client
            .execute(request)
            .await
            .map_err(|e| fail(Stage::Send, ErrorKind::NetworkRequest(e)))
    }
}
