use anyhow::{Context, Result};
use gety_lib::{Client, ClientBuilder, HeaderMap};

use crate::options::{Config, HeaderMapExt};
use crate::parse::{parse_cookies, parse_proxy};

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    let proxy = parse_proxy(cfg.proxy.as_deref())?;
    let headers = HeaderMap::from_header_pairs(&cfg.header)?;
    let cookies = parse_cookies(&cfg.cookie)?;

    ClientBuilder::builder()
        .proxy(proxy)
        .timeout(cfg.timeout)
        .follow_redirects(!cfg.no_follow)
        .allow_insecure(cfg.insecure)
        .custom_headers(headers)
        .cookies(cookies)
        .build()
        .client()
        .context("Failed to create request client")
}
