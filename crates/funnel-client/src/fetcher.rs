use std::net::IpAddr;
use std::time::Duration;

use funnel_core::error::AppError;
use funnel_core::traits::Fetcher;
use reqwest::{Client, StatusCode};
use url::Url;

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str =
    concat!("Funnel/", env!("CARGO_PKG_VERSION"), " (polite scraper)");

/// HTTP fetcher using reqwest.
///
/// Downloads raw HTML with a configurable User-Agent and timeout. Only
/// `http`/`https` URLs are accepted, and literal private/reserved IP hosts
/// are refused unless [`allow_private_urls`](Self::allow_private_urls) is
/// set. Pair it with [`funnel_core::DelayedFetcher`] to run it under a
/// delay schedule.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    block_private: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Self::with_user_agent(DEFAULT_USER_AGENT, timeout)
    }

    /// Build a fetcher that identifies itself with a custom User-Agent.
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            block_private: true,
        })
    }

    /// Allow requests to private/reserved IP literals (e.g. a local mirror).
    pub fn allow_private_urls(mut self) -> Self {
        self.block_private = false;
        self
    }

    fn check_target(&self, url: &str) -> Result<Url, AppError> {
        let parsed =
            Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL {url}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::HttpError(format!(
                "URL scheme '{}' is not allowed (only http/https)",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::HttpError(format!("URL has no host: {url}")))?;
        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        if self.block_private
            && let Ok(ip) = bare_host.parse::<IpAddr>()
            && is_private_ip(ip)
        {
            return Err(AppError::HttpError(format!(
                "Refusing to fetch private/reserved address {host}"
            )));
        }

        Ok(parsed)
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let target = self.check_target(url)?;

        let response = self.client.get(target).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;
        tracing::debug!(%url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

fn status_error(status: StatusCode, url: &str) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AppError::HttpError(format!(
            "HTTP 429 for {url}: rate limited, consider a larger max delay"
        )),
        _ => AppError::HttpError(format!("HTTP {} for {url}", status.as_u16())),
    }
}

/// Check if an IP address is loopback, private, link-local or otherwise reserved.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80
                || (v6.segments()[0] & 0xFE00) == 0xFC00
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}
