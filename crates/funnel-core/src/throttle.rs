//! Delay-then-fetch adapter for polite fetching.
//!
//! Wraps any [`Fetcher`] so it can run inside the dispatcher: each call
//! first sleeps for the delay assigned by the schedule, then fetches the
//! item's URL and hands the item back with the raw payload.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use funnel_core::throttle::DelayedFetcher;
//! use funnel_core::traits::{ItemFetcher, Locate, WorkItem};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! # use funnel_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<String, funnel_core::error::AppError> { todo!() }
//! # }
//! # struct Page(String);
//! # impl WorkItem for Page { fn key(&self) -> &str { &self.0 } }
//! # impl Locate for Page { fn url(&self) -> &str { &self.0 } }
//! let fetcher = DelayedFetcher::new(MyFetcher);
//! let page = Page("https://example.com".into());
//! // Waits 1.5s, then fetches
//! let (page, html) = fetcher.fetch(page, Duration::from_millis(1500)).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use crate::error::AppError;
use crate::traits::{Fetcher, ItemFetcher, Locate, WorkItem};

/// An [`ItemFetcher`] that sleeps for the assigned delay before fetching.
#[derive(Debug, Clone)]
pub struct DelayedFetcher<F> {
    inner: F,
}

impl<F: Fetcher> DelayedFetcher<F> {
    /// Wrap an existing fetcher.
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F, W> ItemFetcher<W> for DelayedFetcher<F>
where
    F: Fetcher + 'static,
    W: WorkItem + Locate,
{
    async fn fetch(&self, item: W, delay: Duration) -> Result<(W, String), AppError> {
        if !delay.is_zero() {
            tracing::debug!(
                key = %item.key(),
                sleep_ms = %delay.as_millis(),
                "Throttling request"
            );
            tokio::time::sleep(delay).await;
        }
        let url = item.url().to_string();
        let payload = self.inner.fetch(&url).await?;
        Ok((item, payload))
    }
}
