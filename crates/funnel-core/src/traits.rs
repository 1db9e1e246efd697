use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// A unit of work handed through the dispatcher.
///
/// The dispatcher never looks inside an item; it only uses the key for
/// bookkeeping and log records.
pub trait WorkItem: Send + 'static {
    fn key(&self) -> &str;
}

/// Work items that know which URL should be fetched for them.
pub trait Locate {
    fn url(&self) -> &str;
}

/// Fetches the payload for a work item after waiting out its assigned delay.
///
/// Called concurrently from pool workers, one clone per task. The item is
/// handed back alongside the payload so it can be parsed on the dispatcher.
pub trait ItemFetcher<W: WorkItem>: Send + Sync + Clone + 'static {
    fn fetch(
        &self,
        item: W,
        delay: Duration,
    ) -> impl Future<Output = Result<(W, String), AppError>> + Send;
}

/// Completes a work item from its fetched payload.
///
/// Always invoked from the dispatcher itself, one call at a time.
pub trait Parser<W> {
    fn parse(&mut self, item: &mut W, payload: String) -> Result<(), AppError>;
}
