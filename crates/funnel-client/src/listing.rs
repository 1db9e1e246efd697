use funnel_core::compute_hash;
use funnel_core::traits::{Locate, WorkItem};
use serde::Serialize;

/// A page to scrape, keyed by the SHA-256 of its URL.
///
/// `title` and `payload_bytes` are filled in by [`crate::TitleParser`]
/// once the page has been fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub key: String,
    pub url: String,
    pub title: Option<String>,
    pub payload_bytes: usize,
    pub parsed: bool,
}

impl Listing {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            key: compute_hash(&url),
            url,
            title: None,
            payload_bytes: 0,
            parsed: false,
        }
    }

    /// Build listings from text with one URL per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_lines(text: &str) -> Vec<Self> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Self::new)
            .collect()
    }
}

impl WorkItem for Listing {
    fn key(&self) -> &str {
        &self.key
    }
}

impl Locate for Listing {
    fn url(&self) -> &str {
        &self.url
    }
}
