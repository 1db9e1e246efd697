use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use funnel_core::{AppError, Fetcher, Locate, Parser, WorkItem};

/// A job posting to be scraped: filled in by [`PostingParser`].
#[derive(Debug, Clone)]
pub struct Posting {
    pub id: String,
    pub url: String,
    pub description: Option<String>,
}

impl Posting {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!("https://jobs.example.com/{id}"),
            description: None,
        }
    }
}

impl WorkItem for Posting {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Locate for Posting {
    fn url(&self) -> &str {
        &self.url
    }
}

/// In-memory site: serves a fixed page per URL, errors for unknown URLs.
#[derive(Clone, Default)]
pub struct FakeSite {
    pages: Arc<HashMap<String, String>>,
}

impl FakeSite {
    pub fn with_postings(ids: &[&str]) -> Self {
        let pages = ids
            .iter()
            .map(|id| {
                (
                    format!("https://jobs.example.com/{id}"),
                    format!("<html><p>Posting {id}</p></html>"),
                )
            })
            .collect();
        Self {
            pages: Arc::new(pages),
        }
    }
}

impl Fetcher for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

/// Copies the page into the posting and records the shared completion list.
#[derive(Clone, Default)]
pub struct PostingParser {
    pub completed: Arc<Mutex<Vec<String>>>,
}

impl Parser<Posting> for PostingParser {
    fn parse(&mut self, item: &mut Posting, payload: String) -> Result<(), AppError> {
        item.description = Some(payload);
        self.completed.lock().unwrap().push(item.id.clone());
        Ok(())
    }
}
