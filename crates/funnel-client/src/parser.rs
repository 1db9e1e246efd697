use funnel_core::error::AppError;
use funnel_core::traits::Parser;
use scraper::{Html, Selector};

use crate::listing::Listing;

/// Fills a [`Listing`] from its HTML: document title and payload size.
#[derive(Debug, Clone)]
pub struct TitleParser {
    title: Selector,
    parsed: usize,
}

impl TitleParser {
    pub fn new() -> Result<Self, AppError> {
        let title = Selector::parse("head > title, title")
            .map_err(|e| AppError::ParseError(format!("Invalid title selector: {e}")))?;
        Ok(Self { title, parsed: 0 })
    }

    /// Number of listings parsed by this instance.
    pub fn parsed(&self) -> usize {
        self.parsed
    }

    fn extract_title(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let title = document
            .select(&self.title)
            .next()?
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        (!title.is_empty()).then_some(title)
    }
}

impl Parser<Listing> for TitleParser {
    fn parse(&mut self, item: &mut Listing, payload: String) -> Result<(), AppError> {
        item.title = self.extract_title(&payload);
        item.payload_bytes = payload.len();
        item.parsed = true;
        self.parsed += 1;

        tracing::debug!(
            key = %&item.key[..8],
            title = item.title.as_deref().unwrap_or("-"),
            bytes = item.payload_bytes,
            "Parsed listing"
        );
        Ok(())
    }
}
