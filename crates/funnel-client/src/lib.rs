pub mod fetcher;
pub mod listing;
pub mod parser;

pub use fetcher::ReqwestFetcher;
pub use listing::Listing;
pub use parser::TitleParser;
