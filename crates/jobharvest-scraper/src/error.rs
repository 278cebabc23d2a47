use jobharvest_browser::BrowserError;
use jobharvest_core::{HarvestError, Platform};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("no adapter for {url}")]
    UnsupportedPage { url: String },

    #[error("invalid page URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{platform} page yielded no job: {reason}")]
    NothingExtracted { platform: Platform, reason: String },
}

impl From<ScrapeError> for HarvestError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::Browser(e) => HarvestError::Browser(e.to_string()),
            other => HarvestError::Scrape(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
