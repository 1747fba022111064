pub mod yahoo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Company, Dividend};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected provider response: {0}")]
    Parse(String),
}

/// External data provider boundary. One implementation talks to Yahoo
/// Finance; tests substitute a scripted one.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Resolves company metadata for a ticker. `Ok(None)` means the provider
    /// does not know the ticker; errors mean the provider was unreachable or
    /// returned garbage.
    async fn fetch_company(&self, ticker: &str) -> Result<Option<Company>, ScrapeError>;

    /// Fetches the full dividend history for a resolved company. Always a
    /// complete re-fetch; there is no incremental mode.
    async fn fetch_dividends(&self, company: &Company) -> Result<Vec<Dividend>, ScrapeError>;
}
