use std::sync::Arc;

use tracing::{error, info};

use crate::cache::FinanceCache;
use crate::db::{Database, DbError};
use crate::error::ServiceError;
use crate::index::{AUTOCOMPLETE_LIMIT, NameIndex};
use crate::models::{Company, CompanyPage};
use crate::scraper::Scraper;

/// Ingestion and deletion pipelines plus the company-listing reads.
pub struct CompanyService {
    db: Arc<dyn Database>,
    scraper: Arc<dyn Scraper>,
    index: Arc<NameIndex>,
    cache: Arc<FinanceCache>,
}

impl CompanyService {
    pub fn new(
        db: Arc<dyn Database>,
        scraper: Arc<dyn Scraper>,
        index: Arc<NameIndex>,
        cache: Arc<FinanceCache>,
    ) -> Self {
        Self {
            db,
            scraper,
            index,
            cache,
        }
    }

    /// Ingests a ticker: existence check, scrape company metadata, scrape the
    /// full dividend history, persist both as one transactional unit.
    ///
    /// All-or-nothing from the caller's perspective: any scrape failure
    /// persists nothing, and a persistence failure rolls the company row back
    /// with its dividends. The name is NOT registered for autocomplete here;
    /// callers do that separately once they want the company visible.
    pub async fn save(&self, ticker: &str) -> Result<Company, ServiceError> {
        if self.db.company_exists(ticker).await? {
            return Err(ServiceError::AlreadyExists(ticker.to_string()));
        }

        let company = self
            .scraper
            .fetch_company(ticker)
            .await
            .map_err(|e| ServiceError::ScrapeFailed {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ServiceError::ScrapeFailed {
                ticker: ticker.to_string(),
                reason: "provider does not know this ticker".to_string(),
            })?;

        let dividends = self.scraper.fetch_dividends(&company).await.map_err(|e| {
            ServiceError::ScrapeFailed {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            }
        })?;

        let row = self
            .db
            .insert_company_with_dividends(&company, &dividends)
            .await
            .map_err(|e| match e {
                // The existence pre-check raced another save; the store's
                // uniqueness constraint is the backstop.
                DbError::UniqueViolation(detail) => ServiceError::DuplicateKey(detail),
                other => {
                    error!(
                        ticker = %company.ticker,
                        name = %company.name,
                        dividends = ?dividends,
                        error = %other,
                        "scraped data could not be persisted; payload logged for recovery"
                    );
                    ServiceError::PersistenceFailed {
                        ticker: ticker.to_string(),
                        source: other,
                    }
                }
            })?;

        info!(
            ticker = %row.ticker,
            name = %row.name,
            dividend_count = dividends.len(),
            "company ingested"
        );
        Ok(row.into())
    }

    /// Deletes a company and its dividend history. Dividends go first so a
    /// failure never leaves dividend rows pointing at a dead company; the
    /// index entry goes last so it never drops a name the store still has.
    pub async fn delete(&self, ticker: &str) -> Result<String, ServiceError> {
        let company = self
            .db
            .find_company_by_ticker(ticker)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ticker.to_string()))?;

        let removed = self.db.delete_dividends_by_company(company.id).await?;
        self.db.delete_company(company.id).await?;

        self.index.remove(&company.name);
        self.cache.invalidate(&company.name);

        info!(
            ticker = %company.ticker,
            name = %company.name,
            dividends_removed = removed,
            "company deleted"
        );
        Ok(company.name)
    }

    /// Makes a name autocomplete-visible. Idempotent, separate from `save` so
    /// callers control when (and whether) an ingested company shows up in
    /// typeahead.
    pub fn register_autocomplete(&self, name: &str) {
        self.index.insert(name);
    }

    /// Typeahead over the in-memory index. May lag the store briefly across
    /// the write pipelines.
    pub fn autocomplete(&self, prefix: &str) -> Vec<String> {
        self.index.autocomplete(prefix)
    }

    /// Store-backed name search: authoritative, unlike `autocomplete`.
    pub async fn search_names_by_prefix(&self, prefix: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .db
            .search_names_by_prefix(prefix, AUTOCOMPLETE_LIMIT as i64)
            .await?)
    }

    pub async fn list(&self, page: u32, page_size: u32) -> Result<CompanyPage, ServiceError> {
        Ok(self.db.list_companies(page, page_size).await?)
    }
}
