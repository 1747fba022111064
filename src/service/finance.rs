use std::sync::Arc;

use tracing::info;

use crate::cache::FinanceCache;
use crate::db::Database;
use crate::error::ServiceError;
use crate::models::ScrapedResult;

/// The cached dividend-history read path.
pub struct FinanceService {
    db: Arc<dyn Database>,
    cache: Arc<FinanceCache>,
}

impl FinanceService {
    pub fn new(db: Arc<dyn Database>, cache: Arc<FinanceCache>) -> Self {
        Self { db, cache }
    }

    /// Looks up a company's dividend history by exact name, read-through: a
    /// fresh cache entry short-circuits the store entirely. Only successful
    /// lookups are cached; a `NotFound` is recomputed every time.
    pub async fn dividends_by_company_name(
        &self,
        name: &str,
    ) -> Result<ScrapedResult, ServiceError> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(hit);
        }

        info!(company = %name, "dividend lookup");
        let company = self
            .db
            .find_company_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))?;

        let dividends = self
            .db
            .dividends_for_company(company.id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let result = ScrapedResult {
            company: company.into(),
            dividends,
        };
        self.cache.put(name, result.clone());
        Ok(result)
    }
}
