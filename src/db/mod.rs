pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Company, CompanyPage, Dividend};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Database(String),
    /// A uniqueness constraint fired. Distinct from `Database` so callers can
    /// tell a lost ingestion race from an outage.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRow {
    pub id: i64,
    pub ticker: String,
    pub name: String,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            ticker: row.ticker,
            name: row.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendRow {
    pub id: i64,
    pub company_id: i64,
    pub date: DateTime<Utc>,
    pub amount: String,
}

impl From<DividendRow> for Dividend {
    fn from(row: DividendRow) -> Self {
        Dividend {
            date: row.date,
            amount: row.amount,
        }
    }
}

/// Durable storage boundary. Companies are unique by ticker, dividend rows by
/// (company_id, date); both constraints live in the store itself so they hold
/// even when the pre-checks in the service layer race.
#[async_trait]
pub trait Database: Send + Sync {
    async fn company_exists(&self, ticker: &str) -> Result<bool, DbError>;

    async fn find_company_by_ticker(&self, ticker: &str) -> Result<Option<CompanyRow>, DbError>;

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRow>, DbError>;

    /// Persists a company and its dividend batch as one transactional unit:
    /// either the company row and every dividend row commit together or
    /// nothing does.
    async fn insert_company_with_dividends(
        &self,
        company: &Company,
        dividends: &[Dividend],
    ) -> Result<CompanyRow, DbError>;

    async fn dividends_for_company(&self, company_id: i64) -> Result<Vec<DividendRow>, DbError>;

    /// Batch delete by owner. Returns the number of rows removed.
    async fn delete_dividends_by_company(&self, company_id: i64) -> Result<u64, DbError>;

    async fn delete_company(&self, company_id: i64) -> Result<(), DbError>;

    /// Case-insensitive starts-with query over company names, ordered by
    /// name. Always reflects committed state, unlike the in-memory index.
    async fn search_names_by_prefix(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<String>, DbError>;

    async fn list_companies(&self, page: u32, page_size: u32) -> Result<CompanyPage, DbError>;

    /// Every stored company name, for seeding the autocomplete index at
    /// startup.
    async fn all_company_names(&self) -> Result<Vec<String>, DbError>;
}
