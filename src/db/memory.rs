use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::{CompanyRow, Database, DbError, DividendRow};
use crate::models::{Company, CompanyPage, Dividend};

/// In-process implementation of [`Database`]. Backs the test suite and local
/// experimentation; enforces the same two uniqueness constraints as the
/// Postgres schema so race handling can be exercised without a server.
#[derive(Default)]
pub struct MemoryDb {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    companies: Vec<CompanyRow>,
    dividends: Vec<DividendRow>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-mutation; tests should see it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn company_exists(&self, ticker: &str) -> Result<bool, DbError> {
        Ok(self.lock().companies.iter().any(|c| c.ticker == ticker))
    }

    async fn find_company_by_ticker(&self, ticker: &str) -> Result<Option<CompanyRow>, DbError> {
        Ok(self
            .lock()
            .companies
            .iter()
            .find(|c| c.ticker == ticker)
            .cloned())
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRow>, DbError> {
        Ok(self
            .lock()
            .companies
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn insert_company_with_dividends(
        &self,
        company: &Company,
        dividends: &[Dividend],
    ) -> Result<CompanyRow, DbError> {
        let mut inner = self.lock();

        if inner.companies.iter().any(|c| c.ticker == company.ticker) {
            return Err(DbError::UniqueViolation(format!(
                "companies.ticker: {}",
                company.ticker
            )));
        }

        let mut seen = HashSet::new();
        for d in dividends {
            if !seen.insert(d.date) {
                return Err(DbError::UniqueViolation(format!(
                    "dividends (company_id, date): {}",
                    d.date
                )));
            }
        }

        let company_id = inner.alloc_id();
        inner.companies.push(CompanyRow {
            id: company_id,
            ticker: company.ticker.clone(),
            name: company.name.clone(),
        });
        for d in dividends {
            let id = inner.alloc_id();
            inner.dividends.push(DividendRow {
                id,
                company_id,
                date: d.date,
                amount: d.amount.clone(),
            });
        }

        Ok(CompanyRow {
            id: company_id,
            ticker: company.ticker.clone(),
            name: company.name.clone(),
        })
    }

    async fn dividends_for_company(&self, company_id: i64) -> Result<Vec<DividendRow>, DbError> {
        let mut rows: Vec<DividendRow> = self
            .lock()
            .dividends
            .iter()
            .filter(|d| d.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.date);
        Ok(rows)
    }

    async fn delete_dividends_by_company(&self, company_id: i64) -> Result<u64, DbError> {
        let mut inner = self.lock();
        let before = inner.dividends.len();
        inner.dividends.retain(|d| d.company_id != company_id);
        Ok((before - inner.dividends.len()) as u64)
    }

    async fn delete_company(&self, company_id: i64) -> Result<(), DbError> {
        self.lock().companies.retain(|c| c.id != company_id);
        Ok(())
    }

    async fn search_names_by_prefix(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<String>, DbError> {
        let prefix = prefix.to_lowercase();
        let mut names: Vec<String> = self
            .lock()
            .companies
            .iter()
            .filter(|c| c.name.to_lowercase().starts_with(&prefix))
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names.truncate(limit as usize);
        Ok(names)
    }

    async fn list_companies(&self, page: u32, page_size: u32) -> Result<CompanyPage, DbError> {
        let inner = self.lock();
        let total = inner.companies.len() as u64;
        let companies = inner
            .companies
            .iter()
            .skip(page as usize * page_size as usize)
            .take(page_size as usize)
            .map(|c| Company {
                ticker: c.ticker.clone(),
                name: c.name.clone(),
            })
            .collect();
        Ok(CompanyPage {
            companies,
            page,
            page_size,
            total,
        })
    }

    async fn all_company_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self.lock().companies.iter().map(|c| c.name.clone()).collect())
    }
}
