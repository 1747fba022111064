use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{CompanyRow, Database, DbError, DividendRow};
use crate::models::{Company, CompanyPage, Dividend};

#[derive(Clone)]
pub struct PostgresDb {
    pool: PgPool,
}

impl PostgresDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the tables on first run. Both uniqueness constraints live
    /// here: ticker for companies, (company_id, date) for dividends.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS companies (
                id BIGSERIAL PRIMARY KEY,
                ticker TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dividends (
                id BIGSERIAL PRIMARY KEY,
                company_id BIGINT NOT NULL,
                date TIMESTAMPTZ NOT NULL,
                amount TEXT NOT NULL,
                UNIQUE (company_id, date)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS companies_name_idx ON companies (lower(name))")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }
}

fn map_sqlx_err(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DbError::UniqueViolation(db.to_string())
        }
        _ => DbError::Database(err.to_string()),
    }
}

/// Escapes LIKE metacharacters so a user-supplied prefix is matched
/// literally. Patterns are bound with ESCAPE '\'.
fn escape_like(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl Database for PostgresDb {
    async fn company_exists(&self, ticker: &str) -> Result<bool, DbError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE ticker = $1)")
                .bind(ticker)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        Ok(exists)
    }

    async fn find_company_by_ticker(&self, ticker: &str) -> Result<Option<CompanyRow>, DbError> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, ticker, name FROM companies WHERE ticker = $1")
                .bind(ticker)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.map(|(id, ticker, name)| CompanyRow { id, ticker, name }))
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRow>, DbError> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, ticker, name FROM companies WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.map(|(id, ticker, name)| CompanyRow { id, ticker, name }))
    }

    async fn insert_company_with_dividends(
        &self,
        company: &Company,
        dividends: &[Dividend],
    ) -> Result<CompanyRow, DbError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let id: i64 =
            sqlx::query_scalar("INSERT INTO companies (ticker, name) VALUES ($1, $2) RETURNING id")
                .bind(&company.ticker)
                .bind(&company.name)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;

        if !dividends.is_empty() {
            let dates: Vec<DateTime<Utc>> = dividends.iter().map(|d| d.date).collect();
            let amounts: Vec<String> = dividends.iter().map(|d| d.amount.clone()).collect();
            sqlx::query(
                "INSERT INTO dividends (company_id, date, amount)
                 SELECT $1, date, amount
                 FROM UNNEST($2::timestamptz[], $3::text[]) AS t (date, amount)",
            )
            .bind(id)
            .bind(&dates)
            .bind(&amounts)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;

        Ok(CompanyRow {
            id,
            ticker: company.ticker.clone(),
            name: company.name.clone(),
        })
    }

    async fn dividends_for_company(&self, company_id: i64) -> Result<Vec<DividendRow>, DbError> {
        let rows: Vec<(i64, i64, DateTime<Utc>, String)> = sqlx::query_as(
            "SELECT id, company_id, date, amount FROM dividends
             WHERE company_id = $1 ORDER BY date",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, company_id, date, amount)| DividendRow {
                id,
                company_id,
                date,
                amount,
            })
            .collect())
    }

    async fn delete_dividends_by_company(&self, company_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM dividends WHERE company_id = $1")
            .bind(company_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_company(&self, company_id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(company_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn search_names_by_prefix(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<String>, DbError> {
        let pattern = format!("{}%", escape_like(prefix));
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM companies
             WHERE name ILIKE $1 ESCAPE '\\'
             ORDER BY name LIMIT $2",
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(names)
    }

    async fn list_companies(&self, page: u32, page_size: u32) -> Result<CompanyPage, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let offset = i64::from(page) * i64::from(page_size);
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT ticker, name FROM companies ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(CompanyPage {
            companies: rows
                .into_iter()
                .map(|(ticker, name)| Company { ticker, name })
                .collect(),
            page,
            page_size,
            total: total as u64,
        })
    }

    async fn all_company_names(&self) -> Result<Vec<String>, DbError> {
        sqlx::query_scalar("SELECT name FROM companies")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_passes_plain_text() {
        assert_eq!(escape_like("Coca"), "Coca");
    }

    #[test]
    fn escape_like_quotes_metacharacters() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }
}
