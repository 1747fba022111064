use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A publicly traded company as resolved from the data provider. The ticker
/// is the natural key; the name is what search and autocomplete operate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub ticker: String,
    pub name: String,
}

/// A single dividend payout. The amount keeps the provider's formatting
/// verbatim; it is display data, not something we do arithmetic on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dividend {
    pub date: DateTime<Utc>,
    pub amount: String,
}

/// A company together with its full dividend history. Moved provider -> store
/// during ingestion and reassembled from rows on the read path; never stored
/// as its own entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedResult {
    pub company: Company,
    pub dividends: Vec<Dividend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyPage {
    pub companies: Vec<Company>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}
