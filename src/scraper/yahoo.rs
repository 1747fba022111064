use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::models::{Company, Dividend};
use crate::scraper::{ScrapeError, Scraper};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
// Yahoo rejects requests without a browser-ish user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) divtrack/0.1";

pub struct YahooScraper {
    client: Client,
    base_url: String,
}

impl YahooScraper {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    async fn chart(&self, ticker: &str, query: &str) -> Result<Option<ChartResult>, ScrapeError> {
        let url = format!("{}/{}?{}", self.base_url, ticker, query);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let body: ChartResponse = response.json().await?;

        if let Some(err) = body.chart.error {
            return Err(ScrapeError::Parse(err.to_string()));
        }
        Ok(body.chart.result.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.swap_remove(0))
            }
        }))
    }
}

#[async_trait]
impl Scraper for YahooScraper {
    async fn fetch_company(&self, ticker: &str) -> Result<Option<Company>, ScrapeError> {
        let Some(result) = self.chart(ticker, "range=1d&interval=1d").await? else {
            return Ok(None);
        };

        let meta = result.meta;
        let Some(name) = meta.long_name.or(meta.short_name) else {
            return Err(ScrapeError::Parse(format!(
                "chart meta for {ticker} carries no company name"
            )));
        };
        Ok(Some(Company {
            ticker: meta.symbol,
            name,
        }))
    }

    async fn fetch_dividends(&self, company: &Company) -> Result<Vec<Dividend>, ScrapeError> {
        let result = self
            .chart(&company.ticker, "range=max&interval=1mo&events=div")
            .await?
            .ok_or_else(|| {
                ScrapeError::Parse(format!("no chart data for {}", company.ticker))
            })?;

        let events = result
            .events
            .and_then(|e| e.dividends)
            .unwrap_or_default();

        let mut dividends = Vec::with_capacity(events.len());
        for event in events.into_values() {
            let Some(date) = DateTime::<Utc>::from_timestamp(event.date, 0) else {
                return Err(ScrapeError::Parse(format!(
                    "dividend timestamp {} out of range",
                    event.date
                )));
            };
            dividends.push(Dividend {
                date,
                // The provider's literal number text, not a reformatted float.
                amount: event.amount.to_string(),
            });
        }
        dividends.sort_by_key(|d| d.date);

        debug!(
            ticker = %company.ticker,
            count = dividends.len(),
            "fetched dividend history"
        );
        Ok(dividends)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    symbol: String,
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: serde_json::Number,
    date: i64,
}
