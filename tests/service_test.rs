use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::Barrier;

use divtrack::ServiceError;
use divtrack::cache::FinanceCache;
use divtrack::db::{Database, memory::MemoryDb};
use divtrack::index::NameIndex;
use divtrack::models::{Company, Dividend};
use divtrack::scraper::{ScrapeError, Scraper};
use divtrack::service::{CompanyService, FinanceService};

/// Scripted provider: a fixed ticker -> (company, history) table, optional
/// forced dividend failure, optional rendezvous point so two concurrent
/// saves both get past the existence pre-check.
struct MockScraper {
    companies: HashMap<String, (Company, Vec<Dividend>)>,
    fail_dividends: bool,
    rendezvous: Option<Arc<Barrier>>,
}

impl MockScraper {
    fn new() -> Self {
        Self {
            companies: HashMap::new(),
            fail_dividends: false,
            rendezvous: None,
        }
    }

    fn with(mut self, ticker: &str, name: &str, dividends: Vec<Dividend>) -> Self {
        self.companies.insert(
            ticker.to_string(),
            (
                Company {
                    ticker: ticker.to_string(),
                    name: name.to_string(),
                },
                dividends,
            ),
        );
        self
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch_company(&self, ticker: &str) -> Result<Option<Company>, ScrapeError> {
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        Ok(self.companies.get(ticker).map(|(c, _)| c.clone()))
    }

    async fn fetch_dividends(&self, company: &Company) -> Result<Vec<Dividend>, ScrapeError> {
        if self.fail_dividends {
            return Err(ScrapeError::Parse("scripted provider failure".into()));
        }
        Ok(self
            .companies
            .get(&company.ticker)
            .map(|(_, d)| d.clone())
            .unwrap_or_default())
    }
}

struct Harness {
    db: Arc<MemoryDb>,
    index: Arc<NameIndex>,
    companies: Arc<CompanyService>,
    finance: FinanceService,
}

fn harness(scraper: MockScraper) -> Harness {
    let db = Arc::new(MemoryDb::new());
    let index = Arc::new(NameIndex::new());
    let cache = Arc::new(FinanceCache::new(Duration::from_secs(600)));
    let store: Arc<dyn Database> = db.clone();

    Harness {
        db: db.clone(),
        index: index.clone(),
        companies: Arc::new(CompanyService::new(
            store.clone(),
            Arc::new(scraper),
            index,
            cache.clone(),
        )),
        finance: FinanceService::new(store, cache),
    }
}

fn ko_dividends() -> Vec<Dividend> {
    vec![
        Dividend {
            date: Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap(),
            amount: "0.46".into(),
        },
        Dividend {
            date: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            amount: "0.46".into(),
        },
    ]
}

fn ko_scraper() -> MockScraper {
    MockScraper::new().with("KO", "Coca-Cola", ko_dividends())
}

#[tokio::test]
async fn save_persists_company_and_full_history() {
    let h = harness(ko_scraper());

    let company = h.companies.save("KO").await.unwrap();
    assert_eq!(company.ticker, "KO");
    assert_eq!(company.name, "Coca-Cola");

    let row = h.db.find_company_by_ticker("KO").await.unwrap().unwrap();
    let rows = h.db.dividends_for_company(row.id).await.unwrap();
    assert_eq!(rows.len(), 2);

    let result = h.finance.dividends_by_company_name("Coca-Cola").await.unwrap();
    assert_eq!(result.company.ticker, "KO");
    assert_eq!(result.dividends, ko_dividends());
}

#[tokio::test]
async fn second_save_reports_already_exists_and_changes_nothing() {
    let h = harness(ko_scraper());

    h.companies.save("KO").await.unwrap();
    h.companies.register_autocomplete("Coca-Cola");
    let row = h.db.find_company_by_ticker("KO").await.unwrap().unwrap();
    let before = h.db.dividends_for_company(row.id).await.unwrap();

    let err = h.companies.save("KO").await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(ref t) if t == "KO"));

    let after = h.db.dividends_for_company(row.id).await.unwrap();
    assert_eq!(before.len(), after.len());
    assert_eq!(h.index.len(), 1);
}

#[tokio::test]
async fn unknown_ticker_is_a_scrape_failure_with_no_persistence() {
    let h = harness(MockScraper::new());

    let err = h.companies.save("NOPE").await.unwrap_err();
    assert!(matches!(err, ServiceError::ScrapeFailed { .. }));
    assert!(!h.db.company_exists("NOPE").await.unwrap());
}

#[tokio::test]
async fn dividend_fetch_failure_persists_nothing() {
    let mut scraper = ko_scraper();
    scraper.fail_dividends = true;
    let h = harness(scraper);

    let err = h.companies.save("KO").await.unwrap_err();
    assert!(matches!(err, ServiceError::ScrapeFailed { .. }));
    assert!(!h.db.company_exists("KO").await.unwrap());
}

#[tokio::test]
async fn delete_is_not_found_the_second_time() {
    let h = harness(ko_scraper());
    h.companies.save("KO").await.unwrap();

    let name = h.companies.delete("KO").await.unwrap();
    assert_eq!(name, "Coca-Cola");

    let err = h.companies.delete("KO").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref t) if t == "KO"));
}

#[tokio::test]
async fn delete_cascades_to_dividend_rows() {
    let h = harness(ko_scraper());
    h.companies.save("KO").await.unwrap();
    let row = h.db.find_company_by_ticker("KO").await.unwrap().unwrap();

    h.companies.delete("KO").await.unwrap();

    assert!(h.db.find_company_by_ticker("KO").await.unwrap().is_none());
    assert!(h.db.dividends_for_company(row.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn autocomplete_tracks_save_and_delete() {
    let h = harness(ko_scraper());

    let company = h.companies.save("KO").await.unwrap();
    h.companies.register_autocomplete(&company.name);
    assert_eq!(h.companies.autocomplete("coca"), vec!["Coca-Cola"]);

    h.companies.delete("KO").await.unwrap();
    assert!(h.companies.autocomplete("coca").is_empty());
}

#[tokio::test]
async fn lookup_after_delete_is_not_found() {
    let h = harness(ko_scraper());
    h.companies.save("KO").await.unwrap();

    // Warm the cache, then delete; the delete must invalidate the entry.
    h.finance.dividends_by_company_name("Coca-Cola").await.unwrap();
    h.companies.delete("KO").await.unwrap();

    let err = h
        .finance
        .dividends_by_company_name("Coca-Cola")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn repeated_lookups_return_identical_snapshots() {
    let h = harness(ko_scraper());
    h.companies.save("KO").await.unwrap();

    let first = h.finance.dividends_by_company_name("Coca-Cola").await.unwrap();
    let second = h.finance.dividends_by_company_name("Coca-Cola").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn store_backed_name_search_matches_case_insensitively() {
    let h = harness(ko_scraper());
    h.companies.save("KO").await.unwrap();

    let names = h.companies.search_names_by_prefix("coca").await.unwrap();
    assert_eq!(names, vec!["Coca-Cola"]);
}

#[tokio::test]
async fn listing_pages_through_companies() {
    let h = harness(ko_scraper());
    h.companies.save("KO").await.unwrap();

    let page = h.companies.list(0, 10).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.companies[0].ticker, "KO");

    let empty = h.companies.list(1, 10).await.unwrap();
    assert!(empty.companies.is_empty());
    assert_eq!(empty.total, 1);
}

#[tokio::test]
async fn concurrent_saves_of_one_ticker_admit_exactly_one() {
    let mut scraper = ko_scraper();
    // Both tasks pass the existence pre-check before either persists, so the
    // loser must be stopped by the store's uniqueness constraint.
    let barrier = Arc::new(Barrier::new(2));
    scraper.rendezvous = Some(barrier);
    let h = harness(scraper);

    let a = tokio::spawn({
        let svc = h.companies.clone();
        async move { svc.save("KO").await }
    });
    let b = tokio::spawn({
        let svc = h.companies.clone();
        async move { svc.save("KO").await }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(
                err,
                ServiceError::AlreadyExists(_) | ServiceError::DuplicateKey(_)
            ));
        }
    }

    let row = h.db.find_company_by_ticker("KO").await.unwrap().unwrap();
    assert_eq!(h.db.dividends_for_company(row.id).await.unwrap().len(), 2);
    assert_eq!(h.db.list_companies(0, 10).await.unwrap().total, 1);
}
