use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

use divtrack::cache::FinanceCache;
use divtrack::db::{Database, postgres::PostgresDb};
use divtrack::index::NameIndex;
use divtrack::logging::init_logging;
use divtrack::scraper::yahoo::YahooScraper;
use divtrack::server::{AppState, router, shutdown_signal};
use divtrack::service::{CompanyService, FinanceService};

#[derive(Debug, Parser)]
#[command(name = "divtrack", version, about = "Track company dividend histories")]
struct ServerConfig {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:8080")]
    bind: String,
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,
    #[arg(long, env = "SCRAPE_TIMEOUT_SECS", default_value_t = 30)]
    scrape_timeout_secs: u64,
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 600)]
    cache_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::parse();

    init_logging()?;
    info!(bind = %config.bind, "divtrack starting");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let db = PostgresDb::new(pool);
    db.init_schema()
        .await
        .context("failed to initialize database schema")?;
    let db: Arc<dyn Database> = Arc::new(db);

    let scraper = Arc::new(
        YahooScraper::new(Duration::from_secs(config.scrape_timeout_secs))
            .context("failed to build scraper client")?,
    );
    let cache = Arc::new(FinanceCache::new(Duration::from_secs(config.cache_ttl_secs)));

    // Nothing repopulates the index from disk on its own; seed it from the
    // store before serving so autocomplete sees pre-existing companies.
    let index = Arc::new(NameIndex::new());
    let names = db
        .all_company_names()
        .await
        .context("failed to seed autocomplete index")?;
    for name in &names {
        index.insert(name);
    }
    info!(seeded = names.len(), "autocomplete index seeded from store");

    let state = AppState {
        companies: Arc::new(CompanyService::new(
            db.clone(),
            scraper,
            index.clone(),
            cache.clone(),
        )),
        finance: Arc::new(FinanceService::new(db, cache)),
    };

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("divtrack stopped");
    Ok(())
}
