pub mod cache;
pub mod db;
pub mod error;
pub mod index;
pub mod logging;
pub mod models;
pub mod scraper;
pub mod server;
pub mod service;

pub use error::ServiceError;
pub use models::{Company, CompanyPage, Dividend, ScrapedResult};
