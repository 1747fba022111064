use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::models::ScrapedResult;

/// Read-through cache for the dividends-by-company-name path, keyed by the
/// exact company name. Entries expire after a TTL; deletion of a company
/// additionally invalidates its name eagerly. Unbounded beyond the TTL — the
/// key space is one entry per ingested company.
pub struct FinanceCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    stored_at: Instant,
    value: ScrapedResult,
}

impl FinanceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<ScrapedResult> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(name)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, name: &str, value: ScrapedResult) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            name.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn invalidate(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Company;

    fn result(name: &str) -> ScrapedResult {
        ScrapedResult {
            company: Company {
                ticker: "KO".into(),
                name: name.into(),
            },
            dividends: Vec::new(),
        }
    }

    #[test]
    fn hit_returns_the_stored_snapshot() {
        let cache = FinanceCache::new(Duration::from_secs(60));
        cache.put("Coca-Cola", result("Coca-Cola"));
        let hit = cache.get("Coca-Cola").unwrap();
        assert_eq!(hit.company.name, "Coca-Cola");
    }

    #[test]
    fn expired_entries_miss() {
        let cache = FinanceCache::new(Duration::ZERO);
        cache.put("Coca-Cola", result("Coca-Cola"));
        assert!(cache.get("Coca-Cola").is_none());
    }

    #[test]
    fn invalidate_removes_the_entry() {
        let cache = FinanceCache::new(Duration::from_secs(60));
        cache.put("Coca-Cola", result("Coca-Cola"));
        cache.invalidate("Coca-Cola");
        assert!(cache.get("Coca-Cola").is_none());
    }

    #[test]
    fn unknown_name_misses() {
        let cache = FinanceCache::new(Duration::from_secs(60));
        assert!(cache.get("Nobody").is_none());
    }
}
