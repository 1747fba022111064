use std::collections::BTreeMap;
use std::sync::RwLock;

/// Maximum number of names a single autocomplete call returns.
pub const AUTOCOMPLETE_LIMIT: usize = 10;

/// Shared prefix index over company names, used for typeahead. Derived data:
/// the store's company rows are authoritative, and this index is seeded from
/// them at startup and mutated in lockstep with ingestion and deletion.
///
/// Keys are lowercased names so matching is case-insensitive; the original
/// spelling is kept as the value. One lock guards the map, and no critical
/// section awaits, so a write is never visible half-applied.
#[derive(Default)]
pub struct NameIndex {
    names: RwLock<BTreeMap<String, String>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.names.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.names.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a name. Idempotent: re-inserting a present name is a no-op.
    pub fn insert(&self, name: &str) {
        self.lock_write().insert(name.to_lowercase(), name.to_string());
    }

    /// Unregisters a name. Idempotent: removing an absent name is a no-op.
    pub fn remove(&self, name: &str) {
        self.lock_write().remove(&name.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.lock_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_read().is_empty()
    }

    /// All names starting with `prefix`, case-insensitively, capped at
    /// [`AUTOCOMPLETE_LIMIT`]. Ordered by the lowercased name, which is
    /// stable for a given index state.
    pub fn autocomplete(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        self.lock_read()
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .take(AUTOCOMPLETE_LIMIT)
            .map(|(_, original)| original.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let index = NameIndex::new();
        index.insert("Coca-Cola");
        index.insert("Coca-Cola");
        assert_eq!(index.len(), 1);
        assert_eq!(index.autocomplete("coca"), vec!["Coca-Cola"]);
    }

    #[test]
    fn remove_absent_name_is_a_noop() {
        let index = NameIndex::new();
        index.remove("Nothing Here");
        assert!(index.is_empty());
    }

    #[test]
    fn autocomplete_matches_case_insensitively() {
        let index = NameIndex::new();
        index.insert("Coca-Cola");
        index.insert("Colgate-Palmolive");
        index.insert("Microsoft");

        assert_eq!(
            index.autocomplete("CO"),
            vec!["Coca-Cola", "Colgate-Palmolive"]
        );
        assert!(index.autocomplete("xyz").is_empty());
    }

    #[test]
    fn autocomplete_caps_results() {
        let index = NameIndex::new();
        for i in 0..25 {
            index.insert(&format!("Acme {i:02}"));
        }
        assert_eq!(index.autocomplete("acme").len(), AUTOCOMPLETE_LIMIT);
    }

    #[test]
    fn empty_prefix_enumerates_from_the_start() {
        let index = NameIndex::new();
        index.insert("Beta");
        index.insert("Alpha");
        assert_eq!(index.autocomplete(""), vec!["Alpha", "Beta"]);
    }
}
