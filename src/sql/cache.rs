//! Memoised insert/update/upsert templates, keyed by column-set signature.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A built statement and the columns whose values it binds (in order) and reads back.
#[derive(Clone, Debug, Default)]
pub struct CachedQuery {
    pub query: String,
    pub value_columns: Vec<String>,
    pub returning: Vec<String>,
}

/// One template map behind its own lock. Misses are computed outside the lock; concurrent misses
/// on the same key both compute and the last store wins.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, CachedQuery>>,
}

impl TemplateCache {
    pub fn get(&self, key: &str) -> Option<CachedQuery> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn store(&self, key: String, query: CachedQuery) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, query);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three per-entity caches.
#[derive(Debug, Default)]
pub struct QueryCache {
    pub insert: TemplateCache,
    pub update: TemplateCache,
    pub upsert: TemplateCache,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn store_then_get() {
        let cache = TemplateCache::default();
        assert!(cache.get("a.").is_none());
        cache.store(
            "a.".into(),
            CachedQuery {
                query: "INSERT".into(),
                value_columns: vec!["a".into()],
                returning: vec![],
            },
        );
        assert_eq!(cache.get("a.").map(|c| c.query), Some("INSERT".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_stores_on_same_key_keep_one_entry() {
        let cache = Arc::new(TemplateCache::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.store(
                        "k".into(),
                        CachedQuery {
                            query: format!("q{}", i),
                            ..Default::default()
                        },
                    )
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").unwrap().query.starts_with('q'));
    }
}
