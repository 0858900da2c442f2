use chrono::{DateTime, Utc};

use crate::models::Row;

/// The most recent successful non-empty query result, kept for the chart
/// renderer and report exporter.
#[derive(Debug, Clone)]
pub struct CachedResultSet {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    /// The query text that produced these rows.
    pub query: String,
    pub created_at: DateTime<Utc>,
}

impl CachedResultSet {
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, threshold_secs: i64) -> bool {
        self.age_secs(now) <= threshold_secs
    }
}

/// Single-slot result cache. One per conversation; writing replaces the slot
/// wholesale, there is no queue or history.
#[derive(Debug, Default)]
pub struct ResultCache {
    slot: Option<CachedResultSet>,
}

impl ResultCache {
    pub fn store(&mut self, rows: Vec<Row>, columns: Vec<String>, query: impl Into<String>) {
        self.slot = Some(CachedResultSet {
            rows,
            columns,
            query: query.into(),
            created_at: Utc::now(),
        });
    }

    pub fn read(&self) -> Option<&CachedResultSet> {
        self.slot.as_ref()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use std::collections::HashMap;

    fn rows() -> Vec<Row> {
        vec![HashMap::from([("gene".to_string(), json!("TP53"))])]
    }

    #[test]
    fn test_store_stamps_current_time() {
        let before = Utc::now();
        let mut cache = ResultCache::default();
        cache.store(rows(), vec!["gene".to_string()], "SELECT gene FROM t");

        let cached = cache.read().unwrap();
        assert!(cached.created_at >= before);
        assert_eq!(cached.query, "SELECT gene FROM t");
        assert_eq!(cached.columns, vec!["gene"]);
    }

    #[test]
    fn test_store_replaces_slot_wholesale() {
        let mut cache = ResultCache::default();
        cache.store(rows(), vec!["gene".to_string()], "first");
        cache.store(
            vec![
                HashMap::from([("sample".to_string(), json!("s1"))]),
                HashMap::from([("sample".to_string(), json!("s2"))]),
            ],
            vec!["sample".to_string()],
            "second",
        );

        let cached = cache.read().unwrap();
        assert_eq!(cached.query, "second");
        assert_eq!(cached.rows.len(), 2);
        assert_eq!(cached.columns, vec!["sample"]);
    }

    #[test]
    fn test_freshness_window() {
        let mut cache = ResultCache::default();
        cache.store(rows(), vec!["gene".to_string()], "q");
        let cached = cache.read().unwrap();

        let now = cached.created_at + Duration::seconds(60);
        assert!(cached.is_fresh(now, 120));

        let later = cached.created_at + Duration::seconds(121);
        assert!(!cached.is_fresh(later, 120));
        assert_eq!(cached.age_secs(later), 121);
    }

    #[test]
    fn test_clear_empties_slot() {
        let mut cache = ResultCache::default();
        cache.store(rows(), vec!["gene".to_string()], "q");
        cache.clear();
        assert!(cache.read().is_none());
    }
}
