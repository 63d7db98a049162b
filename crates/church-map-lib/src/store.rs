//! Local persistent store seam for church records
//!
//! The cache talks to storage through [`ChurchStore`] so the application can
//! decide where records actually live. [`MemoryStore`] is the in-process
//! implementation; the viewer snapshots it into its settings blob to survive
//! restarts. Writes are wholesale per refresh batch, which gives the
//! per-batch consistency the rest of the crate assumes.

use crate::church::Church;
use crate::filter::ConfessionFilter;
use crate::Result;
use std::collections::BTreeMap;

/// Create-or-update / delete / filtered-read access to church records
pub trait ChurchStore {
    /// Replace the full record set with `churches`
    fn replace_all(&mut self, churches: Vec<Church>) -> Result<()>;

    /// Create or update a single record by id
    fn upsert(&mut self, church: Church) -> Result<()>;

    /// Delete a record by id; deleting a missing id is not an error
    fn delete(&mut self, id: i64) -> Result<()>;

    /// All records whose confession is enabled in `filter`, ordered by id
    fn by_confessions(&self, filter: &ConfessionFilter) -> Result<Vec<Church>>;

    /// Total number of stored records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store keyed by church id
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    churches: BTreeMap<i64, Church>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records (used when restoring a persisted snapshot)
    pub fn with_churches(churches: Vec<Church>) -> Self {
        Self {
            churches: churches.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Snapshot of every record, ordered by id
    pub fn all(&self) -> Vec<Church> {
        self.churches.values().cloned().collect()
    }
}

impl ChurchStore for MemoryStore {
    fn replace_all(&mut self, churches: Vec<Church>) -> Result<()> {
        self.churches = churches.into_iter().map(|c| (c.id, c)).collect();
        Ok(())
    }

    fn upsert(&mut self, church: Church) -> Result<()> {
        self.churches.insert(church.id, church);
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<()> {
        self.churches.remove(&id);
        Ok(())
    }

    fn by_confessions(&self, filter: &ConfessionFilter) -> Result<Vec<Church>> {
        // BTreeMap iteration keeps the id order the clusterer relies on
        Ok(self
            .churches
            .values()
            .filter(|c| filter.contains(c.confession))
            .cloned()
            .collect())
    }

    fn len(&self) -> usize {
        self.churches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::church::Confession;
    use crate::utils::lat_lon;

    fn church(id: i64, confession: Confession) -> Church {
        Church::new(id, lat_lon(55.75, 37.62), confession, format!("church {}", id))
    }

    #[test]
    fn test_replace_all_is_wholesale() {
        let mut store = MemoryStore::new();
        store.upsert(church(1, Confession::Orthodox)).unwrap();
        store.upsert(church(2, Confession::Catholic)).unwrap();

        store.replace_all(vec![church(3, Confession::Protestant)]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].id, 3);
    }

    #[test]
    fn test_upsert_updates_existing_id() {
        let mut store = MemoryStore::new();
        store.upsert(church(1, Confession::Orthodox)).unwrap();

        let mut renamed = church(1, Confession::Orthodox);
        renamed.name = "renamed".to_string();
        store.upsert(renamed).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].name, "renamed");
    }

    #[test]
    fn test_delete_missing_id_is_noop() {
        let mut store = MemoryStore::new();
        store.upsert(church(1, Confession::Orthodox)).unwrap();
        store.delete(99).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_by_confessions_filters_and_orders() {
        let mut store = MemoryStore::new();
        store.upsert(church(3, Confession::Catholic)).unwrap();
        store.upsert(church(1, Confession::Orthodox)).unwrap();
        store.upsert(church(2, Confession::Orthodox)).unwrap();

        let filter = ConfessionFilter::of([Confession::Orthodox]);
        let result = store.by_confessions(&filter).unwrap();
        let ids: Vec<i64> = result.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_empty_filter_returns_nothing() {
        let mut store = MemoryStore::new();
        store.upsert(church(1, Confession::Orthodox)).unwrap();
        let result = store.by_confessions(&ConfessionFilter::none()).unwrap();
        assert!(result.is_empty());
    }
}
