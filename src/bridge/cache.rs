//! Append-only keyed caches with single-flight initialisation
//!
//! Each key owns a `OnceCell`. The shard lock is only held while the cell is
//! fetched, never while the value is computed, so a slow reflection scan for
//! one key does not block lookups of other keys in the same shard, and two
//! callers racing on the same key both observe the value of a single scan.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

pub struct OnceMap<K, V> {
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        OnceMap {
            cells: DashMap::new(),
        }
    }

    fn cell(&self, key: K) -> Arc<OnceCell<V>> {
        if let Some(cell) = self.cells.get(&key) {
            return cell.value().clone();
        }
        self.cells.entry(key).or_default().value().clone()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn get_or_init<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.cell(key).get_or_init(init).clone()
    }

    /// Like [`OnceMap::get_or_init`], but a failed initialisation leaves the
    /// key empty so a later call can try again.
    pub fn get_or_try_init<F, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.cell(key).get_or_try_init(init).cloned()
    }

    /// Store a value unless the key is already populated.
    pub fn insert(&self, key: K, value: V) -> bool {
        self.cell(key).set(value).is_ok()
    }

    /// Number of populated keys
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for OnceMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_value_is_never_replaced() {
        let map: OnceMap<&str, u32> = OnceMap::new();
        assert_eq!(map.get_or_init("a", || 1), 1);
        assert_eq!(map.get_or_init("a", || 2), 1);
        assert!(!map.insert("a", 3));
        assert_eq!(map.get(&"a"), Some(1));
    }

    #[test]
    fn test_failed_init_leaves_key_empty() {
        let map: OnceMap<&str, u32> = OnceMap::new();
        assert_eq!(map.get_or_try_init("a", || Err::<u32, ()>(())), Err(()));
        assert_eq!(map.get(&"a"), None);
        assert_eq!(map.len(), 0);
        assert_eq!(map.get_or_try_init("a", || Ok::<u32, ()>(7)), Ok(7));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_single_flight_across_threads() {
        let map: OnceMap<String, usize> = OnceMap::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let results: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        map.get_or_init("key".to_string(), || {
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            calls.fetch_add(1, Ordering::SeqCst)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| *r == results[0]));
    }
}
