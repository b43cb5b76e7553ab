use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::detection::domain::detection::{Detection, DetectionMode};

type CacheKey = ([u8; 32], DetectionMode);
type Slot = Arc<Mutex<Option<Option<Detection>>>>;

/// Remote detector answers for one batch call, keyed by payload hash and mode.
///
/// Created per batch and dropped with it, so nothing leaks between requests.
/// Each key owns a slot that is locked while its answer is being fetched:
/// a concurrent lookup of the same key waits and then sees the final answer,
/// so a key is queried at most once. `None` answers are cached too.
#[derive(Default)]
pub struct DetectionCache {
    slots: RwLock<HashMap<CacheKey, Slot>>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached answer for the key, or the result of `fetch`.
    ///
    /// `fetch` runs with the key held. Returning `None` from it leaves the key
    /// unfilled, which is how abandoned (cancelled) queries stay uncached.
    pub fn get_or_fetch(
        &self,
        hash: [u8; 32],
        mode: DetectionMode,
        fetch: impl FnOnce() -> Option<Option<Detection>>,
    ) -> Option<Option<Detection>> {
        let slot = self.slot((hash, mode));
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = entry.as_ref() {
            log::debug!("Detection cache hit ({mode:?})");
            return Some(hit.clone());
        }
        let fetched = fetch()?;
        *entry = Some(fetched.clone());
        Some(fetched)
    }

    /// Number of filled keys.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: CacheKey) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return slot.clone();
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region_box::RegionBox;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn face(x: f64) -> Option<Detection> {
        Some(Detection::Face(RegionBox::new(x, 0.0, 10.0, 10.0)))
    }

    /// Cached answer without filling the key.
    fn peek(cache: &DetectionCache, hash: [u8; 32], mode: DetectionMode) -> Option<Option<Detection>> {
        cache.get_or_fetch(hash, mode, || None)
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = DetectionCache::new();
        assert!(peek(&cache, [1; 32], DetectionMode::Face).is_none());
        let fetched = cache.get_or_fetch([1; 32], DetectionMode::Face, || Some(face(5.0)));
        assert_eq!(fetched, Some(face(5.0)));
        assert_eq!(peek(&cache, [1; 32], DetectionMode::Face), Some(face(5.0)));
    }

    #[test]
    fn test_hit_skips_fetch() {
        let cache = DetectionCache::new();
        cache.get_or_fetch([1; 32], DetectionMode::Face, || Some(face(1.0)));
        let again = cache.get_or_fetch([1; 32], DetectionMode::Face, || {
            panic!("fetched a cached key")
        });
        assert_eq!(again, Some(face(1.0)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mode_is_part_of_key() {
        let cache = DetectionCache::new();
        cache.get_or_fetch([1; 32], DetectionMode::Face, || Some(face(5.0)));
        assert!(peek(&cache, [1; 32], DetectionMode::Document).is_none());
    }

    #[test]
    fn test_negative_answers_are_cached() {
        let cache = DetectionCache::new();
        cache.get_or_fetch([2; 32], DetectionMode::Document, || Some(None));
        assert_eq!(peek(&cache, [2; 32], DetectionMode::Document), Some(None));
    }

    #[test]
    fn test_abandoned_fetch_leaves_key_empty() {
        let cache = DetectionCache::new();
        assert_eq!(cache.get_or_fetch([3; 32], DetectionMode::Face, || None), None);
        assert!(cache.is_empty());
        let retried = cache.get_or_fetch([3; 32], DetectionMode::Face, || Some(face(2.0)));
        assert_eq!(retried, Some(face(2.0)));
    }

    #[test]
    fn test_concurrent_lookups_fetch_once() {
        let cache = DetectionCache::new();
        let fetches = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let answer = cache.get_or_fetch([4; 32], DetectionMode::Face, || {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        Some(face(9.0))
                    });
                    assert_eq!(answer, Some(face(9.0)));
                });
            }
        });
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_keys_across_threads() {
        let cache = DetectionCache::new();
        std::thread::scope(|s| {
            for i in 0..4u8 {
                let cache = &cache;
                s.spawn(move || cache.get_or_fetch([i; 32], DetectionMode::Face, || Some(None)));
            }
        });
        assert_eq!(cache.len(), 4);
    }
}
