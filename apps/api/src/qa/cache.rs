//! Bounded LRU cache of generated answers.
//!
//! Keyed by (question, context fingerprint). The fingerprint is a fast
//! non-cryptographic hash of the rendered context string — a collision can
//! only serve a stale answer, which the no-invalidation policy already
//! accepts, so it is a cache-miss risk rather than a correctness risk.
//!
//! Entries are never invalidated explicitly; only LRU eviction beyond the
//! capacity removes them.

use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

type CacheKey = (String, u64);

pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, String>>,
}

impl ResponseCache {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, question: &str, context: &str) -> Option<String> {
        let key = (question.to_string(), fingerprint(context));
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).cloned()
    }

    /// Last-write-wins on races; values for the same key are expected to be
    /// value-equal anyway.
    pub fn put(&self, question: &str, context: &str, answer: String) {
        let key = (question.to_string(), fingerprint(context));
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(key, answer);
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }
}

fn fingerprint(context: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    context.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = ResponseCache::new(10);
        assert_eq!(cache.get("q", "ctx"), None);
        cache.put("q", "ctx", "answer".to_string());
        assert_eq!(cache.get("q", "ctx"), Some("answer".to_string()));
    }

    #[test]
    fn changed_context_misses() {
        let cache = ResponseCache::new(10);
        cache.put("q", "ctx v1", "answer".to_string());
        assert_eq!(cache.get("q", "ctx v2"), None);
    }

    #[test]
    fn changed_question_misses() {
        let cache = ResponseCache::new(10);
        cache.put("who", "ctx", "answer".to_string());
        assert_eq!(cache.get("what", "ctx"), None);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = ResponseCache::new(2);
        cache.put("a", "ctx", "1".to_string());
        cache.put("b", "ctx", "2".to_string());
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a", "ctx").is_some());
        cache.put("c", "ctx", "3".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", "ctx").is_some());
        assert!(cache.get("b", "ctx").is_none());
        assert!(cache.get("c", "ctx").is_some());
    }

    #[test]
    fn put_overwrites_existing_key() {
        let cache = ResponseCache::new(10);
        cache.put("q", "ctx", "old".to_string());
        cache.put("q", "ctx", "new".to_string());
        assert_eq!(cache.get("q", "ctx"), Some("new".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = ResponseCache::new(0);
        cache.put("q", "ctx", "answer".to_string());
        assert_eq!(cache.get("q", "ctx"), Some("answer".to_string()));
    }
}
