//! Process-local bucket store.

use super::{BucketStore, WindowBucket};
use std::collections::HashMap;

/// [`BucketStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: HashMap<String, WindowBucket>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true if no buckets are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl BucketStore for MemoryStore {
    fn get(&self, key: &str) -> Option<WindowBucket> {
        self.buckets.get(key).copied()
    }

    fn set(&mut self, key: &str, bucket: WindowBucket) {
        self.buckets.insert(key.to_string(), bucket);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.buckets.remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }
}
