//! Bucket storage.
//!
//! The limiter never touches a global map. It is handed a [`BucketStore`]
//! when constructed, which keeps tests isolated and leaves room for a shared
//! backend when several processes must agree on quotas.

mod bucket;
mod memory;

pub use bucket::WindowBucket;
pub use memory::MemoryStore;

/// Key-value storage for window buckets.
///
/// Keys have the form `<identifier>:<window index>`. The limiter serializes
/// all access, so implementations don't need interior locking.
pub trait BucketStore: Send {
    /// Returns the bucket stored under `key`, if any.
    fn get(&self, key: &str) -> Option<WindowBucket>;

    /// Stores `bucket` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, bucket: WindowBucket);

    /// Removes the bucket under `key`, returning whether one existed.
    fn delete(&mut self, key: &str) -> bool;

    /// Returns every stored key.
    fn keys(&self) -> Vec<String>;
}
