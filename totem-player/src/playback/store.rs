//! Durable playback position, keyed by device identifier

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Where the engine persists the index it will show next
///
/// One writer per device id (the engine playing it), last write wins.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Last index persisted for `device_id`, if any
    async fn load(&self, device_id: &str) -> Result<Option<i64>>;

    /// Persist `index` for `device_id`
    async fn save(&self, device_id: &str, index: usize) -> Result<()>;
}

/// Process-local store, used by tests and when no database is wanted
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: Mutex<HashMap<String, i64>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one device's index
    pub fn with_index(device_id: &str, index: i64) -> Self {
        let store = Self::new();
        store.set(device_id, index);
        store
    }

    pub fn get(&self, device_id: &str) -> Option<i64> {
        self.lock().get(device_id).copied()
    }

    pub fn set(&self, device_id: &str, index: i64) {
        self.lock().insert(device_id.to_string(), index);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, i64>> {
        // A poisoned map is still a valid map
        self.indexes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn load(&self, device_id: &str) -> Result<Option<i64>> {
        Ok(self.get(device_id))
    }

    async fn save(&self, device_id: &str, index: usize) -> Result<()> {
        self.set(device_id, index as i64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryIndexStore::with_index("lobby-tv", 2);
        assert_eq!(store.load("lobby-tv").await.unwrap(), Some(2));
        assert_eq!(store.load("other").await.unwrap(), None);

        store.save("lobby-tv", 0).await.unwrap();
        assert_eq!(store.get("lobby-tv"), Some(0));
    }
}
