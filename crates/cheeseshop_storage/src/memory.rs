//! In-process storage backend.

use crate::{BytesPayload, Storage};
use bytes::Bytes;
use cheeseshop_error::{CheeseshopResult, StorageError, StorageErrorKind};
use dashmap::DashMap;

/// Keeps objects in memory. Contents vanish with the process.
#[derive(Debug)]
pub struct MemoryStorage {
    name: String,
    objects: DashMap<String, Bytes>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// An empty backend named `memory`.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// An empty backend with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: DashMap::new(),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Stored bytes for `object_id`, if any.
    pub fn object(&self, object_id: &str) -> Option<Bytes> {
        self.objects.get(object_id).map(|entry| entry.value().clone())
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self) -> CheeseshopResult<()> {
        Ok(())
    }

    #[tracing::instrument(skip(self, payload), fields(backend = %self.name, size = payload.size()))]
    async fn put(&self, object_id: &str, payload: BytesPayload) -> CheeseshopResult<()> {
        let bytes = payload.into_bytes().await?;
        self.objects.insert(object_id.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, object_id: &str) -> CheeseshopResult<BytesPayload> {
        self.object(object_id)
            .map(BytesPayload::from_bytes)
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(object_id.to_string())).into())
    }

    async fn exists(&self, object_id: &str) -> CheeseshopResult<bool> {
        Ok(self.objects.contains_key(object_id))
    }
}
