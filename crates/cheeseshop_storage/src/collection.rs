//! Fan-out across every configured backend.

use crate::{BytesPayload, Storage};
use bytes::Bytes;
use cheeseshop_error::{CheeseshopResult, ConfigError};
use cheeseshop_task::{KeyedLocks, fanout, strict_gather};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Chunks buffered per backend before the reader waits.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Every storage backend of the index, written in lockstep.
///
/// The first registered backend is the primary: reads and existence checks
/// go to it alone.
#[derive(Debug)]
pub struct StorageCollection {
    backends: Vec<Arc<dyn Storage>>,
    channel_capacity: usize,
    locks: KeyedLocks<String>,
}

impl Default for StorageCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageCollection {
    /// A collection with no backends.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            locks: KeyedLocks::new(),
        }
    }

    /// A collection over `backends`, in priority order.
    pub fn from_backends(backends: Vec<Arc<dyn Storage>>) -> Self {
        Self {
            backends,
            ..Self::new()
        }
    }

    /// Register another backend.
    pub fn with_backend(mut self, backend: Arc<dyn Storage>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Buffer `capacity` chunks per backend.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Registered backends, primary first.
    pub fn backends(&self) -> &[Arc<dyn Storage>] {
        &self.backends
    }

    /// Number of backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// True when no backend is registered.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    fn primary(&self) -> CheeseshopResult<&Arc<dyn Storage>> {
        self.backends
            .first()
            .ok_or_else(|| ConfigError::new("No storage backends configured").into())
    }

    /// Set every backend up concurrently.
    #[tracing::instrument(skip(self), fields(backends = self.backends.len()))]
    pub async fn setup(&self) -> CheeseshopResult<()> {
        let setups = self.backends.iter().map(|backend| {
            let backend = Arc::clone(backend);
            async move { backend.setup().await }
        });
        strict_gather(setups).await?;
        tracing::info!(backends = self.backends.len(), "Storage backends ready");
        Ok(())
    }

    /// Write `payload` to every backend.
    ///
    /// The payload is read once. Each chunk is copied into a bounded channel
    /// per backend, so the slowest backend sets the pace. If any backend or
    /// the payload fails, every write is cancelled and the first error is
    /// returned. Writes to the same `object_id` are serialized.
    ///
    /// # Errors
    ///
    /// A configuration error, without reading the payload, when no backend
    /// is registered.
    #[tracing::instrument(skip(self, payload), fields(size = payload.size(), backends = self.backends.len()))]
    pub async fn put(&self, object_id: &str, payload: BytesPayload) -> CheeseshopResult<()> {
        if self.backends.is_empty() {
            return Err(ConfigError::new("No storage backends configured").into());
        }

        let _guard = self.locks.lock(object_id.to_string()).await;

        let size = payload.size();
        let mut senders = Vec::with_capacity(self.backends.len());
        let mut tasks: Vec<BoxFuture<'static, CheeseshopResult<()>>> =
            Vec::with_capacity(self.backends.len() + 1);

        for backend in &self.backends {
            let (sender, receiver) = mpsc::channel::<CheeseshopResult<Bytes>>(self.channel_capacity);
            senders.push(sender);

            let backend = Arc::clone(backend);
            let object_id = object_id.to_string();
            tasks.push(Box::pin(async move {
                backend
                    .put(&object_id, BytesPayload::from_receiver(size, receiver))
                    .await
            }));
        }
        tasks.push(Box::pin(fanout(payload, senders)));

        strict_gather(tasks).await?;
        tracing::debug!(object_id, "Object written to every backend");
        Ok(())
    }

    /// Read `object_id` from the primary backend.
    ///
    /// No fallback: if the primary lacks the object, this is a not-found
    /// error even when another backend has it.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, object_id: &str) -> CheeseshopResult<BytesPayload> {
        self.primary()?.get(object_id).await
    }

    /// Whether the primary backend has `object_id`.
    pub async fn exists(&self, object_id: &str) -> CheeseshopResult<bool> {
        self.primary()?.exists(object_id).await
    }
}
