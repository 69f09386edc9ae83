//! Wiring of storages, cache, upstream client and catalog.

use crate::CheeseshopConfig;
use cheeseshop_cache::AsyncCache;
use cheeseshop_core::{Package, Release, ReleaseData, SearchHit, SearchQuery};
use cheeseshop_error::CheeseshopResult;
use cheeseshop_proxy::{MemoryCatalog, Mirror, ProviderChain, PypiClient, UpstreamProvider};
use cheeseshop_storage::{BytesPayload, StorageCollection};
use std::sync::Arc;
use tracing::{info, instrument};

/// A ready-to-use package index: the local catalog in front of upstream,
/// backed by the configured storages.
pub struct Cheeseshop {
    client: Arc<PypiClient>,
    catalog: Arc<MemoryCatalog>,
    storages: Arc<StorageCollection>,
    chain: ProviderChain,
    mirror: Mirror,
}

impl std::fmt::Debug for Cheeseshop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cheeseshop")
            .field("storages", &self.storages.len())
            .field("packages", &self.catalog.len())
            .field("proxy_enabled", &self.client.is_enabled())
            .finish()
    }
}

impl Cheeseshop {
    /// Build every component from `config` and prepare the storages.
    ///
    /// # Errors
    ///
    /// Fails on an invalid backend configuration, an HTTP client that cannot
    /// be built, or a backend whose setup fails.
    #[instrument(skip(config))]
    pub async fn from_config(config: &CheeseshopConfig) -> CheeseshopResult<Self> {
        let storages = StorageCollection::from_config(config.storage())?;
        let cache = AsyncCache::new(config.cache().clone());
        let client = PypiClient::from_config(config.proxy(), cache)?;
        Self::assemble(client, storages).await
    }

    /// Assemble around an existing client and storage collection.
    pub async fn assemble(
        client: PypiClient,
        storages: StorageCollection,
    ) -> CheeseshopResult<Self> {
        storages.setup().await?;

        let client = Arc::new(client);
        let storages = Arc::new(storages);
        let catalog = Arc::new(MemoryCatalog::new());
        let chain = ProviderChain::new()
            .with_provider(catalog.clone())
            .with_provider(Arc::new(UpstreamProvider::new(client.clone())));
        let mirror = Mirror::new(client.clone(), catalog.clone(), storages.clone());

        info!(
            storages = storages.len(),
            proxy_enabled = client.is_enabled(),
            "Cheeseshop ready"
        );

        Ok(Self {
            client,
            catalog,
            storages,
            chain,
            mirror,
        })
    }

    /// Upstream client.
    pub fn client(&self) -> &Arc<PypiClient> {
        &self.client
    }

    /// Shared lookup cache.
    pub fn cache(&self) -> &AsyncCache {
        self.client.cache()
    }

    /// Local catalog.
    pub fn catalog(&self) -> &Arc<MemoryCatalog> {
        &self.catalog
    }

    /// Storage backends.
    pub fn storages(&self) -> &Arc<StorageCollection> {
        &self.storages
    }

    /// Look a package up locally, then upstream.
    pub async fn find_package(&self, name: &str) -> CheeseshopResult<Package> {
        self.chain.find_package(name).await
    }

    /// Releases of `name`, local packages first.
    pub async fn releases(&self, name: &str) -> CheeseshopResult<Vec<Release>> {
        self.chain.releases(name).await
    }

    /// Metadata and files of one release.
    pub async fn release_data(&self, name: &str, version: &str) -> CheeseshopResult<ReleaseData> {
        self.chain.release_data(name, version).await
    }

    /// Merged local and upstream search.
    pub async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        self.chain.search(query).await
    }

    /// Copy the upstream releases of `name` into the catalog.
    pub async fn mirror(&self, name: &str) -> CheeseshopResult<Package> {
        self.mirror.proxy_package(name).await
    }

    /// Mirror `name` if needed and stream one of its files from storage.
    pub async fn fetch(
        &self,
        name: &str,
        version: &str,
        filename: &str,
    ) -> CheeseshopResult<BytesPayload> {
        self.mirror.proxy_package(name).await?;
        self.mirror.fetch_file(name, version, filename).await
    }

    /// Clear the cache on `SIGUSR1`/`SIGUSR2` for as long as the task runs.
    #[cfg(unix)]
    pub fn watch_signals(&self) -> CheeseshopResult<tokio::task::JoinHandle<()>> {
        cheeseshop_cache::spawn_signal_invalidation(self.cache().clone())
    }
}
