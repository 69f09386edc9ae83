//! Package providers tried in order: local catalog first, upstream last.

use crate::PypiClient;
use async_trait::async_trait;
use cheeseshop_core::{Package, Release, ReleaseData, SearchHit, SearchQuery};
use cheeseshop_error::{CheeseshopError, CheeseshopResult, NotFoundError, NotFoundErrorKind};
use cheeseshop_task::join;
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Something that can answer package lookups.
///
/// `Ok(None)` means "not here, ask the next provider"; errors stop the chain.
#[async_trait]
pub trait PackageProvider: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// The package under its published name.
    async fn find_package(&self, name: &str) -> CheeseshopResult<Option<Package>>;

    /// Every release of the package.
    async fn releases(&self, name: &str) -> CheeseshopResult<Option<Vec<Release>>>;

    /// Metadata and files of one release.
    async fn release_data(&self, name: &str, version: &str)
    -> CheeseshopResult<Option<ReleaseData>>;

    /// Matching releases.
    async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>>;
}

/// Treat not-found as "no answer".
pub(crate) fn found<T>(result: CheeseshopResult<T>) -> CheeseshopResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Upstream index as a provider.
#[derive(Debug, Clone)]
pub struct UpstreamProvider {
    client: Arc<PypiClient>,
}

impl UpstreamProvider {
    /// Provider backed by `client`.
    pub fn new(client: Arc<PypiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PackageProvider for UpstreamProvider {
    fn name(&self) -> &str {
        "upstream"
    }

    async fn find_package(&self, name: &str) -> CheeseshopResult<Option<Package>> {
        Ok(found(self.client.find_real_name(name).await)?
            .map(|real_name| Package::new(real_name, true)))
    }

    async fn releases(&self, name: &str) -> CheeseshopResult<Option<Vec<Release>>> {
        let Some(real_name) = found(self.client.find_real_name(name).await)? else {
            return Ok(None);
        };
        found(self.client.releases(&real_name).await)
    }

    async fn release_data(
        &self,
        name: &str,
        version: &str,
    ) -> CheeseshopResult<Option<ReleaseData>> {
        let Some(real_name) = found(self.client.find_real_name(name).await)? else {
            return Ok(None);
        };
        found(self.client.release_data(&real_name, version).await)
    }

    async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        if !self.client.is_enabled() {
            return Ok(Vec::new());
        }
        self.client.search_query(query).await
    }
}

/// Providers consulted in registration order.
///
/// # Examples
///
/// ```
/// use cheeseshop_proxy::{MemoryCatalog, ProviderChain};
/// use std::sync::Arc;
///
/// let chain = ProviderChain::new().with_provider(Arc::new(MemoryCatalog::new()));
/// assert_eq!(chain.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn PackageProvider>>,
    buffer: usize,
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderChain {
    /// Chain with no providers.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            buffer: 32,
        }
    }

    /// Append a provider; earlier providers win.
    pub fn with_provider(mut self, provider: Arc<dyn PackageProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First provider that knows the package.
    #[instrument(skip(self))]
    pub async fn find_package(&self, name: &str) -> CheeseshopResult<Package> {
        for provider in &self.providers {
            if let Some(package) = provider.find_package(name).await? {
                debug!(provider = provider.name(), "Package found");
                return Ok(package);
            }
        }
        Err(NotFoundError::new(NotFoundErrorKind::Package(name.to_string())).into())
    }

    /// Releases from the first provider that knows the package.
    #[instrument(skip(self))]
    pub async fn releases(&self, name: &str) -> CheeseshopResult<Vec<Release>> {
        for provider in &self.providers {
            if let Some(releases) = provider.releases(name).await? {
                debug!(provider = provider.name(), count = releases.len(), "Releases found");
                return Ok(releases);
            }
        }
        Err(NotFoundError::new(NotFoundErrorKind::Package(name.to_string())).into())
    }

    /// Release data from the first provider that has the release.
    #[instrument(skip(self))]
    pub async fn release_data(&self, name: &str, version: &str) -> CheeseshopResult<ReleaseData> {
        for provider in &self.providers {
            if let Some(data) = provider.release_data(name, version).await? {
                debug!(provider = provider.name(), "Release found");
                return Ok(data);
            }
        }
        Err(NotFoundError::new(NotFoundErrorKind::Release {
            name: name.to_string(),
            version: version.to_string(),
        })
        .into())
    }

    /// Search every provider concurrently and merge the hits.
    ///
    /// A failing provider fails the whole search and cancels the others.
    #[instrument(skip(self, query), fields(operator = %query.operator))]
    pub async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        let sources: Vec<_> = self
            .providers
            .iter()
            .cloned()
            .map(|provider| {
                let query = query.clone();
                stream::once(async move { provider.search(&query).await })
                    .map_ok(|hits| stream::iter(hits.into_iter().map(Ok::<_, CheeseshopError>)))
                    .try_flatten()
                    .boxed()
            })
            .collect();

        let mut hits: Vec<SearchHit> = join(sources, self.buffer).try_collect().await?;
        hits.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then_with(|| a.version().cmp(b.version()))
        });
        debug!(count = hits.len(), "Search merged");
        Ok(hits)
    }
}
