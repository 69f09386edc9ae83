//! Cached, retrying client for the upstream index.

use crate::{HttpIndexTransport, IndexTransport, ProxyConfig, RetryPolicy};
use cheeseshop_cache::{AsyncCache, CachePolicy, Persistence};
use cheeseshop_core::{
    Release, ReleaseData, ReleaseFile, ReleaseFileBuilder, SearchHit, SearchQuery,
    normalize_package_name,
};
use cheeseshop_error::{
    CheeseshopError, CheeseshopResult, NotFoundError, NotFoundErrorKind, UpstreamError,
    UpstreamErrorKind, ValidationError,
};
use cheeseshop_storage::{BytesPayload, ChecksumAlgorithm, ChecksumHasher};
use futures::StreamExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

/// Cache function ids, one per cached lookup.
const PACKAGES: &str = "pypi.packages";
const RELEASES: &str = "pypi.releases";
const RELEASE_DATA: &str = "pypi.release_data";
const SEARCH: &str = "pypi.search";

/// Client for a PyPI-compatible upstream index.
///
/// Every lookup is cached in the injected [`AsyncCache`] and every remote call
/// goes through the [`RetryPolicy`].
#[derive(Debug)]
pub struct PypiClient {
    transport: Arc<dyn IndexTransport>,
    cache: AsyncCache,
    retry: RetryPolicy,
    enabled: bool,
    index_lock: Mutex<()>,
    packages_policy: CachePolicy,
    releases_policy: CachePolicy,
    release_data_policy: CachePolicy,
    search_policy: CachePolicy,
}

impl PypiClient {
    /// Client over an arbitrary transport.
    pub fn new(transport: Arc<dyn IndexTransport>, cache: AsyncCache, config: &ProxyConfig) -> Self {
        let ttl = cache.config().ttl().clone();
        Self {
            transport,
            retry: RetryPolicy::from_config(config),
            enabled: *config.enabled(),
            index_lock: Mutex::new(()),
            packages_policy: CachePolicy::new(PACKAGES, ttl.packages_ttl())
                .with_persistence(Persistence::File),
            releases_policy: CachePolicy::new(RELEASES, ttl.releases_ttl())
                .with_persistence(Persistence::File),
            release_data_policy: CachePolicy::new(RELEASE_DATA, ttl.release_data_ttl())
                .with_persistence(Persistence::File),
            search_policy: CachePolicy::new(SEARCH, ttl.search_ttl())
                .with_persistence(Persistence::File),
            cache,
        }
    }

    /// Client talking HTTP to `config.url()`.
    pub fn from_config(config: &ProxyConfig, cache: AsyncCache) -> CheeseshopResult<Self> {
        let transport = HttpIndexTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), cache, config))
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether upstream lookups are allowed.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The cache shared with other services.
    pub fn cache(&self) -> &AsyncCache {
        &self.cache
    }

    /// Upstream package index: normalized name to published name.
    #[instrument(skip(self))]
    pub async fn packages(&self) -> CheeseshopResult<BTreeMap<String, String>> {
        self.ensure_enabled()?;
        self.cache
            .get_or_compute(&self.packages_policy, &(), || async {
                let _guard = self.index_lock.lock().await;
                let names = self
                    .retry
                    .run("list_packages", || self.transport.list_packages())
                    .await?;
                let index: BTreeMap<String, String> = names
                    .into_iter()
                    .map(|name| (normalize_package_name(&name), name))
                    .collect();
                info!(packages = index.len(), "Remote package index updated");
                Ok::<_, CheeseshopError>(index)
            })
            .await
    }

    /// Published spelling of `name`.
    ///
    /// Fails with not-found when proxying is disabled or upstream does not
    /// know the package.
    #[instrument(skip(self))]
    pub async fn find_real_name(&self, name: &str) -> CheeseshopResult<String> {
        if !self.enabled {
            debug!("Proxying disabled");
            return Err(not_found(name));
        }

        let packages = self.packages().await?;
        packages
            .get(&normalize_package_name(name))
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    /// Whether upstream has the package with at least one release.
    #[instrument(skip(self))]
    pub async fn exists(&self, name: &str) -> CheeseshopResult<bool> {
        let real_name = match self.find_real_name(name).await {
            Ok(real_name) => real_name,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        Ok(!self.releases(&real_name).await?.is_empty())
    }

    /// Every release of `name`, hidden ones tagged, in version order.
    #[instrument(skip(self))]
    pub async fn releases(&self, name: &str) -> CheeseshopResult<Vec<Release>> {
        self.ensure_enabled()?;
        self.cache
            .get_or_compute(&self.releases_policy, &name, || async {
                let (all, current) = futures::try_join!(
                    self.retry
                        .run("package_releases", || self.transport.package_releases(name, true)),
                    self.retry
                        .run("package_releases", || self.transport.package_releases(name, false)),
                )?;

                // Hidden is decided on the published text so loosely equal
                // spellings like `1.0` and `1-0` stay separate releases.
                let all: BTreeSet<String> = all.into_iter().collect();
                let current: BTreeSet<String> = current.into_iter().collect();

                let mut releases: Vec<Release> = current
                    .iter()
                    .cloned()
                    .map(Release::current)
                    .chain(all.difference(&current).cloned().map(Release::hidden))
                    .collect();
                releases.sort();
                debug!(count = releases.len(), "Fetched releases");
                Ok::<_, CheeseshopError>(releases)
            })
            .await
    }

    /// Metadata and files of one release.
    ///
    /// A release with no uploaded files but a `download_url` gets a single
    /// synthesized file entry, measured and md5-hashed by downloading it.
    #[instrument(skip(self))]
    pub async fn release_data(&self, name: &str, version: &str) -> CheeseshopResult<ReleaseData> {
        self.ensure_enabled()?;
        self.cache
            .get_or_compute(&self.release_data_policy, &(name, version), || async {
                let mut data = self
                    .retry
                    .run("release_data", || self.transport.release_data(name, version))
                    .await?;

                let download_url = data
                    .info
                    .download_url
                    .clone()
                    .filter(|url| !url.trim().is_empty());

                match download_url {
                    Some(url) if data.files.is_empty() => {
                        data.files = match self.synthesize_file(&url).await {
                            Ok(file) => vec![file],
                            Err(e) => {
                                error!(
                                    name,
                                    version,
                                    error = %e,
                                    "Error when trying to download release"
                                );
                                Vec::new()
                            }
                        };
                    }
                    _ => data.files.sort_by(|a, b| a.filename().cmp(b.filename())),
                }
                Ok::<_, CheeseshopError>(data)
            })
            .await
    }

    /// Upstream search; the operator must be `or` or `and`.
    #[instrument(skip(self, names, descriptions))]
    pub async fn search(
        &self,
        names: Vec<String>,
        descriptions: Vec<String>,
        operator: &str,
    ) -> CheeseshopResult<Vec<SearchHit>> {
        let query = SearchQuery::new(names, descriptions, operator.parse()?);
        self.search_query(&query).await
    }

    /// Upstream search with an already validated query.
    #[instrument(skip(self, query), fields(operator = %query.operator))]
    pub async fn search_query(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        self.ensure_enabled()?;
        self.cache
            .get_or_compute(&self.search_policy, query, || async {
                self.retry
                    .run("search", || self.transport.search(query))
                    .await
            })
            .await
    }

    /// Stream the bytes behind an upstream file url.
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> CheeseshopResult<BytesPayload> {
        self.ensure_enabled()?;
        self.retry
            .run("download", || self.transport.download(url))
            .await
    }

    /// Download and describe an off-index file.
    async fn synthesize_file(&self, download_url: &str) -> CheeseshopResult<ReleaseFile> {
        let filename = url::Url::parse(download_url)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .map(|segment| segment.split('#').next().unwrap_or_default().to_string())
            .filter(|filename| !filename.is_empty())
            .ok_or_else(|| {
                CheeseshopError::from(ValidationError::new(format!(
                    "No filename in download url '{}'",
                    download_url
                )))
            })?;

        info!(download_url, "Synthesizing file entry from download url");
        let mut payload = self.download(download_url).await?;

        let mut hasher = ChecksumHasher::new(ChecksumAlgorithm::Md5);
        let mut size = 0u64;
        while let Some(chunk) = payload.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            size += chunk.len() as u64;
        }

        ReleaseFileBuilder::default()
            .filename(filename)
            .url(download_url)
            .md5_digest(Some(hasher.finish().hex().to_string()))
            .size(size)
            .build()
            .map_err(|e| ValidationError::new(format!("Invalid file entry: {}", e)).into())
    }

    fn ensure_enabled(&self) -> CheeseshopResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(UpstreamError::new(UpstreamErrorKind::Disabled).into())
        }
    }
}

#[track_caller]
fn not_found(name: &str) -> CheeseshopError {
    NotFoundError::new(NotFoundErrorKind::Package(name.to_string())).into()
}
