//! Local package metadata.

use crate::PackageProvider;
use async_trait::async_trait;
use cheeseshop_core::{
    Package, Release, ReleaseData, ReleaseVersion, SearchHit, SearchQuery, normalize_package_name,
};
use cheeseshop_error::{
    CheeseshopResult, NotFoundError, NotFoundErrorKind, StorageError, StorageErrorKind,
};
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Persistent record of packages, releases and fetched files.
///
/// Package names are matched after normalization.
#[async_trait]
pub trait PackageCatalog: Send + Sync + std::fmt::Debug {
    /// The package, if recorded.
    async fn package(&self, name: &str) -> CheeseshopResult<Option<Package>>;

    /// Record a new package; a conflict error if it already exists.
    async fn create_package(&self, package: Package) -> CheeseshopResult<()>;

    /// Recorded releases of the package, in version order.
    async fn releases(&self, name: &str) -> CheeseshopResult<Vec<Release>>;

    /// Recorded metadata and files of one release.
    async fn release_data(&self, name: &str, version: &str)
    -> CheeseshopResult<Option<ReleaseData>>;

    /// Record a new release; a conflict error if the version exists.
    async fn add_release(
        &self,
        name: &str,
        release: Release,
        data: ReleaseData,
    ) -> CheeseshopResult<()>;

    /// Flag a file of a recorded release as present in storage.
    async fn mark_fetched(&self, name: &str, version: &str, filename: &str)
    -> CheeseshopResult<()>;

    /// Every recorded package.
    async fn packages(&self) -> CheeseshopResult<Vec<Package>>;
}

#[derive(Debug)]
struct CatalogEntry {
    package: Package,
    releases: BTreeMap<ReleaseVersion, (Release, ReleaseData)>,
}

/// In-process catalog, also usable as the local [`PackageProvider`].
///
/// # Examples
///
/// ```
/// use cheeseshop_core::{Package, Release, ReleaseData};
/// use cheeseshop_proxy::{MemoryCatalog, PackageCatalog};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cheeseshop_error::CheeseshopResult<()> {
/// let catalog = MemoryCatalog::new();
/// catalog.create_package(Package::new("Flask", false)).await?;
/// catalog
///     .add_release("flask", Release::current("3.0"), ReleaseData::default())
///     .await?;
/// assert_eq!(catalog.releases("FLASK").await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: DashMap<String, CatalogEntry>,
}

impl MemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no package is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[track_caller]
fn missing_package(name: &str) -> cheeseshop_error::CheeseshopError {
    NotFoundError::new(NotFoundErrorKind::Package(name.to_string())).into()
}

#[async_trait]
impl PackageCatalog for MemoryCatalog {
    async fn package(&self, name: &str) -> CheeseshopResult<Option<Package>> {
        Ok(self
            .entries
            .get(&normalize_package_name(name))
            .map(|entry| entry.package.clone()))
    }

    async fn create_package(&self, package: Package) -> CheeseshopResult<()> {
        match self.entries.entry(package.normalized_name()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StorageError::new(
                StorageErrorKind::Conflict(format!("package {} already exists", package.name())),
            )
            .into()),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(CatalogEntry {
                    package,
                    releases: BTreeMap::new(),
                });
                Ok(())
            }
        }
    }

    async fn releases(&self, name: &str) -> CheeseshopResult<Vec<Release>> {
        let entry = self
            .entries
            .get(&normalize_package_name(name))
            .ok_or_else(|| missing_package(name))?;
        Ok(entry
            .releases
            .values()
            .map(|(release, _)| release.clone())
            .collect())
    }

    async fn release_data(
        &self,
        name: &str,
        version: &str,
    ) -> CheeseshopResult<Option<ReleaseData>> {
        Ok(self
            .entries
            .get(&normalize_package_name(name))
            .and_then(|entry| {
                entry
                    .releases
                    .get(&ReleaseVersion::new(version))
                    .map(|(_, data)| data.clone())
            }))
    }

    async fn add_release(
        &self,
        name: &str,
        release: Release,
        data: ReleaseData,
    ) -> CheeseshopResult<()> {
        let mut entry = self
            .entries
            .get_mut(&normalize_package_name(name))
            .ok_or_else(|| missing_package(name))?;
        if entry.releases.contains_key(&release.version) {
            return Err(StorageError::new(StorageErrorKind::Conflict(format!(
                "release {} {} already exists",
                name, release.version
            )))
            .into());
        }
        entry
            .releases
            .insert(release.version.clone(), (release, data));
        Ok(())
    }

    async fn mark_fetched(
        &self,
        name: &str,
        version: &str,
        filename: &str,
    ) -> CheeseshopResult<()> {
        let mut entry = self
            .entries
            .get_mut(&normalize_package_name(name))
            .ok_or_else(|| missing_package(name))?;
        let (_, data) = entry
            .releases
            .get_mut(&ReleaseVersion::new(version))
            .ok_or_else(|| {
                NotFoundError::new(NotFoundErrorKind::Release {
                    name: name.to_string(),
                    version: version.to_string(),
                })
            })?;
        let file = data
            .files
            .iter_mut()
            .find(|file| file.filename() == filename)
            .ok_or_else(|| NotFoundError::new(NotFoundErrorKind::File(filename.to_string())))?;
        file.set_fetched(true);
        Ok(())
    }

    async fn packages(&self) -> CheeseshopResult<Vec<Package>> {
        let mut packages: Vec<Package> = self
            .entries
            .iter()
            .map(|entry| entry.package.clone())
            .collect();
        packages.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(packages)
    }
}

#[async_trait]
impl PackageProvider for MemoryCatalog {
    fn name(&self) -> &str {
        "local"
    }

    async fn find_package(&self, name: &str) -> CheeseshopResult<Option<Package>> {
        self.package(name).await
    }

    async fn releases(&self, name: &str) -> CheeseshopResult<Option<Vec<Release>>> {
        crate::provider::found(PackageCatalog::releases(self, name).await)
    }

    async fn release_data(
        &self,
        name: &str,
        version: &str,
    ) -> CheeseshopResult<Option<ReleaseData>> {
        PackageCatalog::release_data(self, name, version).await
    }

    /// Every recorded release whose package name matches, or whose
    /// description or summary contains a description term.
    async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        let mut hits = Vec::new();
        for entry in self.entries.iter() {
            for (release, data) in entry.releases.values() {
                let summary = data.info.summary.as_deref();
                let texts = [data.info.description.as_deref(), summary];
                if query.matches_any(entry.package.name(), &texts) {
                    hits.push(SearchHit::new(
                        entry.package.name().clone(),
                        release.version.to_string(),
                        summary.map(str::to_string),
                    ));
                }
            }
        }
        Ok(hits)
    }
}
