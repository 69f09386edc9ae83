//! Copying upstream packages into the local catalog and storage.

use crate::{PackageCatalog, PypiClient};
use cheeseshop_core::{Package, Release, ReleaseFile, ReleaseVersion};
use cheeseshop_error::{CheeseshopError, CheeseshopResult, NotFoundError, NotFoundErrorKind};
use cheeseshop_storage::{BytesPayload, Checksum, StorageCollection};
use cheeseshop_task::{KeyedLocks, strict_gather};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Keeps the catalog and storage in step with upstream on demand.
#[derive(Debug)]
pub struct Mirror {
    client: Arc<PypiClient>,
    catalog: Arc<dyn PackageCatalog>,
    storages: Arc<StorageCollection>,
    locks: KeyedLocks<String>,
}

impl Mirror {
    /// Mirror writing into `catalog` and `storages`.
    pub fn new(
        client: Arc<PypiClient>,
        catalog: Arc<dyn PackageCatalog>,
        storages: Arc<StorageCollection>,
    ) -> Self {
        Self {
            client,
            catalog,
            storages,
            locks: KeyedLocks::new(),
        }
    }

    /// The catalog being filled.
    pub fn catalog(&self) -> &Arc<dyn PackageCatalog> {
        &self.catalog
    }

    /// Record every upstream release of `name` that the catalog lacks.
    ///
    /// Release data of new versions is fetched concurrently; files are only
    /// listed, their bytes arrive through [`fetch_file`](Self::fetch_file).
    /// A package uploaded locally shadows the upstream one and is returned
    /// untouched.
    #[instrument(skip(self))]
    pub async fn proxy_package(&self, name: &str) -> CheeseshopResult<Package> {
        if let Some(local) = self.catalog.package(name).await?
            && !local.is_proxy()
        {
            debug!("Local package shadows upstream");
            return Ok(local);
        }

        let real_name = self.client.find_real_name(name).await?;
        let package = Package::new(real_name.clone(), true);
        let _guard = self
            .locks
            .lock(format!("package:{}", package.normalized_name()))
            .await;

        if self.catalog.package(&real_name).await?.is_none() {
            self.catalog.create_package(package.clone()).await?;
        }

        let known: BTreeSet<ReleaseVersion> = self
            .catalog
            .releases(&real_name)
            .await?
            .into_iter()
            .map(|release| release.version)
            .collect();
        let missing: Vec<Release> = self
            .client
            .releases(&real_name)
            .await?
            .into_iter()
            .filter(|release| !known.contains(&release.version))
            .collect();

        if missing.is_empty() {
            debug!("Catalog up to date");
            return Ok(package);
        }

        let fetched = strict_gather(missing.into_iter().map(|release| {
            let client = Arc::clone(&self.client);
            let name = real_name.clone();
            async move {
                let data = client.release_data(&name, release.version.as_str()).await?;
                Ok::<_, CheeseshopError>((release, data))
            }
        }))
        .await?;

        let added = fetched.len();
        for (release, data) in fetched {
            self.catalog.add_release(&real_name, release, data).await?;
        }
        info!(package = %real_name, added, "Mirrored new releases");
        Ok(package)
    }

    /// Stream one file of a recorded release, downloading it first if needed.
    ///
    /// Downloads are checked against the published sha256 (or md5) digest
    /// while they are written to every storage backend; the file is only
    /// marked fetched once all backends hold it.
    #[instrument(skip(self))]
    pub async fn fetch_file(
        &self,
        name: &str,
        version: &str,
        filename: &str,
    ) -> CheeseshopResult<BytesPayload> {
        let data = self
            .catalog
            .release_data(name, version)
            .await?
            .ok_or_else(|| {
                NotFoundError::new(NotFoundErrorKind::Release {
                    name: name.to_string(),
                    version: version.to_string(),
                })
            })?;
        let file = data
            .file(filename)
            .cloned()
            .ok_or_else(|| NotFoundError::new(NotFoundErrorKind::File(filename.to_string())))?;

        if !file.fetched() {
            let _guard = self.locks.lock(format!("file:{}", filename)).await;
            if self.storages.exists(filename).await? {
                debug!("File already stored");
            } else {
                self.download(&file).await?;
            }
            self.catalog.mark_fetched(name, version, filename).await?;
        }

        self.storages.get(filename).await
    }

    async fn download(&self, file: &ReleaseFile) -> CheeseshopResult<()> {
        let payload = self.client.download(file.url()).await?;
        let payload = match expected_checksum(file) {
            Some(checksum) => payload.verify(checksum),
            None => {
                warn!(filename = %file.filename(), "No digest published, storing unverified");
                payload
            }
        };
        self.storages.put(file.filename(), payload).await?;
        info!(filename = %file.filename(), size = file.size(), "File fetched");
        Ok(())
    }
}

fn expected_checksum(file: &ReleaseFile) -> Option<Checksum> {
    file.sha256_digest()
        .clone()
        .map(Checksum::sha256)
        .or_else(|| file.md5_digest().clone().map(Checksum::md5))
}
