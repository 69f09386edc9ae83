//! In-memory upstream index with per-operation call counters.

use async_trait::async_trait;
use bytes::Bytes;
use cheeseshop_core::{
    ReleaseData, ReleaseFile, ReleaseFileBuilder, ReleaseInfo, SearchHit, SearchQuery,
};
use cheeseshop_error::{
    CheeseshopResult, HttpError, NotFoundError, NotFoundErrorKind, UpstreamError,
    UpstreamErrorKind,
};
use cheeseshop_proxy::IndexTransport;
use cheeseshop_storage::BytesPayload;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Upstream index served from memory.
///
/// `fail_next(n)` makes the next `n` calls, of any kind, fail with a
/// retryable transport error.
#[derive(Debug, Default)]
pub struct MockIndex {
    packages: Vec<String>,
    current: HashMap<String, Vec<String>>,
    hidden: HashMap<String, Vec<String>>,
    releases: HashMap<(String, String), ReleaseData>,
    files: HashMap<String, Bytes>,
    hits: Vec<SearchHit>,
    search_fault: bool,
    failures: AtomicUsize,
    calls: Mutex<HashMap<&'static str, usize>>,
}

#[allow(dead_code)]
impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package with its listed and hidden versions.
    pub fn with_package(mut self, name: &str, current: &[&str], hidden: &[&str]) -> Self {
        self.packages.push(name.to_string());
        self.current.insert(
            name.to_string(),
            current.iter().map(|v| v.to_string()).collect(),
        );
        self.hidden.insert(
            name.to_string(),
            hidden.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Add release data for one version.
    pub fn with_release(mut self, name: &str, version: &str, data: ReleaseData) -> Self {
        self.releases
            .insert((name.to_string(), version.to_string()), data);
        self
    }

    /// Serve `body` at `url`.
    pub fn with_file(mut self, url: &str, body: &'static [u8]) -> Self {
        self.files.insert(url.to_string(), Bytes::from_static(body));
        self
    }

    /// Results returned by every search.
    pub fn with_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.hits = hits;
        self
    }

    /// Make every search answer with an RPC fault.
    pub fn with_search_fault(mut self) -> Self {
        self.search_fault = true;
        self
    }

    /// Fail the next `n` calls with a retryable error.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// How often `operation` was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str) -> CheeseshopResult<()> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(HttpError::new("connection reset").into());
        }
        Ok(())
    }
}

#[async_trait]
impl IndexTransport for MockIndex {
    async fn list_packages(&self) -> CheeseshopResult<Vec<String>> {
        self.record("list_packages")?;
        Ok(self.packages.clone())
    }

    async fn package_releases(
        &self,
        name: &str,
        show_hidden: bool,
    ) -> CheeseshopResult<Vec<String>> {
        self.record("package_releases")?;
        let mut versions = self.current.get(name).cloned().unwrap_or_default();
        if show_hidden {
            versions.extend(self.hidden.get(name).cloned().unwrap_or_default());
        }
        Ok(versions)
    }

    async fn release_data(&self, name: &str, version: &str) -> CheeseshopResult<ReleaseData> {
        self.record("release_data")?;
        self.releases
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| {
                NotFoundError::new(NotFoundErrorKind::Release {
                    name: name.to_string(),
                    version: version.to_string(),
                })
                .into()
            })
    }

    async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        self.record("search")?;
        if self.search_fault {
            return Err(UpstreamError::new(UpstreamErrorKind::Protocol(
                "search unavailable".to_string(),
            ))
            .into());
        }
        Ok(self
            .hits
            .iter()
            .filter(|hit| query.matches(hit.name(), hit.summary().as_deref()))
            .cloned()
            .collect())
    }

    async fn download(&self, url: &str) -> CheeseshopResult<BytesPayload> {
        self.record("download")?;
        self.files
            .get(url)
            .cloned()
            .map(BytesPayload::from_bytes)
            .ok_or_else(|| UpstreamError::new(UpstreamErrorKind::Status(404)).into())
    }
}

/// Release data with the given summary and files.
#[allow(dead_code)]
pub fn release(name: &str, version: &str, summary: &str, files: Vec<ReleaseFile>) -> ReleaseData {
    ReleaseData {
        info: ReleaseInfo {
            name: name.to_string(),
            version: version.to_string(),
            summary: Some(summary.to_string()),
            ..Default::default()
        },
        files,
    }
}

/// A file entry served from `https://files.example/<filename>`.
#[allow(dead_code)]
pub fn release_file(filename: &str, size: u64, sha256: Option<&str>, md5: Option<&str>) -> ReleaseFile {
    ReleaseFileBuilder::default()
        .filename(filename)
        .url(format!("https://files.example/{}", filename))
        .size(size)
        .sha256_digest(sha256.map(str::to_string))
        .md5_digest(md5.map(str::to_string))
        .build()
        .unwrap()
}
