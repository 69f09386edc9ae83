//! The seam between the proxy client and the upstream wire protocol.

use async_trait::async_trait;
use cheeseshop_core::{ReleaseData, SearchHit, SearchQuery};
use cheeseshop_error::CheeseshopResult;
use cheeseshop_storage::BytesPayload;

/// Raw upstream index operations, one remote request each.
///
/// Implementations do no caching, retrying or post-processing; that is
/// [`PypiClient`](crate::PypiClient)'s job.
#[async_trait]
pub trait IndexTransport: Send + Sync + std::fmt::Debug {
    /// Every package name upstream knows, as published.
    async fn list_packages(&self) -> CheeseshopResult<Vec<String>>;

    /// Versions of `name`; hidden ones only when `show_hidden` is set.
    async fn package_releases(&self, name: &str, show_hidden: bool)
    -> CheeseshopResult<Vec<String>>;

    /// Metadata and files of one release, as upstream lists them.
    async fn release_data(&self, name: &str, version: &str) -> CheeseshopResult<ReleaseData>;

    /// Upstream search.
    async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>>;

    /// Stream the bytes behind `url`.
    async fn download(&self, url: &str) -> CheeseshopResult<BytesPayload>;
}
