//! Storage trait definition.

use crate::BytesPayload;
use cheeseshop_error::CheeseshopResult;

/// A place package files can be written to and read back from.
///
/// Backends are addressed by object ID (a file's basename). Writes replace
/// whatever was stored under the same ID.
#[async_trait::async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Backend identity: its configured path or URL.
    fn name(&self) -> &str;

    /// Prepare the backend for use.
    ///
    /// Must be idempotent; called once at startup before any `put`/`get`.
    async fn setup(&self) -> CheeseshopResult<()>;

    /// Consume `payload` and store it under `object_id`.
    ///
    /// Errors raised by the payload itself, such as a size mismatch, abort
    /// the write and leave nothing behind under `object_id`.
    async fn put(&self, object_id: &str, payload: BytesPayload) -> CheeseshopResult<()>;

    /// Open a stored object as a payload.
    ///
    /// # Errors
    ///
    /// A storage not-found error when nothing is stored under `object_id`.
    async fn get(&self, object_id: &str) -> CheeseshopResult<BytesPayload>;

    /// Whether anything is stored under `object_id`.
    async fn exists(&self, object_id: &str) -> CheeseshopResult<bool>;
}
