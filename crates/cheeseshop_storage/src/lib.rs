//! Streaming payloads and multi-backend file storage for Cheeseshop.
//!
//! Package files move through the system as [`BytesPayload`]s: sized,
//! single-pass byte streams that never hold a whole file in memory. A
//! [`StorageCollection`] fans one payload out to every configured
//! [`Storage`] backend at once.
//!
//! # Features
//!
//! - **Streaming**: files are read and written in fixed-size chunks
//! - **Fan-out**: one upstream read feeds every backend, with backpressure
//! - **Atomic writes**: the local backend writes a temp file then renames it
//! - **Inline verification**: digests are computed while bytes flow
//!
//! # Example
//!
//! ```rust
//! use cheeseshop_storage::{BytesPayload, MemoryStorage, StorageCollection};
//! use std::sync::Arc;
//!
//! # async fn example() -> cheeseshop_error::CheeseshopResult<()> {
//! let storages = StorageCollection::new().with_backend(Arc::new(MemoryStorage::new()));
//! storages.setup().await?;
//!
//! storages.put("sample-1.0.tar.gz", BytesPayload::from_bytes("hello")).await?;
//! let payload = storages.get("sample-1.0.tar.gz").await?;
//! assert_eq!(payload.into_bytes().await?, "hello");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod collection;
mod config;
mod local;
mod memory;
mod os;
mod payload;
mod storage;

pub use checksum::{Checksum, ChecksumAlgorithm, ChecksumHasher};
pub use collection::{DEFAULT_CHANNEL_CAPACITY, StorageCollection};
pub use config::{
    BackendConfig, BackendConfigBuilder, BackendKind, StorageConfig, StorageConfigBuilder,
    build_backends,
};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use payload::{ByteStream, BytesPayload, DEFAULT_CHUNK_SIZE};
pub use storage::Storage;

pub use cheeseshop_error::{StorageError, StorageErrorKind};
