//! Filesystem storage backend.
//!
//! Objects live under a root directory, sharded by a name-based UUID of the
//! object ID so no single directory grows too large.

use crate::{BytesPayload, DEFAULT_CHUNK_SIZE, Storage, os};
use cheeseshop_error::{CheeseshopError, CheeseshopResult, StorageError, StorageErrorKind, TaskError};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Filesystem storage backend.
///
/// Stores each object at `{root}/{h[0]}/{h[1]}/{h[2]}/{h[3..]}` where `h` is
/// the hex form of `uuid5(NAMESPACE_OID, object_id)`.
///
/// # Example Structure
///
/// ```text
/// /var/cheeseshop/packages/
/// ├── 3/
/// │   └── f/
/// │       └── a/
/// │           └── 9c2e1d...   (requests-2.31.0.tar.gz)
/// └── b/
///     └── 0/
///         └── 7/
///             └── 41aa5f...   (six-1.16.0-py2.py3-none-any.whl)
/// ```
///
/// # Features
///
/// - **Deterministic paths**: the same object ID always maps to the same file
/// - **Atomic writes**: data lands in a temp sibling, then is renamed; the
///   temp file is removed if the write fails or is cancelled
/// - **Preallocation**: space is reserved up front where the OS supports it
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    name: String,
    chunk_size: usize,
}

impl LocalStorage {
    /// Create a backend rooted at `root`. Nothing touches the disk until
    /// [`Storage::setup`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.display().to_string();
        Self {
            root,
            name,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Use `chunk_size` bytes per read chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `object_id` is stored. Stable across runs and hosts.
    ///
    /// # Examples
    ///
    /// ```
    /// use cheeseshop_storage::LocalStorage;
    ///
    /// let storage = LocalStorage::new("/srv/packages");
    /// let path = storage.path_for("sample-1.0.tar.gz");
    /// assert!(path.starts_with("/srv/packages"));
    /// assert_eq!(path, storage.path_for("sample-1.0.tar.gz"));
    /// ```
    pub fn path_for(&self, object_id: &str) -> PathBuf {
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, object_id.as_bytes())
            .simple()
            .to_string();
        self.root
            .join(&digest[0..1])
            .join(&digest[1..2])
            .join(&digest[2..3])
            .join(&digest[3..])
    }

    /// Stream `payload` into a temp sibling of `path`, then rename it into
    /// place.
    ///
    /// The temp file is unlinked when its [`TempPath`](tempfile::TempPath) drops, so a failed or
    /// cancelled write leaves nothing behind.
    async fn write_object(&self, path: &Path, mut payload: BytesPayload) -> CheeseshopResult<u64> {
        let parent = path.parent().ok_or_else(|| {
            StorageError::new(StorageErrorKind::InvalidPath(path.display().to_string()))
        })?;
        let prefix = match path.file_name() {
            Some(name) => format!("{}.", name.to_string_lossy()),
            None => String::from("."),
        };

        let size = payload.size();
        let dir = parent.to_path_buf();
        let (std_file, temp_path) = tokio::task::spawn_blocking(move || {
            let temp = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            os::preallocate(temp.as_file(), size);
            os::advise_sequential(temp.as_file());
            Ok::<_, std::io::Error>(temp.into_parts())
        })
        .await
        .map_err(|e| TaskError::new(e.to_string()))?
        .map_err(|e| write_error(parent, e))?;

        let mut file = tokio::fs::File::from_std(std_file);
        let mut written = 0u64;
        while let Some(chunk) = payload.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| write_error(&temp_path, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| write_error(&temp_path, e))?;
        file.sync_all().await.map_err(|e| write_error(&temp_path, e))?;
        drop(file);

        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || temp_path.persist(&target))
            .await
            .map_err(|e| TaskError::new(e.to_string()))?
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "rename {} to {}: {}",
                    e.path.display(),
                    path.display(),
                    e.error
                )))
            })?;
        Ok(written)
    }
}

#[async_trait::async_trait]
impl Storage for LocalStorage {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    async fn setup(&self) -> CheeseshopResult<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                self.root.display(),
                e
            )))
        })?;

        tracing::info!(path = %self.root.display(), "Local storage ready");
        Ok(())
    }

    #[tracing::instrument(skip(self, payload), fields(backend = %self.name, size = payload.size()))]
    async fn put(&self, object_id: &str, payload: BytesPayload) -> CheeseshopResult<()> {
        let path = self.path_for(object_id);
        let parent = path.parent().ok_or_else(|| {
            StorageError::new(StorageErrorKind::InvalidPath(path.display().to_string()))
        })?;

        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;

        let written = self.write_object(&path, payload).await?;

        tracing::info!(
            object_id,
            path = %path.display(),
            size = written,
            "Stored object"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(backend = %self.name))]
    async fn get(&self, object_id: &str) -> CheeseshopResult<BytesPayload> {
        let path = self.path_for(object_id);

        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(object_id.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        let std_file = file.into_std().await;
        let (std_file, size) = tokio::task::spawn_blocking(move || {
            os::advise_sequential(&std_file);
            let size = std_file.metadata().map(|m| m.len());
            (std_file, size)
        })
        .await
        .map_err(|e| TaskError::new(e.to_string()))?;
        let size = size.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", path.display(), e)))
        })?;

        tracing::debug!(object_id, path = %path.display(), size, "Opened object");
        Ok(BytesPayload::from_file(
            tokio::fs::File::from_std(std_file),
            size,
            self.chunk_size,
        ))
    }

    async fn exists(&self, object_id: &str) -> CheeseshopResult<bool> {
        let path = self.path_for(object_id);
        tokio::fs::try_exists(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", path.display(), e)))
                .into()
        })
    }
}

fn write_error(path: &Path, err: std::io::Error) -> CheeseshopError {
    StorageError::new(StorageErrorKind::FileWrite(format!("{}: {}", path.display(), err))).into()
}
