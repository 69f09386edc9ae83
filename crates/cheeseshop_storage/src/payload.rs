//! Sized, single-pass byte streams.

use crate::{Checksum, ChecksumHasher};
use bytes::{Bytes, BytesMut};
use cheeseshop_error::{
    CheeseshopError, CheeseshopResult, HttpError, IntegrityError, IntegrityErrorKind,
    StorageError, StorageErrorKind, UpstreamError, UpstreamErrorKind,
};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

/// Chunk size used when reading files.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A boxed stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = CheeseshopResult<Bytes>> + Send>>;

/// A byte stream of known total length.
///
/// Chunks arrive in order and can be consumed exactly once. If the source
/// ends before `size` bytes, or keeps going past it, the final item is an
/// integrity error instead of a clean end. Dropping the payload releases
/// whatever file or connection backs it.
pub struct BytesPayload {
    size: u64,
    stream: ByteStream,
    produced: u64,
    done: bool,
}

impl std::fmt::Debug for BytesPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytesPayload")
            .field("size", &self.size)
            .field("produced", &self.produced)
            .finish_non_exhaustive()
    }
}

impl BytesPayload {
    /// Wrap an already boxed stream.
    pub fn new(size: u64, stream: ByteStream) -> Self {
        Self {
            size,
            stream,
            produced: 0,
            done: false,
        }
    }

    /// Wrap any byte stream whose errors convert into Cheeseshop errors.
    pub fn from_stream<S, E>(size: u64, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<CheeseshopError> + 'static,
    {
        Self::new(size, Box::pin(stream.map_err(Into::into)))
    }

    /// A payload over an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        let chunks: Option<CheeseshopResult<Bytes>> = (!bytes.is_empty()).then_some(Ok(bytes));
        Self::new(size, Box::pin(stream::iter(chunks)))
    }

    /// Stream a file in [`DEFAULT_CHUNK_SIZE`] chunks.
    pub async fn from_path(path: impl AsRef<Path>) -> CheeseshopResult<Self> {
        Self::from_path_with_chunk_size(path, DEFAULT_CHUNK_SIZE).await
    }

    /// Stream a file in chunks of `chunk_size` bytes.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn from_path_with_chunk_size(
        path: impl AsRef<Path>,
        chunk_size: usize,
    ) -> CheeseshopResult<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| read_error(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| read_error(path, e))?
            .len();
        Ok(Self::from_file(file, size, chunk_size))
    }

    /// Stream an open file of known size.
    pub fn from_file(file: tokio::fs::File, size: u64, chunk_size: usize) -> Self {
        let chunks = ReaderStream::with_capacity(file, chunk_size.max(1)).map_err(|e| {
            CheeseshopError::from(StorageError::new(StorageErrorKind::FileRead(e.to_string())))
        });
        Self::new(size, Box::pin(chunks))
    }

    /// Stream an HTTP response body.
    ///
    /// The response must carry a `Content-Length`.
    pub fn from_response(response: reqwest::Response) -> CheeseshopResult<Self> {
        let size = response.content_length().ok_or_else(|| {
            UpstreamError::new(UpstreamErrorKind::Protocol(format!(
                "{} sent no Content-Length",
                response.url()
            )))
        })?;
        let chunks = response
            .bytes_stream()
            .map_err(|e| CheeseshopError::from(HttpError::new(e.to_string())));
        Ok(Self::new(size, Box::pin(chunks)))
    }

    /// Payload fed by a channel, as used by the storage fan-out.
    pub fn from_receiver(size: u64, receiver: mpsc::Receiver<CheeseshopResult<Bytes>>) -> Self {
        let chunks = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        });
        Self::new(size, Box::pin(chunks))
    }

    /// Declared total length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Check a digest while the bytes flow.
    ///
    /// The wrapped payload yields the same chunks; if the digest of the whole
    /// stream does not match `expected`, it ends with an integrity error.
    pub fn verify(self, expected: Checksum) -> Self {
        let size = self.size;
        let verified = Verified {
            hasher: Some(ChecksumHasher::new(expected.algorithm())),
            inner: self,
            expected,
        };
        Self::new(size, Box::pin(verified))
    }

    /// Collect the whole payload into memory.
    pub async fn into_bytes(mut self) -> CheeseshopResult<Bytes> {
        let capacity = usize::try_from(self.size).unwrap_or(0);
        let mut buffer = BytesMut::with_capacity(capacity);
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    fn size_mismatch(&self) -> CheeseshopError {
        IntegrityError::new(IntegrityErrorKind::Size {
            expected: self.size,
            actual: self.produced,
        })
        .into()
    }
}

impl Stream for BytesPayload {
    type Item = CheeseshopResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let item = ready!(self.stream.as_mut().poll_next(cx));
        let item = match item {
            Some(Ok(chunk)) => {
                self.produced += chunk.len() as u64;
                if self.produced > self.size {
                    self.done = true;
                    Some(Err(self.size_mismatch()))
                } else {
                    Some(Ok(chunk))
                }
            }
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            None => {
                self.done = true;
                (self.produced != self.size).then(|| Err(self.size_mismatch()))
            }
        };
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done { (0, Some(0)) } else { self.stream.size_hint() }
    }
}

struct Verified {
    inner: BytesPayload,
    hasher: Option<ChecksumHasher>,
    expected: Checksum,
}

impl Stream for Verified {
    type Item = CheeseshopResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(self.inner.poll_next_unpin(cx));
        let item = match item {
            Some(Ok(chunk)) => {
                if let Some(hasher) = self.hasher.as_mut() {
                    hasher.update(&chunk);
                }
                Some(Ok(chunk))
            }
            Some(Err(err)) => {
                self.hasher = None;
                Some(Err(err))
            }
            None => self.hasher.take().and_then(|hasher| {
                let actual = hasher.finish();
                if actual.matches(&self.expected) {
                    None
                } else {
                    tracing::warn!(expected = %self.expected, actual = %actual, "Checksum mismatch");
                    Some(Err(IntegrityError::new(IntegrityErrorKind::Checksum {
                        algorithm: actual.algorithm().to_string(),
                        expected: self.expected.hex().to_string(),
                        actual: actual.hex().to_string(),
                    })
                    .into()))
                }
            }),
        };
        Poll::Ready(item)
    }
}

fn read_error(path: &Path, err: std::io::Error) -> CheeseshopError {
    let kind = if err.kind() == std::io::ErrorKind::NotFound {
        StorageErrorKind::NotFound(path.display().to_string())
    } else {
        StorageErrorKind::FileRead(format!("{}: {}", path.display(), err))
    };
    StorageError::new(kind).into()
}
