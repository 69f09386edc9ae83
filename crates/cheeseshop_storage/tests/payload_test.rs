use bytes::Bytes;
use cheeseshop_error::{CheeseshopError, CheeseshopErrorKind};
use cheeseshop_storage::{BytesPayload, Checksum, ChecksumAlgorithm};
use futures::{StreamExt, stream};
use std::io::Write;

fn chunked(size: u64, parts: &[&'static str]) -> BytesPayload {
    let parts: Vec<Result<Bytes, CheeseshopError>> = parts
        .iter()
        .map(|part| Ok(Bytes::from_static(part.as_bytes())))
        .collect();
    BytesPayload::from_stream(size, stream::iter(parts))
}

#[tokio::test]
async fn exact_size_streams_cleanly() {
    let payload = chunked(11, &["hello", " ", "world"]);
    assert_eq!(payload.into_bytes().await.unwrap(), "hello world");
}

#[tokio::test]
async fn short_source_ends_with_size_error() {
    let mut payload = chunked(10, &["abc"]);

    assert_eq!(payload.next().await.unwrap().unwrap(), "abc");
    let err = payload.next().await.unwrap().unwrap_err();
    assert!(matches!(err.kind(), CheeseshopErrorKind::Integrity(_)));
    assert!(payload.next().await.is_none());
}

#[tokio::test]
async fn overrun_is_rejected() {
    let err = chunked(2, &["abc"]).into_bytes().await.unwrap_err();
    assert!(matches!(err.kind(), CheeseshopErrorKind::Integrity(_)));
}

#[tokio::test]
async fn empty_payload_has_no_chunks() {
    let mut payload = BytesPayload::from_bytes(Bytes::new());
    assert_eq!(payload.size(), 0);
    assert!(payload.next().await.is_none());
}

#[tokio::test]
async fn verify_passes_matching_digest() {
    let expected = Checksum::compute(ChecksumAlgorithm::Sha256, b"package bytes");
    let bytes = BytesPayload::from_bytes("package bytes")
        .verify(expected)
        .into_bytes()
        .await
        .unwrap();
    assert_eq!(bytes, "package bytes");
}

#[tokio::test]
async fn verify_fails_on_mismatch() {
    let err = BytesPayload::from_bytes("tampered")
        .verify(Checksum::md5("d41d8cd98f00b204e9800998ecf8427e"))
        .into_bytes()
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), CheeseshopErrorKind::Integrity(_)));
}

#[tokio::test]
async fn file_is_read_in_chunks() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for i in 0..1000 {
        writeln!(file, "Hello {i} times").unwrap();
    }
    file.flush().unwrap();
    let expected = std::fs::read(file.path()).unwrap();

    let mut payload = BytesPayload::from_path_with_chunk_size(file.path(), 4096)
        .await
        .unwrap();
    assert_eq!(payload.size(), expected.len() as u64);

    let mut chunk_count = 0;
    let mut collected = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= 4096);
        collected.extend_from_slice(&chunk);
        chunk_count += 1;
    }

    assert_eq!(collected, expected);
    assert!(chunk_count > 1);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = BytesPayload::from_path(dir.path().join("absent.whl"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
