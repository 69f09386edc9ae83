//! File download through the mirror.

use cheeseshop::Cheeseshop;
use cheeseshop_error::{CheeseshopResult, StorageError, StorageErrorKind};
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Stream one release file into `output`.
///
/// A partially written file is removed when the transfer fails.
pub async fn handle_fetch(
    shop: &Cheeseshop,
    name: &str,
    version: &str,
    filename: &str,
    output: &Path,
) -> CheeseshopResult<()> {
    let payload = shop.fetch(name, version, filename).await?;
    let size = payload.size();

    let result = write_payload(payload, output).await;
    if result.is_err()
        && let Err(e) = tokio::fs::remove_file(output).await
    {
        warn!(path = %output.display(), error = %e, "Failed to remove partial download");
    }
    result?;

    info!(path = %output.display(), size, "Fetched {}", filename);
    Ok(())
}

async fn write_payload(
    mut payload: cheeseshop_storage::BytesPayload,
    output: &Path,
) -> CheeseshopResult<()> {
    let write_error = |e: std::io::Error| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            output.display(),
            e
        )))
    };

    let mut file = tokio::fs::File::create(output).await.map_err(write_error)?;
    while let Some(chunk) = payload.next().await {
        file.write_all(&chunk?).await.map_err(write_error)?;
    }
    file.flush().await.map_err(write_error)?;
    Ok(())
}
