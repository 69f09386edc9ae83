//! Invalidation on `SIGUSR1` / `SIGUSR2`.

use crate::AsyncCache;
use cheeseshop_error::{CacheError, CheeseshopResult};
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

/// Clear `cache` whenever the process receives `SIGUSR1` or `SIGUSR2`.
///
/// The returned task runs until aborted.
pub fn spawn_signal_invalidation(cache: AsyncCache) -> CheeseshopResult<JoinHandle<()>> {
    let mut usr1 = signal(SignalKind::user_defined1())
        .map_err(|e| CacheError::new(format!("SIGUSR1 handler: {}", e)))?;
    let mut usr2 = signal(SignalKind::user_defined2())
        .map_err(|e| CacheError::new(format!("SIGUSR2 handler: {}", e)))?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                received = usr1.recv() => received.map(|_| "SIGUSR1"),
                received = usr2.recv() => received.map(|_| "SIGUSR2"),
            };
            let Some(name) = name else {
                break;
            };

            tracing::warn!(signal = name, "Invalidating caches");
            if let Err(err) = cache.invalidate_all().await {
                tracing::error!(error = %err, "Cache invalidation failed");
            }
        }
    }))
}
