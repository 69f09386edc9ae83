//! Merge several streams into one.

use crate::gather::join_failure;
use cheeseshop_error::CheeseshopResult;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Consumer side of [`join`].
///
/// Yields items from every source in arrival order. Ends once every source
/// is exhausted. If a source fails, the others are cancelled and the failure
/// is the last item. Dropping the stream cancels the sources;
/// [`JoinedStream::cancel`] also waits until they have stopped.
pub struct JoinedStream<T> {
    receiver: mpsc::Receiver<CheeseshopResult<T>>,
    token: CancellationToken,
    supervisor: Option<JoinHandle<()>>,
}

impl<T> JoinedStream<T> {
    /// Stop every source and wait for their tasks to finish.
    pub async fn cancel(mut self) {
        self.token.cancel();
        self.receiver.close();
        if let Some(supervisor) = self.supervisor.take() {
            let _ = supervisor.await;
        }
    }
}

impl<T> Stream for JoinedStream<T> {
    type Item = CheeseshopResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> Drop for JoinedStream<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Pump every source into one bounded channel of `buffer` items.
///
/// One feeder task per source, plus a supervisor that closes the channel
/// when all feeders are done. Must be called inside a tokio runtime.
///
/// # Examples
///
/// ```
/// use cheeseshop_task::join;
/// use futures::{StreamExt, stream};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let local = stream::iter(vec![Ok(1), Ok(2)]);
/// let remote = stream::iter(vec![Ok(3)]);
/// let mut merged: Vec<i32> = join(vec![local, remote], 4)
///     .map(|item| item.unwrap())
///     .collect()
///     .await;
/// merged.sort();
/// assert_eq!(merged, vec![1, 2, 3]);
/// # }
/// ```
pub fn join<T, S>(sources: Vec<S>, buffer: usize) -> JoinedStream<T>
where
    S: Stream<Item = CheeseshopResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    let token = CancellationToken::new();

    let mut feeders = JoinSet::new();
    for source in sources {
        let sender = sender.clone();
        feeders.spawn(feed(source, sender));
    }

    let supervisor = tokio::spawn(supervise(feeders, sender, token.clone()));

    JoinedStream {
        receiver,
        token,
        supervisor: Some(supervisor),
    }
}

async fn feed<T, S>(source: S, sender: mpsc::Sender<CheeseshopResult<T>>) -> CheeseshopResult<()>
where
    S: Stream<Item = CheeseshopResult<T>>,
{
    let mut source = std::pin::pin!(source);
    while let Some(item) = source.next().await {
        let value = item?;
        if sender.send(Ok(value)).await.is_err() {
            // Consumer went away
            return Ok(());
        }
    }
    Ok(())
}

async fn supervise<T>(
    mut feeders: JoinSet<CheeseshopResult<()>>,
    sender: mpsc::Sender<CheeseshopResult<T>>,
    token: CancellationToken,
) {
    loop {
        let joined = tokio::select! {
            _ = token.cancelled() => {
                feeders.abort_all();
                while feeders.join_next().await.is_some() {}
                tracing::debug!("Joined stream cancelled");
                return;
            }
            joined = feeders.join_next() => joined,
        };

        let failure = match joined {
            None => return,
            Some(Ok(Ok(()))) => continue,
            Some(Ok(Err(err))) => err,
            Some(Err(join_err)) if join_err.is_cancelled() => continue,
            Some(Err(join_err)) => join_failure(join_err).into(),
        };

        tracing::warn!(error = %failure, "Joined source failed, cancelling siblings");
        feeders.abort_all();
        while feeders.join_next().await.is_some() {}
        let _ = sender.send(Err(failure)).await;
        return;
    }
}
