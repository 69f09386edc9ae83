//! Copy one stream into several channels.

use cheeseshop_error::CheeseshopResult;
use futures::{Stream, StreamExt, future::join_all};
use tokio::sync::mpsc;

/// Read `source` once and deliver every item to every sink.
///
/// Sends happen concurrently, so the slowest sink sets the pace. A sink whose
/// receiver has closed is dropped; once none remain the source is abandoned.
/// A source error is forwarded to every open sink and returned. Every sink is
/// closed when this returns.
pub async fn fanout<T, S>(
    source: S,
    mut sinks: Vec<mpsc::Sender<CheeseshopResult<T>>>,
) -> CheeseshopResult<()>
where
    S: Stream<Item = CheeseshopResult<T>>,
    T: Clone,
{
    let mut source = std::pin::pin!(source);

    while !sinks.is_empty() {
        let Some(item) = source.next().await else {
            break;
        };

        match item {
            Ok(value) => {
                let sent = join_all(sinks.iter().map(|sink| sink.send(Ok(value.clone())))).await;
                let mut outcomes = sent.into_iter();
                sinks.retain(|_| outcomes.next().is_some_and(|outcome| outcome.is_ok()));
            }
            Err(err) => {
                join_all(sinks.iter().map(|sink| sink.send(Err(err.clone())))).await;
                return Err(err);
            }
        }
    }

    if sinks.is_empty() {
        tracing::debug!("All fan-out sinks closed");
    }
    Ok(())
}
