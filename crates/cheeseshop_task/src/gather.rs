//! Fail-fast concurrent gather.

use cheeseshop_error::{CheeseshopResult, TaskError};
use std::future::Future;
use tokio::task::{JoinError, JoinSet};

/// Run every future on its own task and collect the results in input order.
///
/// The first failure aborts the remaining tasks, waits until each of them has
/// settled, then is returned. A panicking task surfaces as a task error.
/// Dropping the returned future aborts every task still running.
///
/// # Examples
///
/// ```
/// use cheeseshop_task::strict_gather;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cheeseshop_error::CheeseshopResult<()> {
/// let doubled = strict_gather((1..=3).map(|n| async move { Ok(n * 2) })).await?;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(skip_all)]
pub async fn strict_gather<I, F, T>(futures: I) -> CheeseshopResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = CheeseshopResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    let mut count = 0;
    for (index, future) in futures.into_iter().enumerate() {
        set.spawn(async move { future.await.map(|value| (index, value)) });
        count += 1;
    }

    let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();

    while let Some(joined) = set.join_next().await {
        let failure = match joined {
            Ok(Ok((index, value))) => {
                results[index] = Some(value);
                continue;
            }
            Ok(Err(err)) => err,
            Err(join_err) => join_failure(join_err).into(),
        };

        tracing::debug!(pending = set.len(), "Gather failed, cancelling remaining tasks");
        set.abort_all();
        while set.join_next().await.is_some() {}
        return Err(failure);
    }

    Ok(results.into_iter().flatten().collect())
}

pub(crate) fn join_failure(err: JoinError) -> TaskError {
    if err.is_panic() {
        TaskError::new(format!("Task panicked: {}", err))
    } else {
        TaskError::new(format!("Task cancelled: {}", err))
    }
}
