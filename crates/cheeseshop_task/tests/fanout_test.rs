use cheeseshop_error::{CheeseshopResult, HttpError};
use cheeseshop_task::{KeyedLocks, fanout};
use futures::stream;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

async fn drain(mut receiver: mpsc::Receiver<CheeseshopResult<u32>>) -> Vec<CheeseshopResult<u32>> {
    let mut items = Vec::new();
    while let Some(item) = receiver.recv().await {
        items.push(item);
    }
    items
}

#[tokio::test]
async fn every_sink_sees_every_item() {
    let mut senders = Vec::new();
    let mut readers = Vec::new();
    for _ in 0..3 {
        let (sender, receiver) = mpsc::channel(2);
        senders.push(sender);
        readers.push(tokio::spawn(drain(receiver)));
    }

    fanout(stream::iter((0..10).map(Ok)), senders).await.unwrap();

    for reader in readers {
        let items: Vec<u32> = reader.await.unwrap().into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(items, (0..10).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn closed_sink_is_dropped() {
    let (open_tx, open_rx) = mpsc::channel(1);
    let (closed_tx, closed_rx) = mpsc::channel(1);
    drop(closed_rx);

    let reader = tokio::spawn(drain(open_rx));
    fanout(stream::iter((0..5).map(Ok)), vec![closed_tx, open_tx])
        .await
        .unwrap();

    assert_eq!(reader.await.unwrap().len(), 5);
}

#[tokio::test]
async fn stops_reading_when_no_sink_remains() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let source = stream::iter(0..1000).map(move |i| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(i)
    });

    let (sender, receiver) = mpsc::channel(1);
    drop(receiver);
    fanout(source, vec![sender]).await.unwrap();

    assert!(pulled.load(Ordering::SeqCst) <= 1);
}

#[tokio::test]
async fn source_error_reaches_every_sink() {
    let (a_tx, a_rx) = mpsc::channel(4);
    let (b_tx, b_rx) = mpsc::channel(4);
    let source = stream::iter(vec![Ok(1), Err(HttpError::new("truncated").into()), Ok(2)]);

    assert!(fanout(source, vec![a_tx, b_tx]).await.is_err());

    for items in [drain(a_rx).await, drain(b_rx).await] {
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}

#[tokio::test]
async fn keyed_locks_serialize_same_key() {
    let locks = Arc::new(KeyedLocks::new());
    let active = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let (locks, active, overlaps) = (locks.clone(), active.clone(), overlaps.clone());
        handles.push(tokio::spawn(async move {
            let _guard = locks.lock("pkg-1.0.tar.gz".to_string()).await;
            if active.fetch_add(1, Ordering::SeqCst) > 0 {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            active.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert!(locks.is_empty());
}

#[tokio::test]
async fn keyed_locks_do_not_block_other_keys() {
    let locks = KeyedLocks::new();
    let _first = locks.lock("a".to_string()).await;
    let second = tokio::time::timeout(Duration::from_millis(100), locks.lock("b".to_string())).await;
    assert!(second.is_ok());
}
