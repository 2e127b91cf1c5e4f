//! Transaction tests

use std::time::Duration;

use tokio::time::timeout;

use super::*;

#[tokio::test]
async fn test_ack_success() {
    let (transaction, ack) = Transaction::pending(Batch::quick(["hello"]));
    assert_eq!(transaction.payload().len(), 1);

    assert!(transaction.ack(Ok(())));
    assert_eq!(ack.wait().await, Ok(()));
}

#[tokio::test]
async fn test_ack_error_is_passed_unmodified() {
    let (transaction, ack) = Transaction::pending(Batch::quick(["hello"]));
    transaction.ack(Err(DeliveryError::write("boom")));

    assert_eq!(ack.await, Err(DeliveryError::write("boom")));
}

#[tokio::test]
async fn test_dropped_transaction_resolves_receiver() {
    let (transaction, ack) = Transaction::pending(Batch::quick(["hello"]));
    drop(transaction);

    let result = timeout(Duration::from_millis(100), ack)
        .await
        .expect("dropped transaction must not hang the producer");
    assert_eq!(result, Err(DeliveryError::Dropped));
}

#[tokio::test]
async fn test_ack_after_receiver_gone() {
    let (transaction, ack) = Transaction::pending(Batch::quick(["hello"]));
    drop(ack);

    assert!(!transaction.ack(Ok(())));
}

#[tokio::test]
async fn test_caller_owned_ack_channel() {
    let (ack_tx, mut ack_rx) = ack_channel();
    let transaction = Transaction::new(Batch::quick(["a", "b"]), ack_tx);

    assert!(ack_rx.try_recv().is_none());

    let (payload, ack_tx) = transaction.into_parts();
    assert_eq!(payload.len(), 2);
    assert!(!ack_tx.is_closed());
    ack_tx.send(Ok(()));

    assert_eq!(ack_rx.try_recv(), Some(Ok(())));
}

#[tokio::test]
async fn test_try_recv_after_drop() {
    let (ack_tx, mut ack_rx) = ack_channel();
    drop(ack_tx);
    assert_eq!(ack_rx.try_recv(), Some(Err(DeliveryError::Dropped)));
}

#[tokio::test]
async fn test_transaction_channel_has_single_slot() {
    let (tx, mut rx) = transaction_channel();

    let (first, _ack1) = Transaction::pending(Batch::quick(["1"]));
    let (second, _ack2) = Transaction::pending(Batch::quick(["2"]));

    tx.try_send(first).expect("first slot is free");
    assert!(tx.try_send(second).is_err(), "second send must see backpressure");

    let received = rx.recv().await.unwrap();
    assert_eq!(received.payload().get(0).unwrap().data().as_ref(), b"1");
}

#[tokio::test]
async fn test_sender_closed_notification() {
    let (mut ack_tx, ack_rx) = ack_channel();
    drop(ack_rx);

    timeout(Duration::from_millis(100), ack_tx.closed())
        .await
        .expect("closed() resolves once the receiver is gone");
    assert!(ack_tx.is_closed());
}

#[tokio::test]
async fn test_payload_mut() {
    let (mut transaction, _ack) = Transaction::pending(Batch::quick(["a"]));
    transaction.payload_mut().push("b");
    assert_eq!(transaction.payload().len(), 2);
}
