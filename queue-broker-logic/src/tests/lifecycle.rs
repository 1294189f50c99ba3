use pretty_assertions::assert_eq;
use serde_json::json;

use crate::tests::{hot_serials, init_broker, queue_row};

#[tokio::test]
async fn reclamation_respects_window_and_outstanding_deliveries() {
    let t = init_broker("lifecycle_window").await;
    let queue = t.broker.get_or_create_queue("test3", Some(0)).await.unwrap();
    queue.push(json!({"n": 1})).await.unwrap();

    queue.flush().await.unwrap();
    t.broker.sweep_once().await.unwrap();
    // flushed to cold, but the default look-ahead window still covers it
    assert_eq!(hot_serials(&t.db, queue.id()).await, vec![1]);

    let listener = t.broker.get_subscriber("test3").await.unwrap();
    listener.set_look_ahead(0).await.unwrap();
    let (serial, _) = listener.pop().await.unwrap().expect("message available");
    assert_eq!(serial, 1);

    queue.flush().await.unwrap();
    t.broker.sweep_once().await.unwrap();
    // outstanding delivery pins the row
    assert_eq!(hot_serials(&t.db, queue.id()).await, vec![1]);

    listener.confirm(serial).await.unwrap();
    queue.flush().await.unwrap();
    t.broker.sweep_once().await.unwrap();
    // confirmed, flushed and outside every window: reclaimed
    assert_eq!(hot_serials(&t.db, queue.id()).await, Vec::<i64>::new());

    let row = queue_row(&t.db, queue.id()).await;
    assert!(row.block_start <= row.block_end && row.block_end <= row.next_serial);
}

#[tokio::test]
async fn retention_is_shared_between_subscribers() {
    let t = init_broker("lifecycle_shared").await;
    let queue = t.broker.get_or_create_queue("test4", Some(0)).await.unwrap();
    t.broker
        .get_subscriber("test4")
        .await
        .unwrap()
        .set_look_ahead(0)
        .await
        .unwrap();
    queue.push(json!({"n": 1})).await.unwrap();
    queue.push(json!({"n": 2})).await.unwrap();

    let fast = t.broker.replay("test4", 0, 1, 0).await.unwrap();
    for expected in 1..=2 {
        let (serial, _) = fast.pop().await.unwrap().unwrap();
        assert_eq!(serial, expected);
        fast.confirm(serial).await.unwrap();
    }

    let slow = t.broker.replay("test4", 0, 1, 0).await.unwrap();
    let (serial, _) = slow.pop().await.unwrap().unwrap();
    slow.confirm(serial).await.unwrap();
    let (serial, _) = slow.pop().await.unwrap().unwrap();
    assert_eq!(serial, 2);
    // serial 2 stays outstanding for the slow replayer

    queue.flush().await.unwrap();
    t.broker.sweep_once().await.unwrap();

    // serial 1 is confirmed everywhere and goes; serial 2 is still needed
    assert_eq!(hot_serials(&t.db, queue.id()).await, vec![2]);
}

#[tokio::test]
async fn unflushed_rows_are_never_reclaimed() {
    let t = init_broker("lifecycle_unflushed").await;
    let queue = t.broker.get_or_create_queue("unflushed", Some(0)).await.unwrap();
    t.broker
        .get_subscriber("unflushed")
        .await
        .unwrap()
        .set_look_ahead(0)
        .await
        .unwrap();
    queue.push(json!({"n": 1})).await.unwrap();

    // no flush: block_start has not advanced, so the sweep must retain the
    // row even though no subscriber references it
    t.broker.sweep_once().await.unwrap();
    assert_eq!(hot_serials(&t.db, queue.id()).await, vec![1]);
}
