use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::tests::{hot_serials, init_broker, queue_row, read_block};

#[tokio::test]
async fn push_pop_confirm_flush() {
    let t = init_broker("push_pop_confirm_flush").await;
    let queue = t.broker.get_or_create_queue("test1", None).await.unwrap();

    let serial = queue.push(json!({"a": 1, "b": 2})).await.unwrap();
    assert_eq!(serial, 1);

    let listener = t.broker.get_subscriber("test1").await.unwrap();
    let (serial, content) = listener.pop().await.unwrap().expect("message available");
    assert_eq!(serial, 1);
    assert_eq!(content["a"], json!(1));
    assert_eq!(content["b"], json!(2));

    // the broker appended exactly one provenance stage
    let stages = content["etl"].as_array().unwrap();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0]["queue"]["serial"], json!(1));
    let url = stages[0]["queue"]["url"].as_str().unwrap();
    assert!(url.starts_with("file://"));
    assert!(url.ends_with("/1.json"));

    listener.confirm(serial).await.unwrap();
    queue.flush().await.unwrap();

    let today = Utc::now().format("%Y/%m/%d");
    let lines = read_block(&t.backing_dir, &format!("test1/{today}/1"));
    assert_eq!(lines.len(), 1);
    // the flushed line is the stored message, verbatim
    assert_eq!(lines[0], content);

    t.broker.close().await.unwrap();
}

#[tokio::test]
async fn serials_are_assigned_in_order() {
    let t = init_broker("serials_in_order").await;
    let queue = t.broker.get_or_create_queue("ordered", None).await.unwrap();

    for expected in 1..=5 {
        let serial = queue.push(json!({"n": expected})).await.unwrap();
        assert_eq!(serial, expected);
    }

    let row = queue_row(&t.db, queue.id()).await;
    assert_eq!(row.next_serial, 6);
    assert!(row.block_start <= row.block_end && row.block_end <= row.next_serial);
    assert_eq!(hot_serials(&t.db, queue.id()).await, vec![1, 2, 3, 4, 5]);

    // deliveries come back in serial order on first delivery
    let listener = t.broker.get_subscriber("ordered").await.unwrap();
    for expected in 1..=5 {
        let (serial, content) = listener.pop().await.unwrap().expect("message available");
        assert_eq!(serial, expected);
        assert_eq!(content["n"], json!(expected));
    }
    assert!(listener.pop().await.unwrap().is_none());
}

#[tokio::test]
async fn flush_splits_hot_rows_into_sized_blocks() {
    let t = init_broker("flush_splits_blocks").await;
    // zero block size: every row becomes its own full block
    let queue = t
        .broker
        .get_or_create_queue("tiny_blocks", Some(0))
        .await
        .unwrap();

    for n in 1..=3 {
        queue.push(json!({"n": n})).await.unwrap();
    }
    queue.flush().await.unwrap();

    let today = Utc::now().format("%Y/%m/%d");
    for serial in 1..=3 {
        let lines = read_block(&t.backing_dir, &format!("tiny_blocks/{today}/{serial}"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["n"], json!(serial));
    }

    let row = queue_row(&t.db, queue.id()).await;
    assert_eq!(row.block_start, 4);
    assert_eq!(row.block_end, 4);
}
