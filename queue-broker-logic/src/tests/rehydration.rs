use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::tests::{hot_serials, init_broker, read_block};
use queue_broker_entity::blocks;
use sea_orm::EntityTrait;

#[tokio::test]
async fn history_is_rehydrated_from_cold_blocks() {
    let t = init_broker("rehydration").await;
    let queue = t.broker.get_or_create_queue("test5", Some(0)).await.unwrap();
    t.broker
        .get_subscriber("test5")
        .await
        .unwrap()
        .set_look_ahead(0)
        .await
        .unwrap();
    queue.push(json!({"n": 1})).await.unwrap();
    queue.push(json!({"n": 2})).await.unwrap();

    let drainer = t.broker.replay("test5", 0, 1, 0).await.unwrap();
    for expected in 1..=2 {
        let (serial, _) = drainer.pop().await.unwrap().unwrap();
        assert_eq!(serial, expected);
        drainer.confirm(serial).await.unwrap();
    }

    queue.flush().await.unwrap();
    t.broker.sweep_once().await.unwrap();
    assert_eq!(hot_serials(&t.db, queue.id()).await, Vec::<i64>::new());

    // both one-row blocks are on cold storage and indexed
    let today = Utc::now().format("%Y/%m/%d");
    assert_eq!(
        read_block(&t.backing_dir, &format!("test5/{today}/1")).len(),
        1
    );
    let indexed = blocks::Entity::find().all(&t.db).await.unwrap();
    assert_eq!(indexed.len(), 2);

    // a fresh replayer reads the drained history back from cold
    let reader = t.broker.replay("test5", 0, 1, 0).await.unwrap();
    let (serial, content) = reader.pop().await.unwrap().expect("rehydrated message");
    assert_eq!(serial, 1);
    assert_eq!(content["n"], json!(1));
    assert_eq!(content["etl"][0]["queue"]["serial"], json!(1));
    reader.confirm(serial).await.unwrap();

    let (serial, content) = reader.pop().await.unwrap().expect("rehydrated message");
    assert_eq!(serial, 2);
    assert_eq!(content["n"], json!(2));
    reader.confirm(serial).await.unwrap();

    // once the reader is done the rehydrated rows are reclaimed again
    queue.flush().await.unwrap();
    t.broker.sweep_once().await.unwrap();
    assert_eq!(hot_serials(&t.db, queue.id()).await, Vec::<i64>::new());
}

#[tokio::test]
async fn explicit_load_is_idempotent() {
    let t = init_broker("load_idempotent").await;
    let queue = t.broker.get_or_create_queue("reload", Some(0)).await.unwrap();
    queue.push(json!({"n": 1})).await.unwrap();
    queue.flush().await.unwrap();

    let path = Utc::now().format("%Y/%m/%d").to_string();
    // the row is still hot; loading the block over it must not fail
    queue.load(&path, 1).await.unwrap();
    queue.load(&path, 1).await.unwrap();
    assert_eq!(hot_serials(&t.db, queue.id()).await, vec![1]);
}
