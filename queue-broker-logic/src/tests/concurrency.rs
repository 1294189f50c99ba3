use serde_json::json;

use crate::tests::init_broker;

const PRODUCERS: usize = 4;
const MESSAGES_PER_PRODUCER: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_observe_gap_free_serials() {
    let t = init_broker("concurrent_producers").await;
    let queue = t.broker.get_or_create_queue("test6", None).await.unwrap();

    let mut tasks = Vec::new();
    for producer in 0..PRODUCERS {
        let queue = queue.clone();
        tasks.push(tokio::spawn(async move {
            let mut serials = Vec::with_capacity(MESSAGES_PER_PRODUCER);
            for n in 0..MESSAGES_PER_PRODUCER {
                let serial = queue
                    .push(json!({"producer": producer, "n": n}))
                    .await
                    .expect("push failed");
                serials.push(serial);
            }
            serials
        }));
    }

    let mut observed = Vec::new();
    for task in tasks {
        let serials = task.await.expect("producer task panicked");
        // each producer alone sees strictly increasing serials
        assert!(serials.windows(2).all(|pair| pair[0] < pair[1]));
        observed.extend(serials);
    }

    observed.sort_unstable();
    let expected: Vec<i64> = (1..=(PRODUCERS * MESSAGES_PER_PRODUCER) as i64).collect();
    assert_eq!(observed, expected);
}
