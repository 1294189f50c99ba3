use std::{future::Future, time::Duration};

use sea_orm::DbErr;
use tokio::time::sleep;

use crate::error::{BrokerError, Result};

const BACKOFF_MS: [u64; 2] = [20, 100];

/// Re-runs a transactional operation when the database reports a transient
/// conflict. Anything else surfaces immediately.
pub(crate) async fn with_transient_retries<T, F, Fut>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = BACKOFF_MS.iter();
    loop {
        match operation().await {
            Err(BrokerError::Database(err)) if is_transient(&err) => match backoff.next() {
                Some(delay) => {
                    tracing::warn!(error = %err, delay_ms = delay, "transient database conflict, retrying");
                    sleep(Duration::from_millis(*delay)).await;
                }
                None => return Err(BrokerError::Database(err)),
            },
            other => return other,
        }
    }
}

fn is_transient(err: &DbErr) -> bool {
    let text = err.to_string();
    text.contains("database is locked")
        || text.contains("deadlock detected")
        || text.contains("could not serialize access")
}
