//! A subscription is a durable delivery cursor over one queue.
//!
//! Delivery is at-least-once: a popped message is retried after the
//! configured delay until it is confirmed. The cursor never skips a serial;
//! history that has been reclaimed from the hot tier is rehydrated from its
//! cold block on demand.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::Value;

use crate::{
    error::{BrokerError, Result},
    queue::Queue,
    repository, retry,
};

pub struct Subscription {
    id: i64,
    confirm_delay_seconds: i64,
    queue: Arc<Queue>,
    db: DatabaseConnection,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("confirm_delay_seconds", &self.confirm_delay_seconds)
            .finish()
    }
}

impl Subscription {
    pub(crate) fn new(
        id: i64,
        confirm_delay_seconds: i64,
        queue: Arc<Queue>,
        db: DatabaseConnection,
    ) -> Self {
        Self {
            id,
            confirm_delay_seconds,
            queue,
            db,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Pops the next deliverable message, parsed. `Ok(None)` means nothing
    /// is available right now. A parse failure surfaces after the delivery
    /// has been recorded, so the serial is still outstanding and will be
    /// resent unless confirmed.
    pub async fn pop(&self) -> Result<Option<(i64, Value)>> {
        match self.pop_text().await? {
            None => Ok(None),
            Some((serial, content)) => Ok(Some((serial, serde_json::from_str(&content)?))),
        }
    }

    /// Pops the next deliverable message as its stored text.
    pub async fn pop_text(&self) -> Result<Option<(i64, String)>> {
        retry::with_transient_retries(|| self.pop_text_once()).await
    }

    async fn pop_text_once(&self) -> Result<Option<(i64, String)>> {
        let now = Utc::now().timestamp();
        let txn = self.db.begin().await?;

        // stale unconfirmed deliveries go out first
        let cutoff = now - self.confirm_delay_seconds;
        if let Some(unconfirmed) =
            repository::unconfirmed::oldest_eligible(&txn, self.id, cutoff).await?
        {
            let message =
                repository::messages::find(&txn, self.queue.id(), unconfirmed.serial)
                    .await?
                    .ok_or_else(|| {
                        BrokerError::InvariantViolated(format!(
                            "unconfirmed serial {} of subscriber {} has no hot row",
                            unconfirmed.serial, self.id
                        ))
                    })?;
            repository::unconfirmed::touch(&txn, self.id, unconfirmed.serial, now).await?;
            repository::subscribers::set_last_emit(&txn, self.id, now).await?;
            txn.commit().await?;
            return Ok(Some((message.serial, message.content)));
        }

        // otherwise advance the cursor into the unread tail
        let subscriber = repository::subscribers::find_by_id(&txn, self.id)
            .await?
            .ok_or(BrokerError::UnknownSubscriber(self.id))?;
        let queue = repository::queues::find_by_id(&txn, self.queue.id())
            .await?
            .ok_or_else(|| BrokerError::UnknownQueue(self.queue.name().to_string()))?;
        if queue.next_serial <= subscriber.next_emit_serial {
            txn.commit().await?;
            return Ok(None);
        }
        let serial = subscriber.next_emit_serial;
        repository::subscribers::advance_emit(&txn, self.id, serial).await?;

        let content = match repository::messages::find(&txn, self.queue.id(), serial).await? {
            Some(message) => message.content,
            None => self.rehydrate(&txn, serial).await?,
        };

        repository::unconfirmed::insert(&txn, self.id, serial, now).await?;
        repository::subscribers::set_last_emit(&txn, self.id, now).await?;
        txn.commit().await?;
        Ok(Some((serial, content)))
    }

    /// The row has been reclaimed to cold storage: locate its block through
    /// the index, load the block back and re-read.
    async fn rehydrate<C>(&self, txn: &C, serial: i64) -> Result<String>
    where
        C: sea_orm::ConnectionTrait,
    {
        let block = repository::blocks::find_covering(txn, self.queue.id(), serial)
            .await?
            .ok_or_else(|| {
                BrokerError::InvariantViolated(format!(
                    "serial {serial} of queue {} is neither hot nor indexed in any cold block",
                    self.queue.name()
                ))
            })?;
        self.queue.load_into(txn, &block.path, block.serial).await?;
        let message = repository::messages::find(txn, self.queue.id(), serial)
            .await?
            .ok_or_else(|| {
                BrokerError::InvariantViolated(format!(
                    "serial {serial} of queue {} is missing from its cold block {}",
                    self.queue.name(),
                    block.serial
                ))
            })?;
        Ok(message.content)
    }

    /// Acknowledges a delivery. Idempotent: confirming an already confirmed
    /// serial leaves the subscriber unchanged.
    pub async fn confirm(&self, serial: i64) -> Result<()> {
        retry::with_transient_retries(|| self.confirm_once(serial)).await
    }

    async fn confirm_once(&self, serial: i64) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::unconfirmed::delete(&txn, self.id, serial).await?;
        // everything below the smallest outstanding serial is acknowledged
        let min_outstanding = repository::unconfirmed::min_serial(&txn, self.id).await?;
        let subscriber = repository::subscribers::find_by_id(&txn, self.id)
            .await?
            .ok_or(BrokerError::UnknownSubscriber(self.id))?;
        let last_confirmed = min_outstanding.unwrap_or(subscriber.next_emit_serial) - 1;
        repository::subscribers::set_last_confirmed(&txn, self.id, last_confirmed).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Adjusts how far beyond the cursor this subscriber pins hot rows.
    pub async fn set_look_ahead(&self, look_ahead_serial: i64) -> Result<()> {
        repository::subscribers::set_look_ahead(&self.db, self.id, look_ahead_serial).await?;
        Ok(())
    }
}
