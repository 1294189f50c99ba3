//! A queue is a logically infinite, strictly ordered message sequence.
//!
//! Pushes land in the hot tier (the `messages` table). The flush packer
//! groups hot rows into contiguous cold blocks under the queue's size bound
//! and records each block in the index; rehydration reads a block back into
//! the hot tier when a subscriber asks for history.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    backing::BlobStore,
    envelope::{self, EtlStage, QueueStage},
    error::{BrokerError, Result},
    repository, retry,
};
use queue_broker_entity::{messages, queues};

pub struct Queue {
    id: i64,
    name: String,
    db: DatabaseConnection,
    backing: Arc<dyn BlobStore>,
    // flush must not run concurrently with itself for the same queue
    flush_lock: Mutex<()>,
}

/// One packed block: a contiguous index range over the hot rows being
/// flushed. The tail is the final block when it fits under the size bound.
#[derive(Debug, PartialEq, Eq)]
struct PackedBlock {
    start: usize,
    end: usize,
    is_tail: bool,
}

impl Queue {
    pub(crate) fn new(
        db: DatabaseConnection,
        backing: Arc<dyn BlobStore>,
        model: queues::Model,
    ) -> Self {
        Self {
            id: model.id,
            name: model.name,
            db,
            backing,
            flush_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a message to the queue and returns its serial. The message
    /// must be a JSON object; the broker stamps it with a provenance stage
    /// naming this queue before storing it.
    pub async fn push(&self, message: Value) -> Result<i64> {
        retry::with_transient_retries(|| {
            let message = message.clone();
            async move { self.push_once(message).await }
        })
        .await
    }

    async fn push_once(&self, mut message: Value) -> Result<i64> {
        let txn = self.db.begin().await?;
        let serial = repository::queues::allocate_serial(&txn, self.id).await?;
        let now = Utc::now().timestamp();
        let path = envelope::format_path(now)?;
        let key = self.block_key(&path, serial);
        envelope::append_stage(
            &mut message,
            EtlStage {
                queue: QueueStage {
                    url: self.backing.url(&key),
                    timestamp: now,
                    date_time: envelope::format_date_time(now)?,
                    serial,
                },
            },
        )?;
        let content = serde_json::to_string(&message)?;
        repository::messages::insert(&txn, self.id, serial, &content).await?;
        txn.commit().await?;
        tracing::debug!(queue = %self.name, serial, "pushed message");
        Ok(serial)
    }

    /// Drains the hot tier into cold blocks, including the under-sized tail.
    pub async fn flush(&self) -> Result<()> {
        self.flush_blocks(true).await
    }

    /// Packs hot rows from `block_start` on into contiguous cold blocks.
    /// Without `force_tail` the final under-sized block stays hot so
    /// producers can keep appending to it.
    ///
    /// Partial progress is legal: blocks committed before a backing-store
    /// error stay durable, and `block_write` is only touched once the whole
    /// pass succeeds, so the next sweep retries the remainder.
    pub(crate) async fn flush_blocks(&self, force_tail: bool) -> Result<()> {
        let _guard = self.flush_lock.lock().await;

        let queue = repository::queues::find_by_id(&self.db, self.id)
            .await?
            .ok_or_else(|| BrokerError::UnknownQueue(self.name.clone()))?;
        let rows =
            repository::messages::hot_from(&self.db, self.id, queue.block_start).await?;

        for block in pack_blocks(&rows, queue.block_size_bytes) {
            if block.is_tail && !force_tail {
                break;
            }
            let lines: Vec<String> = rows[block.start..block.end]
                .iter()
                .map(|row| row.content.clone())
                .collect();
            // the envelope timestamps are authoritative for partitioning
            let first = envelope::last_stage(&lines[0])?;
            let last = envelope::last_stage(&lines[lines.len() - 1])?;
            let path = envelope::format_path(first.timestamp)?;
            let key = self.block_key(&path, first.serial);

            tracing::info!(queue = %self.name, key = %key, lines = lines.len(), "flushing block");
            self.backing
                .write_lines(&key, &lines)
                .await
                .map_err(BrokerError::Backing)?;

            let txn = self.db.begin().await?;
            repository::queues::advance_blocks(
                &txn,
                self.id,
                last.serial + 1,
                (!block.is_tail).then_some(last.serial + 1),
            )
            .await?;
            repository::blocks::upsert(
                &txn,
                self.id,
                first.serial,
                &path,
                Utc::now().timestamp(),
            )
            .await?;
            txn.commit().await?;
        }

        repository::queues::touch_block_write(&self.db, self.id, Utc::now().timestamp()).await?;
        Ok(())
    }

    /// Rehydrates the cold block starting at `first_serial` into the hot
    /// tier. Idempotent: rows that are still hot are left untouched.
    pub async fn load(&self, path: &str, first_serial: i64) -> Result<()> {
        let txn = self.db.begin().await?;
        self.load_into(&txn, path, first_serial).await?;
        txn.commit().await?;
        Ok(())
    }

    pub(crate) async fn load_into<C: ConnectionTrait>(
        &self,
        conn: &C,
        path: &str,
        first_serial: i64,
    ) -> Result<()> {
        let key = self.block_key(path, first_serial);
        let lines = self
            .backing
            .read_lines(&key)
            .await
            .map_err(BrokerError::Backing)?;
        tracing::info!(queue = %self.name, key = %key, lines = lines.len(), "rehydrating block");
        for line in &lines {
            let stage = envelope::last_stage(line)?;
            repository::messages::insert_ignore(conn, self.id, stage.serial, line).await?;
        }
        repository::blocks::touch_last_used(conn, self.id, first_serial, Utc::now().timestamp())
            .await?;
        Ok(())
    }

    fn block_key(&self, path: &str, serial: i64) -> String {
        format!("{}/{}/{}", self.name, path, serial)
    }
}

/// Greedy grouping of hot rows into contiguous blocks under the size bound.
/// A row's footprint is its content length plus the line terminator. The
/// final block is the tail when it fits under the bound; a zero bound
/// therefore produces one-row full blocks.
fn pack_blocks(rows: &[messages::Model], block_size_bytes: i64) -> Vec<PackedBlock> {
    let mut blocks = Vec::new();
    let mut start = 0usize;
    let mut size = 0i64;
    for (index, row) in rows.iter().enumerate() {
        let line_size = row.content.len() as i64 + 1;
        if index > start && size + line_size > block_size_bytes {
            blocks.push(PackedBlock {
                start,
                end: index,
                is_tail: false,
            });
            start = index;
            size = 0;
        }
        size += line_size;
    }
    if start < rows.len() {
        blocks.push(PackedBlock {
            start,
            end: rows.len(),
            is_tail: size <= block_size_bytes,
        });
    }
    blocks
}
