//! The broker owns the database, the backing store and the registry of
//! live queues, and runs the background flush/reclamation sweeper.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use futures::future::join_all;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    backing::BlobStore,
    error::{BrokerError, Result},
    identity,
    queue::Queue,
    repository,
    settings::BrokerSettings,
    subscription::Subscription,
    sweeper,
};
use queue_broker_entity::{queues, subscribers};

pub struct Broker {
    inner: Arc<BrokerInner>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct BrokerInner {
    pub(crate) db: DatabaseConnection,
    pub(crate) backing: Arc<dyn BlobStore>,
    pub(crate) settings: BrokerSettings,
    // lazily rebuilt cache over the queues table, keyed by name
    pub(crate) queues: Mutex<HashMap<String, Arc<Queue>>>,
    pub(crate) shutdown: CancellationToken,
}

impl BrokerInner {
    /// Registry handle for a queue row found in the database, creating and
    /// caching the handle when this is the first reference to the name.
    pub(crate) async fn queue_handle_from_model(&self, model: queues::Model) -> Arc<Queue> {
        let mut registry = self.queues.lock().await;
        registry
            .entry(model.name.clone())
            .or_insert_with(|| Arc::new(Queue::new(self.db.clone(), self.backing.clone(), model)))
            .clone()
    }
}

impl Broker {
    /// Builds the broker over an initialised database and starts the
    /// background sweeper.
    pub fn start(
        db: DatabaseConnection,
        backing: Arc<dyn BlobStore>,
        settings: BrokerSettings,
    ) -> Self {
        let inner = Arc::new(BrokerInner {
            db,
            backing,
            settings,
            queues: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        });
        let handle = tokio::spawn(sweeper::run(inner.clone()));
        Self {
            inner,
            sweeper: Mutex::new(Some(handle)),
        }
    }

    /// Looks a queue up by name, creating it (along with its default
    /// subscriber) on first use. An existing queue keeps its stored block
    /// size; `block_size_mb` only applies at creation.
    pub async fn get_or_create_queue(
        &self,
        name: &str,
        block_size_mb: Option<i64>,
    ) -> Result<Arc<Queue>> {
        let mut registry = self.inner.queues.lock().await;
        if let Some(queue) = registry.get(name) {
            return Ok(queue.clone());
        }

        let txn = self.inner.db.begin().await?;
        let model = match repository::queues::find_by_name(&txn, name).await? {
            Some(model) => {
                txn.commit().await?;
                model
            }
            None => {
                let now = Utc::now().timestamp();
                let id = identity::next_id(&txn).await?;
                let model = queues::Model {
                    id,
                    name: name.to_string(),
                    next_serial: 1,
                    block_size_bytes: block_size_mb.unwrap_or(self.inner.settings.block_size_mb)
                        * 1024
                        * 1024,
                    block_start: 1,
                    block_end: 1,
                    block_write: now,
                };
                repository::queues::insert(&txn, model.clone()).await?;

                let defaults = &self.inner.settings.subscriber;
                let subscriber_id = identity::next_id(&txn).await?;
                repository::subscribers::insert(
                    &txn,
                    subscribers::Model {
                        id: subscriber_id,
                        queue: id,
                        confirm_delay_seconds: defaults.confirm_delay_seconds,
                        look_ahead_serial: defaults.look_ahead_serial,
                        last_confirmed_serial: 0,
                        next_emit_serial: 1,
                        last_emit_timestamp: now,
                    },
                )
                .await?;
                txn.commit().await?;
                tracing::info!(queue = name, id, subscriber = subscriber_id, "created queue");
                model
            }
        };

        let queue = Arc::new(Queue::new(
            self.inner.db.clone(),
            self.inner.backing.clone(),
            model,
        ));
        registry.insert(name.to_string(), queue.clone());
        Ok(queue)
    }

    /// The default subscriber of an existing queue.
    pub async fn get_subscriber(&self, name: &str) -> Result<Subscription> {
        let queue = self.queue_handle(name).await?;
        let subscriber = repository::subscribers::default_for_queue(&self.inner.db, queue.id())
            .await?
            .ok_or_else(|| {
                BrokerError::InvariantViolated(format!("queue {name:?} has no default subscriber"))
            })?;
        Ok(Subscription::new(
            subscriber.id,
            subscriber.confirm_delay_seconds,
            queue,
            self.inner.db.clone(),
        ))
    }

    /// Registers a fresh subscriber starting at an explicit serial, for
    /// re-reading history.
    pub async fn replay(
        &self,
        name: &str,
        confirm_delay_seconds: i64,
        next_emit_serial: i64,
        look_ahead_serial: i64,
    ) -> Result<Subscription> {
        let queue = self.queue_handle(name).await?;
        let txn = self.inner.db.begin().await?;
        let row = repository::queues::find_by_id(&txn, queue.id())
            .await?
            .ok_or_else(|| BrokerError::UnknownQueue(name.to_string()))?;
        if next_emit_serial < 1 || next_emit_serial > row.next_serial {
            return Err(BrokerError::InvariantViolated(format!(
                "replay start {next_emit_serial} is outside [1, {}]",
                row.next_serial
            )));
        }
        let id = identity::next_id(&txn).await?;
        repository::subscribers::insert(
            &txn,
            subscribers::Model {
                id,
                queue: queue.id(),
                confirm_delay_seconds,
                look_ahead_serial,
                last_confirmed_serial: next_emit_serial - 1,
                next_emit_serial,
                last_emit_timestamp: Utc::now().timestamp(),
            },
        )
        .await?;
        txn.commit().await?;
        tracing::info!(queue = name, subscriber = id, next_emit_serial, "created replay subscriber");
        Ok(Subscription::new(
            id,
            confirm_delay_seconds,
            queue,
            self.inner.db.clone(),
        ))
    }

    pub fn delete_queue(&self, _name: &str) -> Result<()> {
        Err(BrokerError::Unsupported(
            "queues are never deleted; unreachable rows are reclaimed by the sweep",
        ))
    }

    /// One flush + reclamation pass, as the background sweeper would run it.
    pub async fn sweep_once(&self) -> Result<()> {
        sweeper::sweep_once(&self.inner).await
    }

    /// Stops the sweeper, drains every live queue to cold storage and
    /// closes the database.
    pub async fn close(&self) -> Result<()> {
        self.inner.shutdown.cancel();
        if let Some(handle) = self.sweeper.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = ?err, "sweeper task did not shut down cleanly");
            }
        }

        let queues: Vec<Arc<Queue>> = self.inner.queues.lock().await.values().cloned().collect();
        let results = join_all(queues.iter().map(|queue| queue.flush())).await;
        for result in results {
            result?;
        }

        self.inner.db.close_by_ref().await?;
        Ok(())
    }

    async fn queue_handle(&self, name: &str) -> Result<Arc<Queue>> {
        if let Some(queue) = self.inner.queues.lock().await.get(name) {
            return Ok(queue.clone());
        }
        let model = repository::queues::find_by_name(&self.inner.db, name)
            .await?
            .ok_or_else(|| BrokerError::UnknownQueue(name.to_string()))?;
        Ok(self.inner.queue_handle_from_model(model).await)
    }
}
