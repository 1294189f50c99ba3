pub mod concurrency;
pub mod lifecycle;
pub mod push_pop;
pub mod rehydration;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde_json::Value;
use tempfile::TempDir;

use crate::{
    backing::{BlobStore, DirectoryBacking},
    broker::Broker,
    settings::BrokerSettings,
};
use queue_broker_entity::{messages, queues, subscribers};

pub struct TestBroker {
    pub broker: Broker,
    pub db: DatabaseConnection,
    pub backing_dir: PathBuf,
    _scratch: TempDir,
}

/// Broker over a throwaway SQLite database and directory backing. The sweep
/// interval is long enough that tests drive `sweep_once` themselves.
pub async fn init_broker(test_name: &str) -> TestBroker {
    let scratch = tempfile::Builder::new()
        .prefix(test_name)
        .tempdir()
        .expect("cannot create scratch directory");
    let db_path = scratch.path().join("broker.db");
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", db_path.display()));
    // a single connection serialises concurrent writers
    options.max_connections(1);
    let db = Database::connect(options).await.expect("cannot open database");
    Migrator::up(&db, None).await.expect("migrations failed");

    let backing_dir = scratch.path().join("backing");
    let backing: Arc<dyn BlobStore> = Arc::new(DirectoryBacking::new(&backing_dir));
    let broker = Broker::start(
        db.clone(),
        backing,
        BrokerSettings {
            sweep_interval: Duration::from_secs(3600),
            ..Default::default()
        },
    );

    TestBroker {
        broker,
        db,
        backing_dir,
        _scratch: scratch,
    }
}

/// Parses a block file written by the directory backing.
pub fn read_block(backing_dir: &Path, key: &str) -> Vec<Value> {
    let path = backing_dir.join(format!("{key}.json"));
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("missing block file {}", path.display()));
    content
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).expect("block line is not valid json"))
        .collect()
}

/// Serials currently present in the hot tier for a queue.
pub async fn hot_serials(db: &DatabaseConnection, queue: i64) -> Vec<i64> {
    messages::Entity::find()
        .filter(messages::Column::Queue.eq(queue))
        .order_by_asc(messages::Column::Serial)
        .all(db)
        .await
        .expect("cannot list hot rows")
        .into_iter()
        .map(|row| row.serial)
        .collect()
}

pub async fn queue_row(db: &DatabaseConnection, id: i64) -> queues::Model {
    queues::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("cannot read queue row")
        .expect("queue row is missing")
}

pub async fn subscriber_row(db: &DatabaseConnection, id: i64) -> subscribers::Model {
    subscribers::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("cannot read subscriber row")
        .expect("subscriber row is missing")
}
