use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement,
};

use queue_broker_entity::messages::{ActiveModel, Column, Entity, Model};

/// A hot row is unreachable, and therefore reclaimable, when it has been
/// written to cold storage (`serial < block_start`), no outstanding delivery
/// references it, and it sits outside every live subscriber's look-ahead
/// window. Anything ambiguous is retained.
const RECLAIM_UNREACHABLE: &str = r#"
DELETE FROM messages
WHERE (queue, serial) IN (
    SELECT m.queue, m.serial
    FROM messages AS m
    JOIN queues AS q ON q.id = m.queue
    WHERE m.serial < q.block_start
      AND NOT EXISTS (
          SELECT 1
          FROM unconfirmed_deliveries AS u
          JOIN subscribers AS s ON s.id = u.subscriber
          WHERE s.queue = m.queue AND u.serial = m.serial
      )
      AND NOT EXISTS (
          SELECT 1
          FROM subscribers AS s
          WHERE s.queue = m.queue
            AND s.last_confirmed_serial < m.serial
            AND m.serial < s.next_emit_serial + s.look_ahead_serial
      )
)
"#;

pub async fn find<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    serial: i64,
) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id((queue, serial)).one(db).await
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    serial: i64,
    content: &str,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        queue: Set(queue),
        serial: Set(serial),
        content: Set(content.to_string()),
    };
    Entity::insert(active).exec_without_returning(db).await?;
    Ok(())
}

/// Insert that treats an existing `(queue, serial)` row as success; used by
/// rehydration, which may race with itself or re-load rows still hot.
pub async fn insert_ignore<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    serial: i64,
    content: &str,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        queue: Set(queue),
        serial: Set(serial),
        content: Set(content.to_string()),
    };
    Entity::insert(active)
        .on_conflict(
            OnConflict::columns([Column::Queue, Column::Serial])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// All hot rows of a queue from `from_serial` on, in serial order.
pub async fn hot_from<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    from_serial: i64,
) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::Queue.eq(queue))
        .filter(Column::Serial.gte(from_serial))
        .order_by_asc(Column::Serial)
        .all(db)
        .await
}

/// Deletes every unreachable hot row across all queues in one statement.
/// Returns the number of reclaimed rows.
pub async fn reclaim_unreachable<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let result = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            RECLAIM_UNREACHABLE,
        ))
        .await?;
    Ok(result.rows_affected())
}
