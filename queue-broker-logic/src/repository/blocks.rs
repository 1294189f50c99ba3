use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};

use queue_broker_entity::blocks::{ActiveModel, Column, Entity, Model};

/// Registers a cold block in the index, touching `last_used` when the block
/// is already indexed.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    serial: i64,
    path: &str,
    now: i64,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        queue: Set(queue),
        serial: Set(serial),
        path: Set(path.to_string()),
        last_used: Set(now),
    };
    Entity::insert(active)
        .on_conflict(
            OnConflict::columns([Column::Queue, Column::Serial])
                .update_columns([Column::Path, Column::LastUsed])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// The block holding `serial`: the indexed block with the greatest first
/// serial not exceeding it.
pub async fn find_covering<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    serial: i64,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::Queue.eq(queue))
        .filter(Column::Serial.lte(serial))
        .order_by_desc(Column::Serial)
        .one(db)
        .await
}

pub async fn touch_last_used<C: ConnectionTrait>(
    db: &C,
    queue: i64,
    serial: i64,
    now: i64,
) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::LastUsed, Expr::value(now))
        .filter(Column::Queue.eq(queue))
        .filter(Column::Serial.eq(serial))
        .exec(db)
        .await?;
    Ok(())
}
