use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use queue_broker_entity::queues::{ActiveModel, Column, Entity, Model};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(id).one(db).await
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, DbErr> {
    Entity::find().filter(Column::Name.eq(name)).one(db).await
}

pub async fn insert<C: ConnectionTrait>(db: &C, model: Model) -> Result<(), DbErr> {
    let active = ActiveModel {
        id: Set(model.id),
        name: Set(model.name),
        next_serial: Set(model.next_serial),
        block_size_bytes: Set(model.block_size_bytes),
        block_start: Set(model.block_start),
        block_end: Set(model.block_end),
        block_write: Set(model.block_write),
    };
    Entity::insert(active).exec_without_returning(db).await?;
    Ok(())
}

/// Allocates the next serial for a queue. Expects an open transaction so
/// the increment and the read-back stay atomic; concurrent producers
/// therefore observe strictly increasing serials with no gaps.
pub async fn allocate_serial<C: ConnectionTrait>(txn: &C, id: i64) -> Result<i64, DbErr> {
    Entity::update_many()
        .col_expr(Column::NextSerial, Expr::col(Column::NextSerial).add(1))
        .filter(Column::Id.eq(id))
        .exec(txn)
        .await?;
    let row = find_by_id(txn, id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("queue {id} is missing")))?;
    Ok(row.next_serial - 1)
}

/// Queues whose last flush is older than the cutoff.
pub async fn stale_since<C: ConnectionTrait>(db: &C, cutoff: i64) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::BlockWrite.lt(cutoff))
        .all(db)
        .await
}

/// Records a packed block in the queue counters. `block_start` advances
/// only past non-tail blocks, which is what authorises reclamation.
pub async fn advance_blocks<C: ConnectionTrait>(
    txn: &C,
    id: i64,
    block_end: i64,
    block_start: Option<i64>,
) -> Result<(), DbErr> {
    let mut update = Entity::update_many()
        .col_expr(Column::BlockEnd, Expr::value(block_end))
        .filter(Column::Id.eq(id));
    if let Some(block_start) = block_start {
        update = update.col_expr(Column::BlockStart, Expr::value(block_start));
    }
    update.exec(txn).await?;
    Ok(())
}

pub async fn touch_block_write<C: ConnectionTrait>(db: &C, id: i64, now: i64) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::BlockWrite, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}
