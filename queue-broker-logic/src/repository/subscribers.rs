use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use queue_broker_entity::subscribers::{ActiveModel, Column, Entity, Model};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(id).one(db).await
}

/// The default subscriber of a queue is the one with the smallest id.
pub async fn default_for_queue<C: ConnectionTrait>(
    db: &C,
    queue: i64,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::Queue.eq(queue))
        .order_by_asc(Column::Id)
        .one(db)
        .await
}

pub async fn insert<C: ConnectionTrait>(db: &C, model: Model) -> Result<(), DbErr> {
    let active = ActiveModel {
        id: Set(model.id),
        queue: Set(model.queue),
        confirm_delay_seconds: Set(model.confirm_delay_seconds),
        look_ahead_serial: Set(model.look_ahead_serial),
        last_confirmed_serial: Set(model.last_confirmed_serial),
        next_emit_serial: Set(model.next_emit_serial),
        last_emit_timestamp: Set(model.last_emit_timestamp),
    };
    Entity::insert(active).exec_without_returning(db).await?;
    Ok(())
}

pub async fn advance_emit<C: ConnectionTrait>(txn: &C, id: i64, serial: i64) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::NextEmitSerial, Expr::value(serial + 1))
        .filter(Column::Id.eq(id))
        .exec(txn)
        .await?;
    Ok(())
}

pub async fn set_last_emit<C: ConnectionTrait>(db: &C, id: i64, now: i64) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::LastEmitTimestamp, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn set_last_confirmed<C: ConnectionTrait>(
    db: &C,
    id: i64,
    serial: i64,
) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::LastConfirmedSerial, Expr::value(serial))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn set_look_ahead<C: ConnectionTrait>(
    db: &C,
    id: i64,
    look_ahead_serial: i64,
) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::LookAheadSerial, Expr::value(look_ahead_serial))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}
