use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use queue_broker_entity::unconfirmed_deliveries::{ActiveModel, Column, Entity, Model};

/// The oldest delivery of a subscriber that is eligible for resend, i.e.
/// delivered at or before the cutoff.
pub async fn oldest_eligible<C: ConnectionTrait>(
    db: &C,
    subscriber: i64,
    cutoff: i64,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::Subscriber.eq(subscriber))
        .filter(Column::DeliverTime.lte(cutoff))
        .order_by_asc(Column::DeliverTime)
        .one(db)
        .await
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    subscriber: i64,
    serial: i64,
    now: i64,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        subscriber: Set(subscriber),
        serial: Set(serial),
        deliver_time: Set(now),
    };
    Entity::insert(active).exec_without_returning(db).await?;
    Ok(())
}

/// Records a resend by refreshing the delivery time.
pub async fn touch<C: ConnectionTrait>(
    db: &C,
    subscriber: i64,
    serial: i64,
    now: i64,
) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(Column::DeliverTime, Expr::value(now))
        .filter(Column::Subscriber.eq(subscriber))
        .filter(Column::Serial.eq(serial))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn delete<C: ConnectionTrait>(
    db: &C,
    subscriber: i64,
    serial: i64,
) -> Result<(), DbErr> {
    Entity::delete_by_id((subscriber, serial)).exec(db).await?;
    Ok(())
}

#[derive(FromQueryResult)]
struct MinSerial {
    value: Option<i64>,
}

/// Smallest outstanding serial of a subscriber, if any.
pub async fn min_serial<C: ConnectionTrait>(
    db: &C,
    subscriber: i64,
) -> Result<Option<i64>, DbErr> {
    let row = Entity::find()
        .select_only()
        .column_as(Column::Serial.min(), "value")
        .filter(Column::Subscriber.eq(subscriber))
        .into_model::<MinSerial>()
        .one(db)
        .await?;
    Ok(row.and_then(|row| row.value))
}
