//! Process-wide id allocation backed by the version table.
//!
//! One monotonic counter serves every entity kind; ids are unique and
//! increasing but not dense.

use sea_orm::{sea_query::Expr, ConnectionTrait, DbErr, EntityTrait};

use queue_broker_entity::broker_versions::{Column, Entity};

/// Allocates the next entity id. Expects an open transaction so the
/// increment and the read-back stay atomic.
pub async fn next_id<C: ConnectionTrait>(txn: &C) -> Result<i64, DbErr> {
    Entity::update_many()
        .col_expr(Column::NextEntityId, Expr::col(Column::NextEntityId).add(1))
        .exec(txn)
        .await?;
    let row = Entity::find()
        .one(txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("broker version row is missing".to_string()))?;
    Ok(row.next_entity_id - 1)
}
