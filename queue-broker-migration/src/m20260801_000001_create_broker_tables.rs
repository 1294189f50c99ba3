use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Queues::Table)
                    .col(
                        ColumnDef::new(Queues::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Queues::Name).text().not_null().unique_key())
                    .col(ColumnDef::new(Queues::NextSerial).big_integer().not_null())
                    .col(
                        ColumnDef::new(Queues::BlockSizeBytes)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Queues::BlockStart).big_integer().not_null())
                    .col(ColumnDef::new(Queues::BlockEnd).big_integer().not_null())
                    .col(ColumnDef::new(Queues::BlockWrite).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subscribers::Table)
                    .col(
                        ColumnDef::new(Subscribers::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscribers::Queue).big_integer().not_null())
                    .col(
                        ColumnDef::new(Subscribers::ConfirmDelaySeconds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscribers::LookAheadSerial)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscribers::LastConfirmedSerial)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscribers::NextEmitSerial)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscribers::LastEmitTimestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscribers_queue")
                            .from(Subscribers::Table, Subscribers::Queue)
                            .to(Queues::Table, Queues::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .col(ColumnDef::new(Messages::Queue).big_integer().not_null())
                    .col(ColumnDef::new(Messages::Serial).big_integer().not_null())
                    .col(ColumnDef::new(Messages::Content).text().not_null())
                    .primary_key(Index::create().col(Messages::Queue).col(Messages::Serial))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_queue")
                            .from(Messages::Table, Messages::Queue)
                            .to(Queues::Table, Queues::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UnconfirmedDeliveries::Table)
                    .col(
                        ColumnDef::new(UnconfirmedDeliveries::Subscriber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UnconfirmedDeliveries::Serial)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UnconfirmedDeliveries::DeliverTime)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UnconfirmedDeliveries::Subscriber)
                            .col(UnconfirmedDeliveries::Serial),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unconfirmed_deliveries_subscriber")
                            .from(
                                UnconfirmedDeliveries::Table,
                                UnconfirmedDeliveries::Subscriber,
                            )
                            .to(Subscribers::Table, Subscribers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Blocks::Table)
                    .col(ColumnDef::new(Blocks::Queue).big_integer().not_null())
                    .col(ColumnDef::new(Blocks::Serial).big_integer().not_null())
                    .col(ColumnDef::new(Blocks::Path).text().not_null())
                    .col(ColumnDef::new(Blocks::LastUsed).big_integer().not_null())
                    .primary_key(Index::create().col(Blocks::Queue).col(Blocks::Serial))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blocks_queue")
                            .from(Blocks::Table, Blocks::Queue)
                            .to(Queues::Table, Queues::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BrokerVersions::Table)
                    .col(
                        ColumnDef::new(BrokerVersions::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BrokerVersions::SchemaVersion)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BrokerVersions::NextEntityId)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscribers_queue")
                    .table(Subscribers::Table)
                    .col(Subscribers::Queue)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_unconfirmed_deliveries_deliver_time")
                    .table(UnconfirmedDeliveries::Table)
                    .col(UnconfirmedDeliveries::Subscriber)
                    .col(UnconfirmedDeliveries::DeliverTime)
                    .to_owned(),
            )
            .await?;

        manager
            .exec_stmt(
                Query::insert()
                    .into_table(BrokerVersions::Table)
                    .columns([
                        BrokerVersions::Id,
                        BrokerVersions::SchemaVersion,
                        BrokerVersions::NextEntityId,
                    ])
                    .values_panic([1.into(), 1.into(), 1.into()])
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BrokerVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Blocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UnconfirmedDeliveries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscribers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Queues::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Queues {
    Table,
    Id,
    Name,
    NextSerial,
    BlockSizeBytes,
    BlockStart,
    BlockEnd,
    BlockWrite,
}

#[derive(DeriveIden)]
enum Subscribers {
    Table,
    Id,
    Queue,
    ConfirmDelaySeconds,
    LookAheadSerial,
    LastConfirmedSerial,
    NextEmitSerial,
    LastEmitTimestamp,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Queue,
    Serial,
    Content,
}

#[derive(DeriveIden)]
enum UnconfirmedDeliveries {
    Table,
    Subscriber,
    Serial,
    DeliverTime,
}

#[derive(DeriveIden)]
enum Blocks {
    Table,
    Queue,
    Serial,
    Path,
    LastUsed,
}

#[derive(DeriveIden)]
enum BrokerVersions {
    Table,
    Id,
    SchemaVersion,
    NextEntityId,
}
