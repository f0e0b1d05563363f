use entity::{record, wallet};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(wallet::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(wallet::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(wallet::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(wallet::Column::Kind).integer().not_null())
                    .col(
                        ColumnDef::new(wallet::Column::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(wallet::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(wallet::Column::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_wallet_user_kind")
                    .col(wallet::Column::UserId)
                    .col(wallet::Column::Kind)
                    .table(wallet::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(record::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(record::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(record::Column::WalletId).integer().not_null())
                    .col(ColumnDef::new(record::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(record::Column::Kind).integer().not_null())
                    .col(ColumnDef::new(record::Column::Type).integer().not_null())
                    .col(
                        ColumnDef::new(record::Column::Category)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(record::Column::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(record::Column::BalanceBefore)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(record::Column::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(record::Column::Reference).string_len(128).null())
                    .col(
                        ColumnDef::new(record::Column::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(record::Column::PaymentId).uuid().null())
                    .col(ColumnDef::new(record::Column::TaskId).integer().null())
                    .col(
                        ColumnDef::new(record::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_record_reference")
                    .col(record::Column::Reference)
                    .table(record::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_record_wallet")
                    .col(record::Column::WalletId)
                    .table(record::Entity)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(record::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(wallet::Entity).to_owned())
            .await
    }
}
