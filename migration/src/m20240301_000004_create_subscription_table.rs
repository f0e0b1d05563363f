use entity::{plan, subscription};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(plan::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(plan::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(plan::Column::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(plan::Column::PlanType).integer().not_null())
                    .col(ColumnDef::new(plan::Column::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(plan::Column::DurationDays)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(plan::Column::DailyAdLimit)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(plan::Column::TaskWalletBonus)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(plan::Column::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(plan::Column::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(subscription::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(subscription::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(subscription::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(subscription::Column::PlanId).integer().not_null())
                    .col(
                        ColumnDef::new(subscription::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(subscription::Column::StartAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(subscription::Column::ExpiryAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(subscription::Column::AutoRenewal)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(subscription::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(subscription::Column::UpdatedAt)
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
                    .name("idx_subscription_user_status")
                    .col(subscription::Column::UserId)
                    .col(subscription::Column::Status)
                    .table(subscription::Entity)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(subscription::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(plan::Entity).to_owned())
            .await
    }
}
