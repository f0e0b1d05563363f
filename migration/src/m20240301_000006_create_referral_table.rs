use entity::{referral, referral_earning};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(referral::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(referral::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(referral::Column::ReferrerId).integer().not_null())
                    .col(ColumnDef::new(referral::Column::ReferredId).integer().not_null())
                    .col(
                        ColumnDef::new(referral::Column::Level)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(referral::Column::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(referral::Column::CreatedAt)
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
                    .name("uq_referral")
                    .col(referral::Column::ReferrerId)
                    .col(referral::Column::ReferredId)
                    .col(referral::Column::Level)
                    .table(referral::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(referral_earning::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(referral_earning::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::ReferrerId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::ReferredId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::ReferralId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::EarningType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::PaidAt)
                            .big_integer()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(referral_earning::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(referral::Entity).to_owned())
            .await
    }
}
