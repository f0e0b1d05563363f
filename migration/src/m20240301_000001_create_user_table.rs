use entity::{login_record, profile, user};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(user::Entity)
            .if_not_exists()
            .col(
                ColumnDef::new(user::Column::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(user::Column::Email).string_len(255).not_null())
            .col(ColumnDef::new(user::Column::Username).string_len(50).null())
            .col(ColumnDef::new(user::Column::Password).string_len(255).not_null())
            .col(
                ColumnDef::new(user::Column::FirstName)
                    .string_len(100)
                    .not_null()
                    .default(""),
            )
            .col(
                ColumnDef::new(user::Column::LastName)
                    .string_len(100)
                    .not_null()
                    .default(""),
            )
            .col(ColumnDef::new(user::Column::Phone).string_len(20).null())
            .col(
                ColumnDef::new(user::Column::Role)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(user::Column::IsActive)
                    .boolean()
                    .not_null()
                    .default(true),
            )
            .col(
                ColumnDef::new(user::Column::IsSubscribed)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(user::Column::ReferralCode)
                    .string_len(16)
                    .not_null(),
            )
            .col(ColumnDef::new(user::Column::ReferredBy).integer().null())
            .col(
                ColumnDef::new(user::Column::LastLoginAt)
                    .big_integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(user::Column::CreatedAt)
                    .big_integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(user::Column::UpdatedAt)
                    .big_integer()
                    .not_null(),
            )
            .to_owned();
        manager.create_table(table).await?;

        for (name, col) in [
            ("uq_user_email", user::Column::Email),
            ("uq_user_username", user::Column::Username),
            ("uq_user_referral_code", user::Column::ReferralCode),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .col(col)
                        .table(user::Entity)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(profile::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(profile::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(profile::Column::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(profile::Column::Bio)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(profile::Column::Country)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(profile::Column::State)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(profile::Column::City)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(profile::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(profile::Column::UpdatedAt)
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
                    .name("uq_profile_user")
                    .col(profile::Column::UserId)
                    .table(profile::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(login_record::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(login_record::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(login_record::Column::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(login_record::Column::Action)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(login_record::Column::Ip)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(login_record::Column::CreatedAt)
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
                    .name("idx_login_record_user")
                    .col(login_record::Column::UserId)
                    .table(login_record::Entity)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(login_record::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(profile::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(user::Entity).to_owned())
            .await
    }
}
