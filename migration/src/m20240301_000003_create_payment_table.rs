use entity::{payment, payment_detail, payment_gateway, webhook_event, withdrawal};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(payment_gateway::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(payment_gateway::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(payment_gateway::Column::Name)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(payment_gateway::Column::DisplayName)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment_gateway::Column::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(payment_gateway::Column::Config)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment_gateway::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment_gateway::Column::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(payment::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(payment::Column::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(payment::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(payment::Column::GatewayId).integer().null())
                    .col(ColumnDef::new(payment::Column::Type).integer().not_null())
                    .col(
                        ColumnDef::new(payment::Column::Category)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(payment::Column::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(payment::Column::Currency)
                            .string_len(3)
                            .not_null()
                            .default("NGN"),
                    )
                    .col(
                        ColumnDef::new(payment::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(payment::Column::GatewayReference)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment::Column::InternalReference)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(payment::Column::BalanceBefore).big_integer().null())
                    .col(ColumnDef::new(payment::Column::BalanceAfter).big_integer().null())
                    .col(
                        ColumnDef::new(payment::Column::GatewayResponse)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(payment::Column::Metadata).text().not_null())
                    .col(
                        ColumnDef::new(payment::Column::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(payment::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment::Column::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(payment::Column::CompletedAt).big_integer().null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_gateway_reference")
                    .col(payment::Column::GatewayReference)
                    .table(payment::Entity)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_status_created")
                    .col(payment::Column::Status)
                    .col(payment::Column::CreatedAt)
                    .table(payment::Entity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(payment_detail::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(payment_detail::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(payment_detail::Column::PaymentId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(payment_detail::Column::Provider)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(payment_detail::Column::AuthorizationUrl).string().null())
                    .col(ColumnDef::new(payment_detail::Column::AccessCode).string().null())
                    .col(ColumnDef::new(payment_detail::Column::ProviderReference).string().null())
                    .col(ColumnDef::new(payment_detail::Column::RecipientCode).string().null())
                    .col(ColumnDef::new(payment_detail::Column::TransferCode).string().null())
                    .col(ColumnDef::new(payment_detail::Column::BankCode).string_len(16).null())
                    .col(ColumnDef::new(payment_detail::Column::AccountNumber).string_len(20).null())
                    .col(ColumnDef::new(payment_detail::Column::AccountName).string().null())
                    .col(
                        ColumnDef::new(payment_detail::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(payment_detail::Column::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(webhook_event::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(webhook_event::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(webhook_event::Column::GatewayId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(webhook_event::Column::EventType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(webhook_event::Column::Reference)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(webhook_event::Column::Payload).text().not_null())
                    .col(
                        ColumnDef::new(webhook_event::Column::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(webhook_event::Column::ProcessedAt)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(webhook_event::Column::CreatedAt)
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
                    .name("uq_webhook_event")
                    .col(webhook_event::Column::GatewayId)
                    .col(webhook_event::Column::Reference)
                    .col(webhook_event::Column::EventType)
                    .table(webhook_event::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(withdrawal::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(withdrawal::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(withdrawal::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(withdrawal::Column::Amount).big_integer().not_null())
                    .col(ColumnDef::new(withdrawal::Column::BankCode).string_len(16).not_null())
                    .col(
                        ColumnDef::new(withdrawal::Column::AccountNumber)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(withdrawal::Column::AccountName).string().not_null())
                    .col(
                        ColumnDef::new(withdrawal::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(withdrawal::Column::AdminNotes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(withdrawal::Column::ProcessedBy).integer().null())
                    .col(ColumnDef::new(withdrawal::Column::PaymentId).uuid().null())
                    .col(
                        ColumnDef::new(withdrawal::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(withdrawal::Column::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(withdrawal::Column::ProcessedAt).big_integer().null())
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(withdrawal::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(webhook_event::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(payment_detail::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(payment::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(payment_gateway::Entity).to_owned())
            .await
    }
}
