use entity::{dispute, escrow, submission, task};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(task::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(task::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(task::Column::AdvertiserId).integer().not_null())
                    .col(ColumnDef::new(task::Column::Title).string_len(200).not_null())
                    .col(ColumnDef::new(task::Column::Description).text().not_null())
                    .col(
                        ColumnDef::new(task::Column::ProofInstructions)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(task::Column::PayoutPerSlot)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(task::Column::TotalSlots).integer().not_null())
                    .col(ColumnDef::new(task::Column::RemainingSlots).integer().not_null())
                    .col(ColumnDef::new(task::Column::Deadline).big_integer().not_null())
                    .col(
                        ColumnDef::new(task::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(task::Column::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(task::Column::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(submission::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(submission::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(submission::Column::TaskId).integer().not_null())
                    .col(ColumnDef::new(submission::Column::MemberId).integer().not_null())
                    .col(ColumnDef::new(submission::Column::Proof).text().not_null())
                    .col(
                        ColumnDef::new(submission::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(submission::Column::RejectionReason)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(submission::Column::ReviewedBy).integer().null())
                    .col(ColumnDef::new(submission::Column::ReviewedAt).big_integer().null())
                    .col(
                        ColumnDef::new(submission::Column::SubmittedAt)
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
                    .name("uq_submission_task_member")
                    .col(submission::Column::TaskId)
                    .col(submission::Column::MemberId)
                    .table(submission::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(escrow::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(escrow::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(escrow::Column::TaskId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(escrow::Column::AdvertiserId).integer().not_null())
                    .col(ColumnDef::new(escrow::Column::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(escrow::Column::Released)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(escrow::Column::Refunded)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(escrow::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(escrow::Column::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(escrow::Column::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(dispute::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(dispute::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(dispute::Column::SubmissionId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(dispute::Column::RaisedBy).integer().not_null())
                    .col(ColumnDef::new(dispute::Column::Reason).text().not_null())
                    .col(
                        ColumnDef::new(dispute::Column::AdminNotes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(dispute::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(dispute::Column::ResolvedBy).integer().null())
                    .col(ColumnDef::new(dispute::Column::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(dispute::Column::ResolvedAt).big_integer().null())
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(dispute::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(escrow::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(submission::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(task::Entity).to_owned())
            .await
    }
}
