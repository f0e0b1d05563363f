use entity::{chat_message, chat_room};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(chat_room::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(chat_room::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(chat_room::Column::AdvertiserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(chat_room::Column::WorkerId).integer().not_null())
                    .col(
                        ColumnDef::new(chat_room::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(chat_room::Column::LastMessageAt)
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
                    .name("uq_chat_room_pair")
                    .col(chat_room::Column::AdvertiserId)
                    .col(chat_room::Column::WorkerId)
                    .table(chat_room::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(chat_message::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(chat_message::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(chat_message::Column::RoomId).integer().not_null())
                    .col(
                        ColumnDef::new(chat_message::Column::SenderId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(chat_message::Column::Content).text().not_null())
                    .col(
                        ColumnDef::new(chat_message::Column::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(chat_message::Column::CreatedAt)
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
                    .name("idx_chat_message_room")
                    .col(chat_message::Column::RoomId)
                    .table(chat_message::Entity)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(chat_message::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(chat_room::Entity).to_owned())
            .await
    }
}
