use super::{Page, Service};
use crate::{now, Error, Result};
use entity::{chat_message, chat_room, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, NotSet, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;

pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: chat_room::Model,
    pub other_user_id: i32,
    pub unread: u64,
}

impl Service {
    /// The room between two users, the advertiser side decided by role.
    pub async fn get_or_create_room(
        &self,
        user: &user::Model,
        other_id: i32,
    ) -> Result<chat_room::Model> {
        if user.id == other_id {
            return Err(Error::invalid("You cannot chat with yourself"));
        }
        let other = self
            .get_user_by_id(other_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(Error::NotFound("User"))?;
        let existing = chat_room::Entity::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(chat_room::Column::AdvertiserId.eq(user.id))
                            .add(chat_room::Column::WorkerId.eq(other.id)),
                    )
                    .add(
                        Condition::all()
                            .add(chat_room::Column::AdvertiserId.eq(other.id))
                            .add(chat_room::Column::WorkerId.eq(user.id)),
                    ),
            )
            .one(self.db())
            .await?;
        if let Some(room) = existing {
            return Ok(room);
        }

        let (advertiser_id, worker_id) =
            match (user.role.can_post_tasks(), other.role.can_post_tasks()) {
                (true, false) => (user.id, other.id),
                (false, true) => (other.id, user.id),
                _ => (user.id.min(other.id), user.id.max(other.id)),
            };
        let time = now() as i64;
        Ok(chat_room::ActiveModel {
            id: NotSet,
            advertiser_id: Set(advertiser_id),
            worker_id: Set(worker_id),
            created_at: Set(time),
            last_message_at: Set(time),
        }
        .insert(self.db())
        .await?)
    }

    async fn member_room(&self, user_id: i32, room_id: i32) -> Result<chat_room::Model> {
        chat_room::Entity::find_by_id(room_id)
            .one(self.db())
            .await?
            .filter(|r| r.has_member(user_id))
            .ok_or(Error::NotFound("Chat room"))
    }

    pub async fn rooms(&self, user_id: i32) -> Result<Vec<RoomSummary>> {
        let rooms = chat_room::Entity::find()
            .filter(
                Condition::any()
                    .add(chat_room::Column::AdvertiserId.eq(user_id))
                    .add(chat_room::Column::WorkerId.eq(user_id)),
            )
            .order_by_desc(chat_room::Column::LastMessageAt)
            .all(self.db())
            .await?;
        let mut list = Vec::with_capacity(rooms.len());
        for room in rooms {
            let unread = chat_message::Entity::find()
                .filter(chat_message::Column::RoomId.eq(room.id))
                .filter(chat_message::Column::SenderId.ne(user_id))
                .filter(chat_message::Column::IsRead.eq(false))
                .count(self.db())
                .await?;
            list.push(RoomSummary {
                other_user_id: room.other(user_id),
                room,
                unread,
            });
        }
        Ok(list)
    }

    /// Messages of a room, oldest first. Marks the other side's messages read.
    pub async fn messages(
        &self,
        user_id: i32,
        room_id: i32,
        page: Page,
    ) -> Result<Vec<chat_message::Model>> {
        let room = self.member_room(user_id, room_id).await?;
        chat_message::Entity::update_many()
            .set(chat_message::ActiveModel {
                is_read: Set(true),
                ..Default::default()
            })
            .filter(chat_message::Column::RoomId.eq(room.id))
            .filter(chat_message::Column::SenderId.ne(user_id))
            .filter(chat_message::Column::IsRead.eq(false))
            .exec(self.db())
            .await?;
        let mut messages = chat_message::Entity::find()
            .filter(chat_message::Column::RoomId.eq(room.id))
            .order_by_desc(chat_message::Column::Id)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?;
        messages.reverse();
        Ok(messages)
    }

    /// Store a message, returning the room for delivery.
    pub async fn send_message(
        &self,
        sender_id: i32,
        room_id: i32,
        content: &str,
    ) -> Result<(chat_room::Model, chat_message::Model)> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::invalid("Message is empty"));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(Error::invalid("Message is too long"));
        }
        let room = self.member_room(sender_id, room_id).await?;
        let time = now() as i64;
        let message = chat_message::ActiveModel {
            id: NotSet,
            room_id: Set(room.id),
            sender_id: Set(sender_id),
            content: Set(content.to_owned()),
            is_read: Set(false),
            created_at: Set(time),
        }
        .insert(self.db())
        .await?;
        let room = chat_room::ActiveModel {
            id: Set(room.id),
            last_message_at: Set(time),
            ..Default::default()
        }
        .update(self.db())
        .await?;
        Ok((room, message))
    }

    pub async fn unread_count(&self, user_id: i32) -> Result<u64> {
        let room_ids: Vec<i32> = chat_room::Entity::find()
            .filter(
                Condition::any()
                    .add(chat_room::Column::AdvertiserId.eq(user_id))
                    .add(chat_room::Column::WorkerId.eq(user_id)),
            )
            .all(self.db())
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if room_ids.is_empty() {
            return Ok(0);
        }
        Ok(chat_message::Entity::find()
            .filter(chat_message::Column::RoomId.is_in(room_ids))
            .filter(chat_message::Column::SenderId.ne(user_id))
            .filter(chat_message::Column::IsRead.eq(false))
            .count(self.db())
            .await?)
    }
}
