use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub advertiser_id: i32,
    pub worker_id: i32,
    pub created_at: i64,
    pub last_message_at: i64,
}

impl Model {
    pub fn has_member(&self, user_id: i32) -> bool {
        self.advertiser_id == user_id || self.worker_id == user_id
    }

    pub fn other(&self, user_id: i32) -> i32 {
        if self.advertiser_id == user_id {
            self.worker_id
        } else {
            self.advertiser_id
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
