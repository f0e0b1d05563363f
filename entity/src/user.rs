use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member = 0,
    Advertiser = 1,
    Admin = 2,
}

impl Role {
    /// advertisers and admins can post tasks
    pub fn can_post_tasks(&self) -> bool {
        matches!(self, Role::Advertiser | Role::Admin)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub username: Option<String>,

    /// argon2 phc string
    #[serde(skip_serializing, default)]
    pub password: String,

    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,

    pub role: Role,
    pub is_active: bool,
    /// set while an active subscription exists
    pub is_subscribed: bool,

    #[sea_orm(unique)]
    pub referral_code: String,
    pub referred_by: Option<i32>,

    pub last_login_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
