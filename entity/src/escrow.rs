use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Locked = 0,
    Released = 1,
    Refunded = 2,
}

/// Funds held against a task, released one slot at a time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "escrows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub task_id: i32,
    pub advertiser_id: i32,
    pub amount: i64,
    pub released: i64,
    pub refunded: i64,
    pub status: Status,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model {
    pub fn remaining(&self) -> i64 {
        self.amount - self.released - self.refunded
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
