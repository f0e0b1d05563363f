use super::record::Category;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Funding = 0,
    Withdrawal = 1,
}

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending = 0,
    Success = 1,
    Failed = 2,
    Cancelled = 3,
}

/// Gateway funding or withdrawal
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: i32,
    pub gateway_id: Option<i32>,
    pub r#type: Type,
    pub category: Category,
    /// minor units
    pub amount: i64,
    pub currency: String,
    pub status: Status,
    /// reference sent to the provider
    pub gateway_reference: String,
    #[sea_orm(unique)]
    pub internal_reference: String,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    #[sea_orm(column_type = "Text")]
    pub gateway_response: String,
    #[sea_orm(column_type = "Text")]
    pub metadata: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
