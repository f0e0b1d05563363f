use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Received webhook, unique by gateway, reference and event type.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub gateway_id: i32,
    pub event_type: String,
    pub reference: String,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub processed: bool,
    pub processed_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
