use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provider specific fields of a payment, one row per payment.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Default)]
#[sea_orm(table_name = "payment_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub payment_id: Uuid,
    pub provider: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub provider_reference: Option<String>,
    pub recipient_code: Option<String>,
    pub transfer_code: Option<String>,
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
