use super::wallet::Kind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Credit = 0,
    Debit = 1,
}

#[derive(EnumIter, DeriveActiveEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[sea_orm(string_value = "funding")]
    Funding,
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    #[sea_orm(string_value = "task_payment")]
    TaskPayment,
    #[sea_orm(string_value = "task_earning")]
    TaskEarning,
    #[sea_orm(string_value = "task_posting")]
    TaskPosting,
    #[sea_orm(string_value = "referral_bonus")]
    ReferralBonus,
    #[sea_orm(string_value = "escrow")]
    Escrow,
    #[sea_orm(string_value = "escrow_release")]
    EscrowRelease,
    #[sea_orm(string_value = "refund")]
    Refund,
    #[sea_orm(string_value = "admin_adjustment")]
    AdminAdjustment,
    #[sea_orm(string_value = "company_cut")]
    CompanyCut,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "subscription")]
    Subscription,
}

/// Append only wallet ledger
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub wallet_id: i32,
    pub user_id: i32,
    pub kind: Kind,
    pub r#type: Type,
    pub category: Category,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    /// idempotency key
    #[sea_orm(unique)]
    pub reference: Option<String>,
    pub description: String,
    pub payment_id: Option<Uuid>,
    pub task_id: Option<i32>,
    pub created_at: i64,
}

impl Model {
    /// signed change of the balance
    pub fn change(&self) -> i64 {
        match self.r#type {
            Type::Credit => self.amount,
            Type::Debit => -self.amount,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
