use super::{
    subscription::active_subscription,
    wallet::{credit_txn, Change},
    Service,
};
use crate::{now, Result};
use entity::{plan, record::Category, referral, referral_earning, user, wallet::Kind};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, NotSet,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;

pub const SIGNUP_EARNING: &str = "signup";

#[derive(Debug, Clone, Serialize)]
pub struct ReferredUser {
    pub id: i32,
    pub email: String,
    pub username: Option<String>,
    pub level: i32,
    pub is_subscribed: bool,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralDashboard {
    pub referral_code: String,
    pub level1: Vec<ReferredUser>,
    pub level2: Vec<ReferredUser>,
    pub total_earnings: i64,
    pub earnings: Vec<referral_earning::Model>,
}

/// Link a new user to its referrer and the referrer's own referrer.
pub async fn link_referrals(
    txn: &DatabaseTransaction,
    referrer: &user::Model,
    referred: &user::Model,
) -> Result<()> {
    let time = now() as i64;
    let mut links = vec![(referrer.id, 1)];
    if let Some(upline) = referral::Entity::find()
        .filter(referral::Column::ReferredId.eq(referrer.id))
        .filter(referral::Column::Level.eq(1))
        .one(txn)
        .await?
    {
        if upline.referrer_id != referred.id {
            links.push((upline.referrer_id, 2));
        }
    }
    for (referrer_id, level) in links {
        referral::ActiveModel {
            id: NotSet,
            referrer_id: Set(referrer_id),
            referred_id: Set(referred.id),
            level: Set(level),
            is_active: Set(true),
            created_at: Set(time),
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

/// whether the user holds an active business subscription
async fn is_business<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<bool> {
    let Some(sub) = active_subscription(conn, user_id).await? else {
        return Ok(false);
    };
    Ok(plan::Entity::find_by_id(sub.plan_id)
        .one(conn)
        .await?
        .map(|p| p.plan_type == plan::PlanType::Business)
        .unwrap_or(false))
}

impl Service {
    /// Pay the signup bonus to the uplines of a newly subscribed business member, once.
    pub async fn credit_signup_bonus(&self, referred_id: i32) -> Result<Vec<referral_earning::Model>> {
        let mut paid = vec![];
        if !is_business(self.db(), referred_id).await? {
            return Ok(paid);
        }
        let already = referral_earning::Entity::find()
            .filter(referral_earning::Column::ReferredId.eq(referred_id))
            .filter(referral_earning::Column::EarningType.eq(SIGNUP_EARNING))
            .one(self.db())
            .await?
            .is_some();
        if already {
            return Ok(paid);
        }

        let referrals = referral::Entity::find()
            .filter(referral::Column::ReferredId.eq(referred_id))
            .filter(referral::Column::IsActive.eq(true))
            .order_by_asc(referral::Column::Level)
            .all(self.db())
            .await?;
        for link in referrals {
            let amount = self.referral.bonus(link.level);
            if amount <= 0 || !is_business(self.db(), link.referrer_id).await? {
                continue;
            }
            let time = now() as i64;
            let txn = self.db().begin().await?;
            let earning = referral_earning::ActiveModel {
                id: NotSet,
                referrer_id: Set(link.referrer_id),
                referred_id: Set(referred_id),
                referral_id: Set(link.id),
                amount: Set(amount),
                earning_type: Set(SIGNUP_EARNING.to_owned()),
                status: Set(referral_earning::Status::Pending),
                created_at: Set(time),
                paid_at: Set(None),
            }
            .insert(&txn)
            .await?;
            credit_txn(
                &txn,
                &Change::new(
                    link.referrer_id,
                    Kind::Main,
                    amount,
                    Category::ReferralBonus,
                    format!("Level {} referral bonus", link.level),
                )
                .reference(format!("REFERRAL_{}", earning.id)),
            )
            .await?;
            let earning = referral_earning::ActiveModel {
                id: Set(earning.id),
                status: Set(referral_earning::Status::Paid),
                paid_at: Set(Some(time)),
                ..Default::default()
            }
            .update(&txn)
            .await?;
            txn.commit().await?;
            info!(
                referrer_id = link.referrer_id,
                referred_id,
                level = link.level,
                amount,
                "referral bonus paid"
            );
            paid.push(earning);
        }
        Ok(paid)
    }

    pub async fn referral_dashboard(&self, user: &user::Model) -> Result<ReferralDashboard> {
        let links = referral::Entity::find()
            .filter(referral::Column::ReferrerId.eq(user.id))
            .order_by_desc(referral::Column::CreatedAt)
            .all(self.db())
            .await?;
        let mut level1 = vec![];
        let mut level2 = vec![];
        for link in links {
            let Some(referred) = self.get_user_by_id(link.referred_id).await? else {
                continue;
            };
            let item = ReferredUser {
                id: referred.id,
                email: referred.email,
                username: referred.username,
                level: link.level,
                is_subscribed: referred.is_subscribed,
                joined_at: link.created_at,
            };
            if link.level == 1 {
                level1.push(item);
            } else {
                level2.push(item);
            }
        }
        let earnings = referral_earning::Entity::find()
            .filter(referral_earning::Column::ReferrerId.eq(user.id))
            .order_by_desc(referral_earning::Column::Id)
            .all(self.db())
            .await?;
        let total_earnings = earnings
            .iter()
            .filter(|e| e.status == referral_earning::Status::Paid)
            .map(|e| e.amount)
            .sum();
        Ok(ReferralDashboard {
            referral_code: user.referral_code.clone(),
            level1,
            level2,
            total_earnings,
            earnings,
        })
    }
}
