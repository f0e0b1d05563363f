use super::{
    wallet::{credit_txn, debit_txn, Balances, Change},
    Service,
};
use crate::{now, Error, Result};
use entity::{plan, record::Category, subscription, user, wallet::Kind};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

const DAY: i64 = 24 * 60 * 60;

/// Subscription and wallet state attached to the current user.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionContext {
    pub has_active_subscription: bool,
    pub subscription: Option<subscription::Model>,
    pub plan: Option<plan::Model>,
    pub wallet_balance: i64,
    pub task_wallet_balance: i64,
    pub available_balance: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalReport {
    pub renewed: usize,
    pub expired: usize,
    pub errors: usize,
}

/// seed plans: name, type, price, days, daily limit, task wallet bonus
const PLANS: [(&str, plan::PlanType, i64, i32, i32, i64); 2] = [
    ("Demo Account", plan::PlanType::Trial, 300, 30, 100, 0),
    (
        "Business Member Account",
        plan::PlanType::Business,
        2500,
        30,
        0,
        1000,
    ),
];

pub async fn active_subscription<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<subscription::Model>> {
    Ok(subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::Status.eq(subscription::Status::Active))
        .filter(subscription::Column::ExpiryAt.gt(now() as i64))
        .order_by_desc(subscription::Column::ExpiryAt)
        .one(conn)
        .await?)
}

async fn set_subscribed<C: ConnectionTrait>(conn: &C, user_id: i32, value: bool) -> Result<()> {
    user::Entity::update_many()
        .set(user::ActiveModel {
            is_subscribed: Set(value),
            updated_at: Set(now() as i64),
            ..Default::default()
        })
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

impl Service {
    pub async fn create_plans(&self) -> Result<Vec<plan::Model>> {
        let mut plans = vec![];
        for (name, plan_type, price, days, limit, bonus) in PLANS {
            let found = plan::Entity::find()
                .filter(plan::Column::Name.eq(name))
                .one(self.db())
                .await?;
            let model = match found {
                Some(p) => p,
                None => {
                    plan::ActiveModel {
                        id: NotSet,
                        name: Set(name.to_owned()),
                        plan_type: Set(plan_type),
                        price: Set(price),
                        duration_days: Set(days),
                        daily_ad_limit: Set(limit),
                        task_wallet_bonus: Set(bonus),
                        is_active: Set(true),
                        created_at: Set(now() as i64),
                    }
                    .insert(self.db())
                    .await?
                }
            };
            plans.push(model);
        }
        Ok(plans)
    }

    pub async fn plans(&self) -> Result<Vec<plan::Model>> {
        Ok(plan::Entity::find()
            .filter(plan::Column::IsActive.eq(true))
            .order_by_asc(plan::Column::Price)
            .all(self.db())
            .await?)
    }

    pub async fn active_subscription(&self, user_id: i32) -> Result<Option<subscription::Model>> {
        active_subscription(self.db(), user_id).await
    }

    /// Pay for a plan from the main wallet and replace any active subscription.
    pub async fn subscribe(&self, user_id: i32, plan_id: i32) -> Result<subscription::Model> {
        let plan = plan::Entity::find_by_id(plan_id)
            .one(self.db())
            .await?
            .filter(|p| p.is_active)
            .ok_or(Error::NotFound("Plan"))?;
        let time = now() as i64;

        let txn = self.db().begin().await?;
        debit_txn(
            &txn,
            &Change::new(
                user_id,
                Kind::Main,
                plan.price,
                Category::Subscription,
                format!("{} subscription", plan.name),
            )
            .reference(format!("SUB_{}", Uuid::new_v4())),
        )
        .await?;
        subscription::Entity::update_many()
            .set(subscription::ActiveModel {
                status: Set(subscription::Status::Cancelled),
                updated_at: Set(time),
                ..Default::default()
            })
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::Status.eq(subscription::Status::Active))
            .exec(&txn)
            .await?;
        let sub = subscription::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            plan_id: Set(plan.id),
            status: Set(subscription::Status::Active),
            start_at: Set(time),
            expiry_at: Set(time + plan.duration_days as i64 * DAY),
            auto_renewal: Set(false),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        set_subscribed(&txn, user_id, true).await?;
        if plan.task_wallet_bonus > 0 {
            credit_txn(
                &txn,
                &Change::new(
                    user_id,
                    Kind::Task,
                    plan.task_wallet_bonus,
                    Category::Subscription,
                    format!("{} task wallet bonus", plan.name),
                )
                .reference(format!("SUB_BONUS_{}", sub.id)),
            )
            .await?;
        }
        txn.commit().await?;
        info!(user_id, plan = %plan.name, "subscribed");

        if let Err(e) = self.credit_signup_bonus(user_id).await {
            error!(user_id, error = %e, "referral bonus failed");
        }
        Ok(sub)
    }

    pub async fn set_auto_renewal(
        &self,
        sub: &subscription::Model,
        enabled: bool,
    ) -> Result<subscription::Model> {
        Ok(subscription::ActiveModel {
            id: Set(sub.id),
            auto_renewal: Set(enabled),
            updated_at: Set(now() as i64),
            ..Default::default()
        }
        .update(self.db())
        .await?)
    }

    pub async fn subscription_context(&self, user_id: i32) -> Result<SubscriptionContext> {
        let subscription = self.active_subscription(user_id).await?;
        let plan = match &subscription {
            Some(s) => plan::Entity::find_by_id(s.plan_id).one(self.db()).await?,
            None => None,
        };
        let Balances {
            main,
            task,
            available,
        } = self.balances(user_id).await?;
        Ok(SubscriptionContext {
            has_active_subscription: subscription.is_some(),
            subscription,
            plan,
            wallet_balance: main,
            task_wallet_balance: task,
            available_balance: available,
        })
    }

    /// Renew or expire every active subscription past its expiry.
    pub async fn renew_subscriptions(&self) -> Result<RenewalReport> {
        let time = now() as i64;
        let due = subscription::Entity::find()
            .filter(subscription::Column::Status.eq(subscription::Status::Active))
            .filter(subscription::Column::ExpiryAt.lte(time))
            .all(self.db())
            .await?;
        let mut report = RenewalReport::default();
        for sub in due {
            match self.renew_one(&sub, time).await {
                Ok(true) => report.renewed += 1,
                Ok(false) => report.expired += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(subscription_id = sub.id, error = %e, "renewal failed");
                }
            }
        }
        Ok(report)
    }

    /// true when renewed, false when expired
    async fn renew_one(&self, sub: &subscription::Model, time: i64) -> Result<bool> {
        let plan = plan::Entity::find_by_id(sub.plan_id).one(self.db()).await?;
        if sub.auto_renewal {
            if let Some(plan) = plan.filter(|p| p.is_active) {
                let txn = self.db().begin().await?;
                let charged = debit_txn(
                    &txn,
                    &Change::new(
                        sub.user_id,
                        Kind::Main,
                        plan.price,
                        Category::Subscription,
                        format!("{} renewal", plan.name),
                    )
                    .reference(format!("SUB_{}", Uuid::new_v4())),
                )
                .await;
                match charged {
                    Ok(_) => {
                        subscription::ActiveModel {
                            id: Set(sub.id),
                            expiry_at: Set(sub.expiry_at.max(time)
                                + plan.duration_days as i64 * DAY),
                            updated_at: Set(time),
                            ..Default::default()
                        }
                        .update(&txn)
                        .await?;
                        txn.commit().await?;
                        info!(user_id = sub.user_id, "subscription renewed");
                        return Ok(true);
                    }
                    Err(Error::InsufficientBalance) => {
                        txn.rollback().await?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let txn = self.db().begin().await?;
        subscription::ActiveModel {
            id: Set(sub.id),
            status: Set(subscription::Status::Expired),
            updated_at: Set(time),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        if active_subscription(&txn, sub.user_id).await?.is_none() {
            set_subscribed(&txn, sub.user_id, false).await?;
        }
        txn.commit().await?;
        info!(user_id = sub.user_id, "subscription expired");
        Ok(false)
    }
}
