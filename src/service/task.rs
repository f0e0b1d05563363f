use super::{
    subscription::active_subscription,
    wallet::{credit_txn, debit_txn, Change},
    Page, Service,
};
use crate::{now, Error, Result};
use entity::{dispute, escrow, record::Category, submission, task, user, wallet::Kind};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub proof_instructions: String,
    pub payout_per_slot: i64,
    pub total_slots: i32,
    /// unix seconds
    pub deadline: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Review {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    FavorMember,
    FavorAdvertiser,
}

async fn find_task(txn: &DatabaseTransaction, id: i32) -> Result<task::Model> {
    task::Entity::find_by_id(id)
        .one(txn)
        .await?
        .ok_or(Error::NotFound("Task"))
}

async fn find_escrow(txn: &DatabaseTransaction, task_id: i32) -> Result<escrow::Model> {
    escrow::Entity::find()
        .filter(escrow::Column::TaskId.eq(task_id))
        .one(txn)
        .await?
        .ok_or(Error::NotFound("Escrow"))
}

/// Move `released` and `refunded` forward on an escrow read in the same transaction.
async fn advance_escrow(
    txn: &DatabaseTransaction,
    escrow: &escrow::Model,
    release: i64,
    refund: i64,
) -> Result<escrow::Model> {
    if release + refund > escrow.remaining() {
        return Err(Error::InvalidPayment("Escrow has insufficient funds".to_owned()));
    }
    let released = escrow.released + release;
    let refunded = escrow.refunded + refund;
    let status = if released + refunded < escrow.amount {
        escrow::Status::Locked
    } else if refunded > 0 && released == 0 {
        escrow::Status::Refunded
    } else {
        escrow::Status::Released
    };
    let res = escrow::Entity::update_many()
        .set(escrow::ActiveModel {
            released: Set(released),
            refunded: Set(refunded),
            status: Set(status),
            updated_at: Set(now() as i64),
            ..Default::default()
        })
        .filter(escrow::Column::Id.eq(escrow.id))
        .filter(escrow::Column::Released.eq(escrow.released))
        .filter(escrow::Column::Refunded.eq(escrow.refunded))
        .exec(txn)
        .await?;
    if res.rows_affected != 1 {
        return Err(Error::InvalidPayment("Escrow changed, try again".to_owned()));
    }
    Ok(escrow::Model {
        released,
        refunded,
        status,
        ..escrow.clone()
    })
}

/// Return one slot of escrow to the advertiser task wallet.
async fn refund_slot_txn(
    txn: &DatabaseTransaction,
    task: &task::Model,
    reference: String,
) -> Result<()> {
    let escrow = find_escrow(txn, task.id).await?;
    advance_escrow(txn, &escrow, 0, task.payout_per_slot).await?;
    credit_txn(
        txn,
        &Change::new(
            task.advertiser_id,
            Kind::Task,
            task.payout_per_slot,
            Category::Refund,
            format!("Escrow refund for task: {}", task.title),
        )
        .reference(reference)
        .task(task.id),
    )
    .await?;
    Ok(())
}

impl Service {
    /// the account collecting the company cut, created on first use
    async fn company_user(&self, txn: &DatabaseTransaction) -> Result<user::Model> {
        let email = self.escrow.company_email.trim().to_lowercase();
        if let Some(user) = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(txn)
            .await?
        {
            return Ok(user);
        }
        let time = now() as i64;
        Ok(user::ActiveModel {
            id: NotSet,
            email: Set(email),
            username: Set(None),
            // never verifies
            password: Set("!".to_owned()),
            first_name: Set("Company".to_owned()),
            last_name: Set(String::new()),
            phone: Set(None),
            role: Set(user::Role::Admin),
            is_active: Set(false),
            is_subscribed: Set(false),
            referral_code: Set(super::rand_code(super::user::REFERRAL_CODE_CHARS)),
            referred_by: Set(None),
            last_login_at: Set(0),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(txn)
        .await?)
    }

    /// Post a task and lock its full cost from the task wallet.
    pub async fn create_task(&self, advertiser: &user::Model, new: NewTask) -> Result<task::Model> {
        if !advertiser.role.can_post_tasks() {
            return Err(Error::Forbidden("Only advertisers can post tasks"));
        }
        if active_subscription(self.db(), advertiser.id).await?.is_none() {
            return Err(Error::SubscriptionRequired);
        }
        let time = now() as i64;
        if new.title.trim().is_empty() {
            return Err(Error::invalid("Title is required"));
        }
        if new.payout_per_slot <= 0 {
            return Err(Error::invalid("Payout per slot must be greater than zero"));
        }
        if new.total_slots < 1 {
            return Err(Error::invalid("At least one slot is required"));
        }
        if new.deadline <= time {
            return Err(Error::invalid("Deadline must be in the future"));
        }
        let total = new
            .payout_per_slot
            .checked_mul(new.total_slots as i64)
            .ok_or_else(|| Error::invalid("Task cost is too large"))?;

        let txn = self.db().begin().await?;
        let task = task::ActiveModel {
            id: NotSet,
            advertiser_id: Set(advertiser.id),
            title: Set(new.title.trim().to_owned()),
            description: Set(new.description),
            proof_instructions: Set(new.proof_instructions),
            payout_per_slot: Set(new.payout_per_slot),
            total_slots: Set(new.total_slots),
            remaining_slots: Set(new.total_slots),
            deadline: Set(new.deadline),
            status: Set(task::Status::Active),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        debit_txn(
            &txn,
            &Change::new(
                advertiser.id,
                Kind::Task,
                total,
                Category::Escrow,
                format!("Escrow for task: {}", task.title),
            )
            .reference(format!("ESCROW_TASK_{}", task.id))
            .task(task.id),
        )
        .await?;
        escrow::ActiveModel {
            id: NotSet,
            task_id: Set(task.id),
            advertiser_id: Set(advertiser.id),
            amount: Set(total),
            released: Set(0),
            refunded: Set(0),
            status: Set(escrow::Status::Locked),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(task_id = task.id, advertiser_id = advertiser.id, total, "task posted");
        Ok(task)
    }

    /// open tasks: active, unexpired, with a free slot
    pub async fn list_tasks(&self, page: Page) -> Result<Vec<task::Model>> {
        Ok(task::Entity::find()
            .filter(task::Column::Status.eq(task::Status::Active))
            .filter(task::Column::Deadline.gt(now() as i64))
            .filter(task::Column::RemainingSlots.gt(0))
            .order_by_desc(task::Column::CreatedAt)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?)
    }

    pub async fn task(&self, id: i32) -> Result<task::Model> {
        task::Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Task"))
    }

    pub async fn my_tasks(&self, advertiser_id: i32, page: Page) -> Result<Vec<task::Model>> {
        Ok(task::Entity::find()
            .filter(task::Column::AdvertiserId.eq(advertiser_id))
            .order_by_desc(task::Column::CreatedAt)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?)
    }

    pub async fn escrow(&self, task_id: i32) -> Result<Option<escrow::Model>> {
        Ok(escrow::Entity::find()
            .filter(escrow::Column::TaskId.eq(task_id))
            .one(self.db())
            .await?)
    }

    /// Claim a slot of a task with a proof.
    pub async fn submit(
        &self,
        member: &user::Model,
        task_id: i32,
        proof: String,
    ) -> Result<submission::Model> {
        if active_subscription(self.db(), member.id).await?.is_none() {
            return Err(Error::SubscriptionRequired);
        }
        if proof.trim().is_empty() {
            return Err(Error::invalid("Proof is required"));
        }
        let time = now() as i64;
        let txn = self.db().begin().await?;
        let task = find_task(&txn, task_id).await?;
        if task.advertiser_id == member.id {
            return Err(Error::invalid("You cannot submit to your own task"));
        }
        let existing = submission::Entity::find()
            .filter(submission::Column::TaskId.eq(task.id))
            .filter(submission::Column::MemberId.eq(member.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(Error::invalid("You have already submitted to this task"));
        }
        if task.status != task::Status::Active {
            return Err(Error::invalid("Task is not active"));
        }
        if task.is_expired(time) {
            return Err(Error::invalid("Task deadline has passed"));
        }
        let res = task::Entity::update_many()
            .col_expr(
                task::Column::RemainingSlots,
                Expr::col(task::Column::RemainingSlots).sub(1),
            )
            .col_expr(task::Column::UpdatedAt, Expr::value(time))
            .filter(task::Column::Id.eq(task.id))
            .filter(task::Column::Status.eq(task::Status::Active))
            .filter(task::Column::RemainingSlots.gt(0))
            .exec(&txn)
            .await?;
        if res.rows_affected != 1 {
            return Err(Error::invalid("Task has no slots left"));
        }
        let submission = submission::ActiveModel {
            id: NotSet,
            task_id: Set(task.id),
            member_id: Set(member.id),
            proof: Set(proof),
            status: Set(submission::Status::Pending),
            rejection_reason: Set(String::new()),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            submitted_at: Set(time),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(submission)
    }

    /// Send a rejected submission back for review with a new proof.
    pub async fn resubmit(
        &self,
        member: &user::Model,
        submission_id: i32,
        proof: String,
    ) -> Result<submission::Model> {
        if proof.trim().is_empty() {
            return Err(Error::invalid("Proof is required"));
        }
        let sub = self.submission(submission_id).await?;
        if sub.member_id != member.id {
            return Err(Error::NotFound("Submission"));
        }
        if sub.status != submission::Status::Rejected {
            return Err(Error::invalid("Only rejected submissions can be resubmitted"));
        }
        let task = self.task(sub.task_id).await?;
        let time = now() as i64;
        if task.is_expired(time) || task.status != task::Status::Active {
            return Err(Error::invalid("Task is closed"));
        }
        // a disputed slot is settled by the dispute
        let disputed = dispute::Entity::find()
            .filter(dispute::Column::SubmissionId.eq(sub.id))
            .one(self.db())
            .await?;
        if disputed.is_some() {
            return Err(Error::invalid("Submission has been disputed"));
        }
        let res = submission::Entity::update_many()
            .set(submission::ActiveModel {
                proof: Set(proof),
                status: Set(submission::Status::Pending),
                rejection_reason: Set(String::new()),
                reviewed_by: Set(None),
                reviewed_at: Set(None),
                submitted_at: Set(time),
                ..Default::default()
            })
            .filter(submission::Column::Id.eq(sub.id))
            .filter(submission::Column::Status.eq(submission::Status::Rejected))
            .exec(self.db())
            .await?;
        if res.rows_affected != 1 {
            return Err(Error::invalid("Only rejected submissions can be resubmitted"));
        }
        self.submission(sub.id).await
    }

    pub async fn submission(&self, id: i32) -> Result<submission::Model> {
        submission::Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Submission"))
    }

    /// submissions of a task, visible to its advertiser and admins
    pub async fn task_submissions(
        &self,
        user: &user::Model,
        task_id: i32,
    ) -> Result<Vec<submission::Model>> {
        let task = self.task(task_id).await?;
        if task.advertiser_id != user.id && user.role != user::Role::Admin {
            return Err(Error::Forbidden("Not your task"));
        }
        Ok(submission::Entity::find()
            .filter(submission::Column::TaskId.eq(task_id))
            .order_by_desc(submission::Column::SubmittedAt)
            .all(self.db())
            .await?)
    }

    pub async fn my_submissions(&self, member_id: i32, page: Page) -> Result<Vec<submission::Model>> {
        Ok(submission::Entity::find()
            .filter(submission::Column::MemberId.eq(member_id))
            .order_by_desc(submission::Column::SubmittedAt)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?)
    }

    /// Approve a submission in `from` status and pay one slot out of escrow.
    async fn approve_txn(
        &self,
        txn: &DatabaseTransaction,
        sub: &submission::Model,
        from: submission::Status,
        reviewer_id: i32,
    ) -> Result<()> {
        let time = now() as i64;
        let res = submission::Entity::update_many()
            .set(submission::ActiveModel {
                status: Set(submission::Status::Approved),
                reviewed_by: Set(Some(reviewer_id)),
                reviewed_at: Set(Some(time)),
                ..Default::default()
            })
            .filter(submission::Column::Id.eq(sub.id))
            .filter(submission::Column::Status.eq(from))
            .exec(txn)
            .await?;
        if res.rows_affected != 1 {
            return Err(Error::invalid("Submission has already been reviewed"));
        }

        let task = find_task(txn, sub.task_id).await?;
        let escrow = find_escrow(txn, task.id).await?;
        let payout = task.payout_per_slot;
        advance_escrow(txn, &escrow, payout, 0).await?;

        let (member_share, company_cut) = self.escrow.split(payout);
        if member_share > 0 {
            credit_txn(
                txn,
                &Change::new(
                    sub.member_id,
                    Kind::Main,
                    member_share,
                    Category::TaskEarning,
                    format!("Earning from task: {}", task.title),
                )
                .reference(format!("TASK_EARNING_{}", sub.id))
                .task(task.id),
            )
            .await?;
        }
        if company_cut > 0 {
            let company = self.company_user(txn).await?;
            credit_txn(
                txn,
                &Change::new(
                    company.id,
                    Kind::Main,
                    company_cut,
                    Category::CompanyCut,
                    format!("Company cut from task: {}", task.title),
                )
                .reference(format!("COMPANY_CUT_{}", sub.id))
                .task(task.id),
            )
            .await?;
        }

        let approved = submission::Entity::find()
            .filter(submission::Column::TaskId.eq(task.id))
            .filter(submission::Column::Status.eq(submission::Status::Approved))
            .count(txn)
            .await?;
        if approved >= task.total_slots as u64 && task.status == task::Status::Active {
            task::Entity::update_many()
                .set(task::ActiveModel {
                    status: Set(task::Status::Completed),
                    updated_at: Set(time),
                    ..Default::default()
                })
                .filter(task::Column::Id.eq(task.id))
                .filter(task::Column::Status.eq(task::Status::Active))
                .exec(txn)
                .await?;
        }
        info!(
            submission_id = sub.id,
            task_id = task.id,
            member_share,
            company_cut,
            "slot released"
        );
        Ok(())
    }

    /// Approve or reject a pending submission, as the task advertiser or an admin.
    pub async fn review(
        &self,
        reviewer: &user::Model,
        submission_id: i32,
        action: Review,
        reason: String,
    ) -> Result<submission::Model> {
        let sub = self.submission(submission_id).await?;
        let task = self.task(sub.task_id).await?;
        if task.advertiser_id != reviewer.id && reviewer.role != user::Role::Admin {
            return Err(Error::Forbidden("Only the task owner can review submissions"));
        }
        match action {
            Review::Approve => {
                let txn = self.db().begin().await?;
                self.approve_txn(&txn, &sub, submission::Status::Pending, reviewer.id)
                    .await?;
                txn.commit().await?;
            }
            Review::Reject => {
                if reason.trim().is_empty() {
                    return Err(Error::invalid("A rejection reason is required"));
                }
                let txn = self.db().begin().await?;
                let res = submission::Entity::update_many()
                    .set(submission::ActiveModel {
                        status: Set(submission::Status::Rejected),
                        rejection_reason: Set(reason),
                        reviewed_by: Set(Some(reviewer.id)),
                        reviewed_at: Set(Some(now() as i64)),
                        ..Default::default()
                    })
                    .filter(submission::Column::Id.eq(sub.id))
                    .filter(submission::Column::Status.eq(submission::Status::Pending))
                    .exec(&txn)
                    .await?;
                if res.rows_affected != 1 {
                    return Err(Error::invalid("Submission has already been reviewed"));
                }
                // a cancelled task kept this slot reserved, hand it back
                if task.status == task::Status::Cancelled {
                    refund_slot_txn(&txn, &task, format!("SLOT_REFUND_{}", sub.id)).await?;
                }
                txn.commit().await?;
            }
        }
        self.submission(sub.id).await
    }

    /// Cancel a task and refund what pending submissions do not reserve.
    pub async fn cancel_task(&self, user: &user::Model, task_id: i32) -> Result<task::Model> {
        let time = now() as i64;
        let txn = self.db().begin().await?;
        let task = find_task(&txn, task_id).await?;
        if task.advertiser_id != user.id && user.role != user::Role::Admin {
            return Err(Error::Forbidden("Not your task"));
        }
        let res = task::Entity::update_many()
            .set(task::ActiveModel {
                status: Set(task::Status::Cancelled),
                updated_at: Set(time),
                ..Default::default()
            })
            .filter(task::Column::Id.eq(task.id))
            .filter(task::Column::Status.is_in([task::Status::Active, task::Status::Paused]))
            .exec(&txn)
            .await?;
        if res.rows_affected != 1 {
            return Err(Error::invalid("Task can no longer be cancelled"));
        }

        // pending reviews and open disputes keep their slot
        let pending = submission::Entity::find()
            .filter(submission::Column::TaskId.eq(task.id))
            .filter(submission::Column::Status.eq(submission::Status::Pending))
            .count(&txn)
            .await? as i64;
        let rejected: Vec<i32> = submission::Entity::find()
            .filter(submission::Column::TaskId.eq(task.id))
            .filter(submission::Column::Status.eq(submission::Status::Rejected))
            .all(&txn)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let disputed = if rejected.is_empty() {
            0
        } else {
            dispute::Entity::find()
                .filter(dispute::Column::SubmissionId.is_in(rejected))
                .filter(dispute::Column::Status.eq(dispute::Status::Open))
                .count(&txn)
                .await? as i64
        };
        let escrow = find_escrow(&txn, task.id).await?;
        let refund = escrow.remaining() - (pending + disputed) * task.payout_per_slot;
        if refund > 0 {
            advance_escrow(&txn, &escrow, 0, refund).await?;
            credit_txn(
                &txn,
                &Change::new(
                    task.advertiser_id,
                    Kind::Task,
                    refund,
                    Category::Refund,
                    format!("Escrow refund for task: {}", task.title),
                )
                .reference(format!("ESCROW_REFUND_{}", task.id))
                .task(task.id),
            )
            .await?;
        }
        txn.commit().await?;
        info!(task_id = task.id, refund, "task cancelled");
        self.task(task.id).await
    }

    /// Dispute a rejection, once per submission.
    pub async fn raise_dispute(
        &self,
        member: &user::Model,
        submission_id: i32,
        reason: String,
    ) -> Result<dispute::Model> {
        let sub = self.submission(submission_id).await?;
        if sub.member_id != member.id {
            return Err(Error::NotFound("Submission"));
        }
        if sub.status != submission::Status::Rejected {
            return Err(Error::invalid("Only rejected submissions can be disputed"));
        }
        if reason.trim().is_empty() {
            return Err(Error::invalid("A reason is required"));
        }
        if self.task(sub.task_id).await?.status == task::Status::Cancelled {
            return Err(Error::invalid("Task is closed"));
        }
        let exists = dispute::Entity::find()
            .filter(dispute::Column::SubmissionId.eq(sub.id))
            .one(self.db())
            .await?
            .is_some();
        if exists {
            return Err(Error::invalid("This submission has already been disputed"));
        }
        Ok(dispute::ActiveModel {
            id: NotSet,
            submission_id: Set(sub.id),
            raised_by: Set(member.id),
            reason: Set(reason),
            admin_notes: Set(String::new()),
            status: Set(dispute::Status::Open),
            resolved_by: Set(None),
            created_at: Set(now() as i64),
            resolved_at: Set(None),
        }
        .insert(self.db())
        .await?)
    }

    /// all disputes for admins, otherwise those raised by or against the user
    pub async fn disputes(&self, user: &user::Model) -> Result<Vec<dispute::Model>> {
        let mut query = dispute::Entity::find();
        if user.role != user::Role::Admin {
            let task_ids: Vec<i32> = task::Entity::find()
                .filter(task::Column::AdvertiserId.eq(user.id))
                .all(self.db())
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();
            let submission_ids: Vec<i32> = if task_ids.is_empty() {
                vec![]
            } else {
                submission::Entity::find()
                    .filter(submission::Column::TaskId.is_in(task_ids))
                    .all(self.db())
                    .await?
                    .into_iter()
                    .map(|s| s.id)
                    .collect()
            };
            let mut cond = Condition::any().add(dispute::Column::RaisedBy.eq(user.id));
            if !submission_ids.is_empty() {
                cond = cond.add(dispute::Column::SubmissionId.is_in(submission_ids));
            }
            query = query.filter(cond);
        }
        Ok(query
            .order_by_desc(dispute::Column::CreatedAt)
            .all(self.db())
            .await?)
    }

    /// Settle an open dispute by paying the member or refunding the advertiser.
    pub async fn resolve_dispute(
        &self,
        admin: &user::Model,
        dispute_id: i32,
        resolution: Resolution,
        notes: String,
    ) -> Result<dispute::Model> {
        if admin.role != user::Role::Admin {
            return Err(Error::Forbidden("Admin only"));
        }
        let time = now() as i64;
        let txn = self.db().begin().await?;
        let dispute = dispute::Entity::find_by_id(dispute_id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFound("Dispute"))?;
        let status = match resolution {
            Resolution::FavorMember => dispute::Status::ResolvedFavorMember,
            Resolution::FavorAdvertiser => dispute::Status::ResolvedFavorAdvertiser,
        };
        let res = dispute::Entity::update_many()
            .set(dispute::ActiveModel {
                status: Set(status),
                admin_notes: Set(notes),
                resolved_by: Set(Some(admin.id)),
                resolved_at: Set(Some(time)),
                ..Default::default()
            })
            .filter(dispute::Column::Id.eq(dispute.id))
            .filter(dispute::Column::Status.eq(dispute::Status::Open))
            .exec(&txn)
            .await?;
        if res.rows_affected != 1 {
            return Err(Error::invalid("Dispute is already resolved"));
        }

        let sub = submission::Entity::find_by_id(dispute.submission_id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFound("Submission"))?;
        match resolution {
            Resolution::FavorMember => {
                self.approve_txn(&txn, &sub, submission::Status::Rejected, admin.id)
                    .await?;
            }
            Resolution::FavorAdvertiser => {
                let task = find_task(&txn, sub.task_id).await?;
                refund_slot_txn(&txn, &task, format!("DISPUTE_REFUND_{}", dispute.id)).await?;
            }
        }
        txn.commit().await?;
        info!(dispute_id, ?resolution, "dispute resolved");
        dispute::Entity::find_by_id(dispute_id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Dispute"))
    }
}
