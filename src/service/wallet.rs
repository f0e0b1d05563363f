use super::{rand_hex, Page, Service};
use crate::{now, Error, Result};
use entity::{
    record::{self, Category},
    wallet::{self, Kind},
    withdrawal,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// A single balance change of one wallet.
#[derive(Debug, Clone)]
pub struct Change {
    pub user_id: i32,
    pub kind: Kind,
    pub amount: i64,
    pub category: Category,
    pub description: String,
    /// idempotency key
    pub reference: Option<String>,
    pub payment_id: Option<Uuid>,
    pub task_id: Option<i32>,
}

impl Change {
    pub fn new<S: Into<String>>(
        user_id: i32,
        kind: Kind,
        amount: i64,
        category: Category,
        description: S,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            category,
            description: description.into(),
            reference: None,
            payment_id: None,
            task_id: None,
        }
    }

    pub fn reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn payment(mut self, id: Uuid) -> Self {
        self.payment_id = Some(id);
        self
    }

    pub fn task(mut self, id: i32) -> Self {
        self.task_id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Balances {
    pub main: i64,
    pub task: i64,
    /// main balance not held by pending withdrawal requests
    pub available: i64,
}

pub async fn get_or_create_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    kind: Kind,
) -> Result<wallet::Model> {
    let found = wallet::Entity::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .filter(wallet::Column::Kind.eq(kind))
        .one(conn)
        .await?;
    match found {
        Some(w) => Ok(w),
        None => {
            let time = now() as i64;
            Ok(wallet::ActiveModel {
                id: NotSet,
                user_id: Set(user_id),
                kind: Set(kind),
                balance: Set(0),
                created_at: Set(time),
                updated_at: Set(time),
            }
            .insert(conn)
            .await?)
        }
    }
}

/// amount held by pending withdrawal requests
pub async fn pending_withdrawals<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<i64> {
    Ok(withdrawal::Entity::find()
        .filter(withdrawal::Column::UserId.eq(user_id))
        .filter(withdrawal::Column::Status.eq(withdrawal::Status::Pending))
        .all(conn)
        .await?
        .iter()
        .map(|w| w.amount)
        .sum())
}

pub async fn credit_txn(txn: &DatabaseTransaction, change: &Change) -> Result<record::Model> {
    apply(txn, change, record::Type::Credit).await
}

pub async fn debit_txn(txn: &DatabaseTransaction, change: &Change) -> Result<record::Model> {
    apply(txn, change, record::Type::Debit).await
}

async fn apply(
    txn: &DatabaseTransaction,
    change: &Change,
    r#type: record::Type,
) -> Result<record::Model> {
    if change.amount <= 0 {
        return Err(Error::invalid("Amount must be greater than zero"));
    }

    if let Some(reference) = &change.reference {
        if let Some(existing) = record::Entity::find()
            .filter(record::Column::Reference.eq(reference.clone()))
            .one(txn)
            .await?
        {
            return Ok(existing);
        }
    }

    let wallet = get_or_create_wallet(txn, change.user_id, change.kind).await?;
    let time = now() as i64;

    let res = match r#type {
        record::Type::Credit => {
            wallet::Entity::update_many()
                .col_expr(
                    wallet::Column::Balance,
                    Expr::col(wallet::Column::Balance).add(change.amount),
                )
                .col_expr(wallet::Column::UpdatedAt, Expr::value(time))
                .filter(wallet::Column::Id.eq(wallet.id))
                .exec(txn)
                .await?
        }
        record::Type::Debit => {
            // main wallet funds held by pending withdrawal requests are not spendable
            let held = match change.kind {
                Kind::Main => pending_withdrawals(txn, change.user_id).await?,
                Kind::Task => 0,
            };
            let required = change
                .amount
                .checked_add(held)
                .ok_or(Error::InsufficientBalance)?;
            wallet::Entity::update_many()
                .col_expr(
                    wallet::Column::Balance,
                    Expr::col(wallet::Column::Balance).sub(change.amount),
                )
                .col_expr(wallet::Column::UpdatedAt, Expr::value(time))
                .filter(wallet::Column::Id.eq(wallet.id))
                .filter(wallet::Column::Balance.gte(required))
                .exec(txn)
                .await?
        }
    };
    if res.rows_affected != 1 {
        return Err(Error::InsufficientBalance);
    }

    let after = wallet::Entity::find_by_id(wallet.id)
        .one(txn)
        .await?
        .ok_or(Error::NotFound("Wallet"))?
        .balance;
    let before = match r#type {
        record::Type::Credit => after - change.amount,
        record::Type::Debit => after + change.amount,
    };

    Ok(record::ActiveModel {
        id: NotSet,
        wallet_id: Set(wallet.id),
        user_id: Set(change.user_id),
        kind: Set(change.kind),
        r#type: Set(r#type),
        category: Set(change.category),
        amount: Set(change.amount),
        balance_before: Set(before),
        balance_after: Set(after),
        reference: Set(change.reference.clone()),
        description: Set(change.description.clone()),
        payment_id: Set(change.payment_id),
        task_id: Set(change.task_id),
        created_at: Set(time),
    }
    .insert(txn)
    .await?)
}

impl Service {
    pub async fn get_or_create_wallet(&self, user_id: i32, kind: Kind) -> Result<wallet::Model> {
        get_or_create_wallet(self.db(), user_id, kind).await
    }

    pub async fn balances(&self, user_id: i32) -> Result<Balances> {
        let main = self.get_or_create_wallet(user_id, Kind::Main).await?.balance;
        let task = self.get_or_create_wallet(user_id, Kind::Task).await?.balance;
        let held = pending_withdrawals(self.db(), user_id).await?;
        Ok(Balances {
            main,
            task,
            available: (main - held).max(0),
        })
    }

    /// Increase a wallet balance and append the ledger row.
    /// A change whose reference was already recorded returns the existing row.
    pub async fn credit(&self, change: Change) -> Result<record::Model> {
        let txn = self.db().begin().await?;
        let record = credit_txn(&txn, &change).await?;
        txn.commit().await?;
        Ok(record)
    }

    pub async fn debit(&self, change: Change) -> Result<record::Model> {
        let txn = self.db().begin().await?;
        let record = debit_txn(&txn, &change).await?;
        txn.commit().await?;
        Ok(record)
    }

    /// reject amounts above the configured single payment limit
    pub(crate) fn check_max(&self, amount: i64) -> Result<()> {
        if amount > self.payment.max_amount {
            return Err(Error::invalid(format!(
                "Maximum amount is {}",
                payment_gateway::format_major(self.payment.max_amount)
            )));
        }
        Ok(())
    }

    async fn move_between(&self, user_id: i32, from: Kind, to: Kind, amount: i64) -> Result<()> {
        self.check_max(amount)?;
        let key = rand_hex(8);
        let description = match to {
            Kind::Task => "Transfer to task wallet",
            Kind::Main => "Transfer to main wallet",
        };
        let txn = self.db().begin().await?;
        debit_txn(
            &txn,
            &Change::new(user_id, from, amount, Category::Transfer, description)
                .reference(format!("TRANSFER_OUT_{}", key)),
        )
        .await?;
        credit_txn(
            &txn,
            &Change::new(user_id, to, amount, Category::Transfer, description)
                .reference(format!("TRANSFER_IN_{}", key)),
        )
        .await?;
        txn.commit().await?;
        info!(user_id, amount, ?to, "wallet transfer");
        Ok(())
    }

    pub async fn transfer_to_task_wallet(&self, user_id: i32, amount: i64) -> Result<Balances> {
        self.move_between(user_id, Kind::Main, Kind::Task, amount)
            .await?;
        self.balances(user_id).await
    }

    pub async fn transfer_to_main_wallet(&self, user_id: i32, amount: i64) -> Result<Balances> {
        self.move_between(user_id, Kind::Task, Kind::Main, amount)
            .await?;
        self.balances(user_id).await
    }

    /// ledger rows newest first
    pub async fn records(
        &self,
        user_id: i32,
        kind: Option<Kind>,
        page: Page,
    ) -> Result<Vec<record::Model>> {
        let mut query = record::Entity::find().filter(record::Column::UserId.eq(user_id));
        if let Some(kind) = kind {
            query = query.filter(record::Column::Kind.eq(kind));
        }
        Ok(query
            .order_by_desc(record::Column::Id)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?)
    }

    pub async fn create_withdrawal_request(
        &self,
        user_id: i32,
        amount: i64,
        bank_code: String,
        account_number: String,
        account_name: String,
    ) -> Result<withdrawal::Model> {
        if amount < self.payment.min_withdrawal {
            return Err(Error::invalid(format!(
                "Minimum withdrawal is {}",
                payment_gateway::format_major(self.payment.min_withdrawal)
            )));
        }
        self.check_max(amount)?;
        if bank_code.is_empty() || account_number.is_empty() {
            return Err(Error::invalid("Bank code and account number are required"));
        }
        let balances = self.balances(user_id).await?;
        if balances.available < amount {
            return Err(Error::InsufficientBalance);
        }
        let time = now() as i64;
        Ok(withdrawal::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            amount: Set(amount),
            bank_code: Set(bank_code),
            account_number: Set(account_number),
            account_name: Set(account_name),
            status: Set(withdrawal::Status::Pending),
            admin_notes: Set(String::new()),
            processed_by: Set(None),
            payment_id: Set(None),
            created_at: Set(time),
            updated_at: Set(time),
            processed_at: Set(None),
        }
        .insert(self.db())
        .await?)
    }

    /// own requests, all requests for `None`
    pub async fn withdrawal_requests(
        &self,
        user_id: Option<i32>,
        page: Page,
    ) -> Result<Vec<withdrawal::Model>> {
        let mut query = withdrawal::Entity::find();
        if let Some(user_id) = user_id {
            query = query.filter(withdrawal::Column::UserId.eq(user_id));
        }
        Ok(query
            .order_by_desc(withdrawal::Column::Id)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?)
    }

    async fn set_withdrawal_status(
        &self,
        id: i32,
        from: withdrawal::Status,
        to: withdrawal::Status,
        admin_id: i32,
        notes: String,
    ) -> Result<bool> {
        let time = now() as i64;
        let res = withdrawal::Entity::update_many()
            .set(withdrawal::ActiveModel {
                status: Set(to),
                admin_notes: Set(notes),
                processed_by: Set(Some(admin_id)),
                processed_at: Set(Some(time)),
                updated_at: Set(time),
                ..Default::default()
            })
            .filter(withdrawal::Column::Id.eq(id))
            .filter(withdrawal::Column::Status.eq(from))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Approve a pending request and pay it out through the default gateway.
    pub async fn approve_withdrawal(&self, id: i32, admin_id: i32) -> Result<withdrawal::Model> {
        let request = withdrawal::Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Withdrawal request"))?;
        if !self
            .set_withdrawal_status(
                id,
                withdrawal::Status::Pending,
                withdrawal::Status::Approved,
                admin_id,
                request.admin_notes.clone(),
            )
            .await?
        {
            return Err(Error::invalid("Withdrawal request is not pending"));
        }

        let res = self
            .withdraw(
                request.user_id,
                request.amount,
                &request.bank_code,
                &request.account_number,
                None,
                Some(request.id),
            )
            .await;
        if let Err(err) = res {
            self.set_withdrawal_status(
                id,
                withdrawal::Status::Approved,
                withdrawal::Status::Failed,
                admin_id,
                err.to_string(),
            )
            .await?;
            return Err(err);
        }

        withdrawal::Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Withdrawal request"))
    }

    pub async fn reject_withdrawal(
        &self,
        id: i32,
        admin_id: i32,
        reason: String,
    ) -> Result<withdrawal::Model> {
        if !self
            .set_withdrawal_status(
                id,
                withdrawal::Status::Pending,
                withdrawal::Status::Rejected,
                admin_id,
                reason,
            )
            .await?
        {
            return Err(Error::invalid("Withdrawal request is not pending"));
        }
        withdrawal::Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Withdrawal request"))
    }
}
