use super::{
    rand_hex,
    wallet::{credit_txn, debit_txn, get_or_create_wallet, pending_withdrawals, Change},
    Page, Service,
};
use crate::{now, Error, Result};
use entity::{
    payment, payment_detail, payment_gateway as gateway_row,
    record::Category,
    user,
    wallet::Kind,
    withdrawal,
};
use payment_gateway::{
    Bank, CheckoutRequest, Provider, RecipientRequest, ResolvedAccount, TransferRequest,
    TransferStatus, Verification,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a started funding checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Funding {
    pub payment_id: Uuid,
    pub reference: String,
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub gateway: Provider,
}

/// `PS_<timestamp>_<hex>` style payment reference
pub fn new_reference(provider: Provider) -> String {
    format!("{}_{}_{}", provider.reference_prefix(), now(), rand_hex(4))
}

/// feature and limit config stored on each gateway row
pub fn gateway_config(provider: Provider) -> Value {
    let (ussd, features) = match provider {
        Provider::Paystack => (true, vec!["card", "bank_transfer", "ussd", "transfers"]),
        Provider::Flutterwave => (true, vec!["card", "bank_transfer", "ussd", "transfers"]),
        Provider::Monnify => (false, vec!["card", "bank_transfer", "disbursements"]),
    };
    json!({
        "supports_card": true,
        "supports_bank_transfer": true,
        "supports_ussd": ussd,
        "supports_withdrawal": true,
        "currencies": ["NGN"],
        "features": features,
        "limits": {
            "min": 10_000,
            "max": 5_000_000_000i64,
        },
    })
}

pub(crate) async fn find_gateway_row<C: ConnectionTrait>(
    conn: &C,
    provider: Provider,
) -> Result<Option<gateway_row::Model>> {
    Ok(gateway_row::Entity::find()
        .filter(gateway_row::Column::Name.eq(provider.as_str()))
        .one(conn)
        .await?)
}

/// payment by either of its references
/// payments of one type matching a gateway or internal reference
pub(crate) fn by_reference(reference: &str, r#type: payment::Type) -> Select<payment::Entity> {
    payment::Entity::find()
        .filter(
            Condition::any()
                .add(payment::Column::GatewayReference.eq(reference))
                .add(payment::Column::InternalReference.eq(reference)),
        )
        .filter(payment::Column::Type.eq(r#type))
}

/// Move a pending payment to a terminal status, false if it already left pending.
async fn finish_txn(
    txn: &DatabaseTransaction,
    payment: &payment::Model,
    status: payment::Status,
    response: &Value,
) -> Result<bool> {
    let time = now() as i64;
    let res = payment::Entity::update_many()
        .set(payment::ActiveModel {
            status: Set(status),
            gateway_response: Set(response.to_string()),
            updated_at: Set(time),
            completed_at: Set(Some(time)),
            ..Default::default()
        })
        .filter(payment::Column::Id.eq(payment.id))
        .filter(payment::Column::Status.eq(payment::Status::Pending))
        .exec(txn)
        .await?;
    Ok(res.rows_affected == 1)
}

async fn set_request_status(
    txn: &DatabaseTransaction,
    payment_id: Uuid,
    status: withdrawal::Status,
) -> Result<()> {
    let time = now() as i64;
    withdrawal::Entity::update_many()
        .set(withdrawal::ActiveModel {
            status: Set(status),
            updated_at: Set(time),
            processed_at: Set(Some(time)),
            ..Default::default()
        })
        .filter(withdrawal::Column::PaymentId.eq(payment_id))
        .filter(withdrawal::Column::Status.is_in([
            withdrawal::Status::Pending,
            withdrawal::Status::Approved,
        ]))
        .exec(txn)
        .await?;
    Ok(())
}

impl Service {
    pub async fn get_payment(&self, id: Uuid) -> Result<Option<payment::Model>> {
        Ok(payment::Entity::find_by_id(id).one(self.db()).await?)
    }

    pub async fn payment_detail(&self, payment_id: Uuid) -> Result<Option<payment_detail::Model>> {
        Ok(payment_detail::Entity::find()
            .filter(payment_detail::Column::PaymentId.eq(payment_id))
            .one(self.db())
            .await?)
    }

    /// provider of the gateway row a payment was made through
    pub async fn payment_provider(&self, payment: &payment::Model) -> Result<Provider> {
        let gateway_id = payment
            .gateway_id
            .ok_or(Error::Str("payment has no gateway"))?;
        let row = gateway_row::Entity::find_by_id(gateway_id)
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Payment gateway"))?;
        Ok(row.name.parse()?)
    }

    async fn active_gateway_row(&self, provider: Provider) -> Result<gateway_row::Model> {
        match find_gateway_row(self.db(), provider).await? {
            Some(row) if row.is_active => Ok(row),
            _ => Err(Error::invalid(format!(
                "Payment gateway {} is not available",
                provider.display_name()
            ))),
        }
    }

    /// Insert or refresh the gateway rows, keeping the admin controlled `is_active`.
    pub async fn setup_gateways(&self) -> Result<Vec<gateway_row::Model>> {
        let mut rows = vec![];
        let time = now() as i64;
        for provider in Provider::ALL {
            let config = gateway_config(provider).to_string();
            let row = match find_gateway_row(self.db(), provider).await? {
                Some(row) => {
                    gateway_row::ActiveModel {
                        id: Set(row.id),
                        display_name: Set(provider.display_name().to_owned()),
                        config: Set(config),
                        updated_at: Set(time),
                        ..Default::default()
                    }
                    .update(self.db())
                    .await?
                }
                None => {
                    gateway_row::ActiveModel {
                        id: NotSet,
                        name: Set(provider.as_str().to_owned()),
                        display_name: Set(provider.display_name().to_owned()),
                        is_active: Set(true),
                        config: Set(config),
                        created_at: Set(time),
                        updated_at: Set(time),
                    }
                    .insert(self.db())
                    .await?
                }
            };
            rows.push(row);
        }
        Ok(rows)
    }

    pub async fn set_gateway_active(&self, provider: Provider, active: bool) -> Result<()> {
        gateway_row::Entity::update_many()
            .set(gateway_row::ActiveModel {
                is_active: Set(active),
                updated_at: Set(now() as i64),
                ..Default::default()
            })
            .filter(gateway_row::Column::Name.eq(provider.as_str()))
            .exec(self.db())
            .await?;
        Ok(())
    }

    /// Create a pending funding payment and start the gateway checkout.
    pub async fn initiate_funding(
        &self,
        user: &user::Model,
        amount: i64,
        provider: Option<Provider>,
    ) -> Result<Funding> {
        if amount < self.payment.min_amount || amount > self.payment.max_amount {
            return Err(Error::invalid(format!(
                "Amount must be between {} and {}",
                payment_gateway::format_major(self.payment.min_amount),
                payment_gateway::format_major(self.payment.max_amount)
            )));
        }
        let (provider, gateway) = self.gateway(provider)?;
        let row = self.active_gateway_row(provider).await?;

        let reference = new_reference(provider);
        let time = now() as i64;
        let id = Uuid::new_v4();
        let metadata = json!({
            "payment_id": id,
            "user_id": user.id,
        });
        let payment = payment::ActiveModel {
            id: Set(id),
            user_id: Set(user.id),
            gateway_id: Set(Some(row.id)),
            r#type: Set(payment::Type::Funding),
            category: Set(Category::Funding),
            amount: Set(amount),
            currency: Set(self.payment.currency.clone()),
            status: Set(payment::Status::Pending),
            gateway_reference: Set(reference.clone()),
            internal_reference: Set(reference.clone()),
            balance_before: Set(None),
            balance_after: Set(None),
            gateway_response: Set("{}".to_owned()),
            metadata: Set(metadata.to_string()),
            description: Set(format!("Wallet funding via {}", provider.display_name())),
            created_at: Set(time),
            updated_at: Set(time),
            completed_at: Set(None),
        }
        .insert(self.db())
        .await?;

        let req = CheckoutRequest {
            reference: reference.clone(),
            amount,
            currency: self.payment.currency.clone(),
            email: user.email.clone(),
            name: format!("{} {}", user.first_name, user.last_name)
                .trim()
                .to_owned(),
            description: payment.description.clone(),
            callback_url: Some(self.callback_url(provider)),
            metadata,
        };

        let checkout = match gateway.initialize(&req).await {
            Ok(checkout) => checkout,
            Err(err) => {
                warn!(%reference, error = %err, "funding initialize failed");
                let txn = self.db().begin().await?;
                finish_txn(
                    &txn,
                    &payment,
                    payment::Status::Failed,
                    &json!({"error": err.to_string()}),
                )
                .await?;
                txn.commit().await?;
                return Err(err.into());
            }
        };

        payment::ActiveModel {
            id: Set(payment.id),
            gateway_reference: Set(checkout.reference.clone()),
            gateway_response: Set(checkout.raw.to_string()),
            updated_at: Set(now() as i64),
            ..Default::default()
        }
        .update(self.db())
        .await?;

        payment_detail::ActiveModel {
            id: NotSet,
            payment_id: Set(payment.id),
            provider: Set(provider.as_str().to_owned()),
            authorization_url: Set(Some(checkout.authorization_url.clone())),
            access_code: Set(checkout.access_code.clone()),
            provider_reference: Set(Some(checkout.reference.clone())),
            recipient_code: Set(None),
            transfer_code: Set(None),
            bank_code: Set(None),
            account_number: Set(None),
            account_name: Set(None),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(self.db())
        .await?;

        info!(%reference, amount, gateway = %provider, "funding initiated");
        Ok(Funding {
            payment_id: payment.id,
            reference: checkout.reference,
            authorization_url: checkout.authorization_url,
            access_code: checkout.access_code,
            gateway: provider,
        })
    }

    /// Verify one of the user's funding references after the checkout redirect.
    /// Crediting is left to the webhook and reconciliation.
    pub async fn payment_callback(
        &self,
        user_id: i32,
        reference: &str,
    ) -> Result<(payment::Model, Verification)> {
        let payment = by_reference(reference, payment::Type::Funding)
            .filter(payment::Column::UserId.eq(user_id))
            .one(self.db())
            .await?
            .ok_or(Error::NotFound("Payment"))?;
        let provider = self.payment_provider(&payment).await?;
        let (_, gateway) = self.gateway(Some(provider))?;
        let verification = gateway.verify(&payment.gateway_reference).await?;
        Ok((payment, verification))
    }

    /// Mark a pending funding successful and credit the main wallet once.
    pub async fn complete_funding(
        &self,
        payment: &payment::Model,
        paid_amount: i64,
        response: &Value,
    ) -> Result<bool> {
        let txn = self.db().begin().await?;
        if !finish_txn(&txn, payment, payment::Status::Success, response).await? {
            return Ok(false);
        }
        let record = credit_txn(
            &txn,
            &Change::new(
                payment.user_id,
                Kind::Main,
                paid_amount,
                Category::Funding,
                payment.description.clone(),
            )
            .reference(format!("FUND_{}", payment.internal_reference))
            .payment(payment.id),
        )
        .await?;
        payment::ActiveModel {
            id: Set(payment.id),
            balance_before: Set(Some(record.balance_before)),
            balance_after: Set(Some(record.balance_after)),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        txn.commit().await?;
        info!(
            reference = %payment.internal_reference,
            amount = paid_amount,
            "funding completed"
        );
        Ok(true)
    }

    /// Mark a pending payment failed without touching wallets.
    pub async fn fail_payment(&self, payment: &payment::Model, response: &Value) -> Result<bool> {
        let txn = self.db().begin().await?;
        let done = finish_txn(&txn, payment, payment::Status::Failed, response).await?;
        txn.commit().await?;
        Ok(done)
    }

    /// Pay out from the main wallet to a bank account.
    /// The wallet is debited before the transfer and refunded if it fails.
    pub async fn withdraw(
        &self,
        user_id: i32,
        amount: i64,
        bank_code: &str,
        account_number: &str,
        provider: Option<Provider>,
        request_id: Option<i32>,
    ) -> Result<payment::Model> {
        if amount < self.payment.min_withdrawal {
            return Err(Error::invalid(format!(
                "Minimum withdrawal is {}",
                payment_gateway::format_major(self.payment.min_withdrawal)
            )));
        }
        self.check_max(amount)?;
        // early exit before any gateway call, the debit enforces it again
        let wallet = get_or_create_wallet(self.db(), user_id, Kind::Main).await?;
        let held = pending_withdrawals(self.db(), user_id).await?;
        if wallet.balance - held < amount {
            return Err(Error::InsufficientBalance);
        }
        let (provider, gateway) = self.gateway(provider)?;
        let row = self.active_gateway_row(provider).await?;

        let account = gateway.resolve_account(account_number, bank_code).await?;
        let recipient = gateway
            .create_recipient(&RecipientRequest {
                name: account.account_name.clone(),
                account_number: account.account_number.clone(),
                bank_code: bank_code.to_owned(),
                currency: self.payment.currency.clone(),
            })
            .await?;

        let reference = new_reference(provider);
        let time = now() as i64;
        let id = Uuid::new_v4();
        let description = format!("Withdrawal to {}", account.account_name);

        let txn = self.db().begin().await?;
        let payment = payment::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            gateway_id: Set(Some(row.id)),
            r#type: Set(payment::Type::Withdrawal),
            category: Set(Category::Withdrawal),
            amount: Set(amount),
            currency: Set(self.payment.currency.clone()),
            status: Set(payment::Status::Pending),
            gateway_reference: Set(reference.clone()),
            internal_reference: Set(reference.clone()),
            balance_before: Set(None),
            balance_after: Set(None),
            gateway_response: Set(recipient.raw.to_string()),
            metadata: Set(json!({ "withdrawal_request": request_id }).to_string()),
            description: Set(description.clone()),
            created_at: Set(time),
            updated_at: Set(time),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;
        let record = debit_txn(
            &txn,
            &Change::new(user_id, Kind::Main, amount, Category::Withdrawal, description)
                .reference(format!("WD_{}", reference))
                .payment(id),
        )
        .await?;
        let payment = payment::ActiveModel {
            id: Set(id),
            balance_before: Set(Some(record.balance_before)),
            balance_after: Set(Some(record.balance_after)),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        payment_detail::ActiveModel {
            id: NotSet,
            payment_id: Set(id),
            provider: Set(provider.as_str().to_owned()),
            authorization_url: Set(None),
            access_code: Set(None),
            provider_reference: Set(Some(reference.clone())),
            recipient_code: Set(Some(recipient.code.clone())),
            transfer_code: Set(None),
            bank_code: Set(Some(bank_code.to_owned())),
            account_number: Set(Some(account.account_number.clone())),
            account_name: Set(Some(account.account_name.clone())),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        if let Some(request_id) = request_id {
            withdrawal::ActiveModel {
                id: Set(request_id),
                payment_id: Set(Some(id)),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }
        txn.commit().await?;

        let transfer = gateway
            .transfer(&TransferRequest {
                reference: reference.clone(),
                amount,
                currency: self.payment.currency.clone(),
                recipient_code: recipient.code,
                bank_code: bank_code.to_owned(),
                account_number: account.account_number,
                narration: payment.description.clone(),
            })
            .await;

        let transfer = match transfer {
            Ok(transfer) => transfer,
            Err(err) => {
                warn!(%reference, error = %err, "transfer initiation failed");
                self.fail_withdrawal(&payment, &json!({"error": err.to_string()}))
                    .await?;
                return Err(err.into());
            }
        };

        payment_detail::Entity::update_many()
            .set(payment_detail::ActiveModel {
                transfer_code: Set(transfer.transfer_code.clone()),
                updated_at: Set(now() as i64),
                ..Default::default()
            })
            .filter(payment_detail::Column::PaymentId.eq(id))
            .exec(self.db())
            .await?;

        match transfer.status {
            TransferStatus::Success => {
                self.complete_withdrawal(&payment, &transfer.raw).await?;
            }
            TransferStatus::Failed | TransferStatus::Reversed => {
                self.fail_withdrawal(&payment, &transfer.raw).await?;
            }
            TransferStatus::Pending => {
                payment::ActiveModel {
                    id: Set(id),
                    gateway_response: Set(transfer.raw.to_string()),
                    ..Default::default()
                }
                .update(self.db())
                .await?;
            }
        }
        info!(%reference, amount, gateway = %provider, "withdrawal initiated");

        self.get_payment(id)
            .await?
            .ok_or(Error::NotFound("Payment"))
    }

    /// Fail a pending withdrawal and refund the wallet once.
    pub async fn fail_withdrawal(&self, payment: &payment::Model, response: &Value) -> Result<bool> {
        let txn = self.db().begin().await?;
        if !finish_txn(&txn, payment, payment::Status::Failed, response).await? {
            return Ok(false);
        }
        credit_txn(
            &txn,
            &Change::new(
                payment.user_id,
                Kind::Main,
                payment.amount,
                Category::Refund,
                format!("Refund of failed withdrawal {}", payment.internal_reference),
            )
            .reference(format!("REFUND_{}", payment.internal_reference))
            .payment(payment.id),
        )
        .await?;
        set_request_status(&txn, payment.id, withdrawal::Status::Failed).await?;
        txn.commit().await?;
        warn!(
            reference = %payment.internal_reference,
            amount = payment.amount,
            "withdrawal failed, wallet refunded"
        );
        Ok(true)
    }

    pub async fn complete_withdrawal(
        &self,
        payment: &payment::Model,
        response: &Value,
    ) -> Result<bool> {
        let txn = self.db().begin().await?;
        if !finish_txn(&txn, payment, payment::Status::Success, response).await? {
            return Ok(false);
        }
        set_request_status(&txn, payment.id, withdrawal::Status::Completed).await?;
        txn.commit().await?;
        info!(reference = %payment.internal_reference, "withdrawal completed");
        Ok(true)
    }

    pub async fn banks(&self, provider: Option<Provider>) -> Result<Vec<Bank>> {
        let (_, gateway) = self.gateway(provider)?;
        Ok(gateway.list_banks().await?)
    }

    pub async fn verify_account(
        &self,
        account_number: &str,
        bank_code: &str,
        provider: Option<Provider>,
    ) -> Result<ResolvedAccount> {
        if account_number.len() != 10 || !account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid("Account number must be 10 digits"));
        }
        let (_, gateway) = self.gateway(provider)?;
        Ok(gateway.resolve_account(account_number, bank_code).await?)
    }

    pub async fn transactions(&self, user_id: i32, page: Page) -> Result<Vec<payment::Model>> {
        Ok(payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::CreatedAt)
            .paginate(self.db(), page.size())
            .fetch_page(page.index())
            .await?)
    }

    /// a payment owned by the user
    pub async fn transaction(&self, user_id: i32, id: Uuid) -> Result<payment::Model> {
        match self.get_payment(id).await? {
            Some(p) if p.user_id == user_id => Ok(p),
            _ => Err(Error::NotFound("Transaction")),
        }
    }
}
