use super::Service;
use crate::{now, Result};
use entity::{payment, record, wallet};
use payment_gateway::{PaymentStatus, TransferStatus};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletDrift {
    pub wallet_id: i32,
    pub user_id: i32,
    pub kind: wallet::Kind,
    pub balance: i64,
    pub ledger: i64,
    pub fixed: bool,
}

impl WalletDrift {
    pub fn drift(&self) -> i64 {
        self.balance - self.ledger
    }
}

enum Outcome {
    Succeeded,
    Failed,
    Unchanged,
}

impl Service {
    /// Re-verify payments pending for longer than `pending_age` seconds,
    /// ignoring those older than `lookback` seconds.
    pub async fn reconcile_payments(&self, pending_age: u64, lookback: u64) -> Result<ReconcileReport> {
        let time = now() as i64;
        let payments = payment::Entity::find()
            .filter(payment::Column::Status.eq(payment::Status::Pending))
            .filter(payment::Column::CreatedAt.lte(time - pending_age as i64))
            .filter(payment::Column::CreatedAt.gte(time - lookback as i64))
            .order_by_asc(payment::Column::CreatedAt)
            .all(self.db())
            .await?;

        let mut report = ReconcileReport::default();
        for payment in payments.iter() {
            report.checked += 1;
            match self.reconcile_one(payment).await {
                Ok(Outcome::Succeeded) => report.succeeded += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(
                        reference = %payment.internal_reference,
                        error = %e,
                        "reconcile payment failed"
                    );
                }
            }
        }
        if report.checked > 0 {
            info!(?report, "payments reconciled");
        }
        Ok(report)
    }

    async fn reconcile_one(&self, payment: &payment::Model) -> Result<Outcome> {
        let provider = self.payment_provider(payment).await?;
        let (_, gateway) = self.gateway(Some(provider))?;
        match payment.r#type {
            payment::Type::Funding => {
                let verification = gateway.verify(&payment.gateway_reference).await?;
                match verification.status {
                    PaymentStatus::Success => {
                        let paid = verification.amount.unwrap_or(payment.amount);
                        Ok(if self.complete_funding(payment, paid, &verification.raw).await? {
                            Outcome::Succeeded
                        } else {
                            Outcome::Unchanged
                        })
                    }
                    PaymentStatus::Failed | PaymentStatus::Abandoned => {
                        Ok(if self.fail_payment(payment, &verification.raw).await? {
                            Outcome::Failed
                        } else {
                            Outcome::Unchanged
                        })
                    }
                    PaymentStatus::Pending => Ok(Outcome::Unchanged),
                }
            }
            payment::Type::Withdrawal => {
                let transfer_code = self
                    .payment_detail(payment.id)
                    .await?
                    .and_then(|d| d.transfer_code);
                let transfer = match gateway
                    .verify_transfer(&payment.gateway_reference, transfer_code.as_deref())
                    .await
                {
                    Ok(transfer) => transfer,
                    // debited but the transfer never reached the provider
                    Err(e) if e.is_not_found() => {
                        warn!(
                            reference = %payment.internal_reference,
                            "transfer unknown to the gateway, refunding"
                        );
                        let response = json!({ "error": e.to_string() });
                        return Ok(if self.fail_withdrawal(payment, &response).await? {
                            Outcome::Failed
                        } else {
                            Outcome::Unchanged
                        });
                    }
                    Err(e) => return Err(e.into()),
                };
                match transfer.status {
                    TransferStatus::Success => {
                        Ok(if self.complete_withdrawal(payment, &transfer.raw).await? {
                            Outcome::Succeeded
                        } else {
                            Outcome::Unchanged
                        })
                    }
                    TransferStatus::Failed | TransferStatus::Reversed => {
                        Ok(if self.fail_withdrawal(payment, &transfer.raw).await? {
                            Outcome::Failed
                        } else {
                            Outcome::Unchanged
                        })
                    }
                    TransferStatus::Pending => Ok(Outcome::Unchanged),
                }
            }
        }
    }

    /// Compare every wallet balance with the sum of its ledger.
    /// With `fix` the balance is reset to the ledger sum.
    pub async fn audit_wallets(&self, fix: bool) -> Result<Vec<WalletDrift>> {
        let wallets = wallet::Entity::find()
            .order_by_asc(wallet::Column::Id)
            .all(self.db())
            .await?;
        let mut drifts = vec![];
        for w in wallets {
            let ledger: i64 = record::Entity::find()
                .filter(record::Column::WalletId.eq(w.id))
                .all(self.db())
                .await?
                .iter()
                .map(|r| r.change())
                .sum();
            if ledger == w.balance {
                continue;
            }
            let mut drift = WalletDrift {
                wallet_id: w.id,
                user_id: w.user_id,
                kind: w.kind,
                balance: w.balance,
                ledger,
                fixed: false,
            };
            warn!(
                wallet_id = w.id,
                user_id = w.user_id,
                balance = w.balance,
                ledger,
                drift = drift.drift(),
                "wallet balance drift"
            );
            if fix {
                let res = wallet::Entity::update_many()
                    .set(wallet::ActiveModel {
                        balance: Set(ledger),
                        updated_at: Set(now() as i64),
                        ..Default::default()
                    })
                    .filter(wallet::Column::Id.eq(w.id))
                    .filter(wallet::Column::Balance.eq(w.balance))
                    .exec(self.db())
                    .await?;
                drift.fixed = res.rows_affected == 1;
                if drift.fixed {
                    info!(wallet_id = w.id, from = w.balance, to = ledger, "wallet balance fixed");
                }
            }
            drifts.push(drift);
        }
        Ok(drifts)
    }

    /// One pass of every periodic job, failures are logged and skipped.
    pub async fn run_jobs(&self, pending_age: u64, lookback: u64) {
        if let Err(e) = self.reconcile_payments(pending_age, lookback).await {
            error!(error = %e, "reconcile job failed");
        }
        match self.audit_wallets(false).await {
            Ok(drifts) if !drifts.is_empty() => {
                warn!(count = drifts.len(), "wallet audit found drift");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "wallet audit job failed"),
        }
        match self.renew_subscriptions().await {
            Ok(report) if report.renewed + report.expired > 0 => {
                info!(?report, "subscriptions renewed");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "subscription renewal job failed"),
        }
    }
}
