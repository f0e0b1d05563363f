//! Flutterwave v3 rest api client.
//! https://developer.flutterwave.com/reference

use crate::{api_error, gateway::*, read_json, signature, str_field, Error, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

pub const BASE_URL: &str = "https://api.flutterwave.com/v3";

/// keys carrying our reference in charge payloads, in lookup order
const CHARGE_REFERENCE_KEYS: [&str; 6] = ["tx_ref", "txRef", "reference", "flw_ref", "flwRef", "orderRef"];
const TRANSFER_REFERENCE_KEYS: [&str; 3] = ["reference", "tx_ref", "txRef"];

#[derive(Debug, Clone)]
pub struct Flutterwave {
    client: Client,
    base_url: String,
    secret_key: String,
    /// the `verif-hash` value configured on the dashboard
    secret_hash: String,
}

impl Flutterwave {
    pub fn new(
        secret_key: String,
        secret_hash: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url
                .unwrap_or_else(|| BASE_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            secret_key,
            secret_hash,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
    }

    fn post(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .json(body)
    }

    async fn call(&self, req: RequestBuilder) -> Result<Value> {
        let (status, body) = read_json(req.send().await?).await?;
        if (200..300).contains(&status) && body["status"].as_str() == Some("success") {
            Ok(body.get("data").cloned().unwrap_or(Value::Null))
        } else {
            Err(api_error(status, &body))
        }
    }
}

fn payment_status(s: &str) -> PaymentStatus {
    match s.to_ascii_lowercase().as_str() {
        "successful" | "success" => PaymentStatus::Success,
        "failed" | "cancelled" => PaymentStatus::Failed,
        "abandoned" => PaymentStatus::Abandoned,
        _ => PaymentStatus::Pending,
    }
}

fn transfer_status(s: &str) -> TransferStatus {
    match s.to_ascii_uppercase().as_str() {
        "SUCCESSFUL" | "SUCCESS" => TransferStatus::Success,
        "FAILED" | "CANCELLED" => TransferStatus::Failed,
        "REVERSED" => TransferStatus::Reversed,
        _ => TransferStatus::Pending,
    }
}

fn transfer_from(data: Value, reference: &str) -> Transfer {
    Transfer {
        reference: str_field(&data, "reference").unwrap_or_else(|| reference.to_owned()),
        transfer_code: str_field(&data, "id"),
        status: transfer_status(data["status"].as_str().unwrap_or_default()),
        raw: data,
    }
}

fn first_reference(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| str_field(data, k))
}

#[async_trait::async_trait]
impl Gateway for Flutterwave {
    fn provider(&self) -> Provider {
        Provider::Flutterwave
    }

    async fn initialize(&self, req: &CheckoutRequest) -> Result<Checkout> {
        let body = json!({
            "tx_ref": req.reference,
            "amount": format_major(req.amount),
            "currency": req.currency,
            "redirect_url": req.callback_url,
            "customer": {
                "email": req.email,
                "name": req.name,
            },
            "customizations": {
                "title": req.description,
            },
            "meta": req.metadata,
        });
        let data = self.call(self.post("/payments", &body)).await?;
        let link = str_field(&data, "link")
            .ok_or_else(|| Error::Invalid("missing payment link".to_owned()))?;
        Ok(Checkout {
            authorization_url: link,
            access_code: None,
            reference: req.reference.clone(),
            raw: data,
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification> {
        let req = self
            .get("/transactions/verify_by_reference")
            .query(&[("tx_ref", reference)]);
        let data = self.call(req).await?;
        Ok(Verification {
            reference: reference.to_owned(),
            status: payment_status(data["status"].as_str().unwrap_or_default()),
            amount: to_minor(&data["amount"]),
            currency: str_field(&data, "currency"),
            raw: data,
        })
    }

    async fn list_banks(&self) -> Result<Vec<Bank>> {
        let data = self.call(self.get("/banks/NG")).await?;
        Ok(data
            .as_array()
            .map(|banks| {
                banks
                    .iter()
                    .filter_map(|b| {
                        Some(Bank {
                            name: str_field(b, "name")?,
                            code: str_field(b, "code")?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount> {
        let body = json!({
            "account_number": account_number,
            "account_bank": bank_code,
        });
        let data = self.call(self.post("/accounts/resolve", &body)).await?;
        Ok(ResolvedAccount {
            account_number: str_field(&data, "account_number")
                .unwrap_or_else(|| account_number.to_owned()),
            account_name: str_field(&data, "account_name")
                .ok_or_else(|| Error::Invalid("missing account_name".to_owned()))?,
            bank_code: bank_code.to_owned(),
        })
    }

    async fn create_recipient(&self, req: &RecipientRequest) -> Result<Recipient> {
        let body = json!({
            "account_bank": req.bank_code,
            "account_number": req.account_number,
            "beneficiary_name": req.name,
            "currency": req.currency,
        });
        let data = self.call(self.post("/beneficiaries", &body)).await?;
        let code =
            str_field(&data, "id").ok_or_else(|| Error::Invalid("missing beneficiary id".to_owned()))?;
        Ok(Recipient { code, raw: data })
    }

    async fn transfer(&self, req: &TransferRequest) -> Result<Transfer> {
        let body = json!({
            "account_bank": req.bank_code,
            "account_number": req.account_number,
            "amount": to_major(req.amount),
            "narration": req.narration,
            "currency": req.currency,
            "debit_currency": req.currency,
            "reference": req.reference,
        });
        let data = self.call(self.post("/transfers", &body)).await?;
        Ok(transfer_from(data, &req.reference))
    }

    async fn verify_transfer(
        &self,
        reference: &str,
        transfer_code: Option<&str>,
    ) -> Result<Transfer> {
        let id = transfer_code.ok_or(Error::Unsupported("transfer lookup requires the transfer id"))?;
        let data = self.call(self.get(&format!("/transfers/{}", id))).await?;
        Ok(transfer_from(data, reference))
    }

    fn verify_webhook(&self, _body: &[u8], signature: &str) -> bool {
        signature::verify_shared_secret(self.secret_hash.as_bytes(), signature.trim().as_bytes())
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent> {
        let raw: Value = serde_json::from_slice(body)?;
        let event = raw["event"]
            .as_str()
            .or_else(|| raw["event.type"].as_str())
            .unwrap_or_default()
            .to_owned();
        let data = if raw["data"].is_object() { &raw["data"] } else { &raw };
        let status = data["status"].as_str().unwrap_or_default();

        let kind = match event.as_str() {
            "charge.completed" | "BANK_TRANSFER_TRANSACTION"
                if payment_status(status) == PaymentStatus::Success =>
            {
                EventKind::ChargeSuccess
            }
            "transfer.completed" => match transfer_status(status) {
                TransferStatus::Success => EventKind::TransferSuccess,
                TransferStatus::Failed | TransferStatus::Reversed => EventKind::TransferFailed,
                TransferStatus::Pending => EventKind::Other,
            },
            _ => EventKind::Other,
        };

        let reference = match kind {
            EventKind::TransferSuccess | EventKind::TransferFailed => {
                first_reference(data, &TRANSFER_REFERENCE_KEYS)
            }
            _ => first_reference(data, &CHARGE_REFERENCE_KEYS),
        };

        Ok(WebhookEvent {
            amount: to_minor(&data["amount"]),
            reference,
            kind,
            event,
            raw,
        })
    }
}
