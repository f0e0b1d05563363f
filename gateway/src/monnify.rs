//! Monnify rest api client.
//! https://developers.monnify.com/api

use crate::{api_error, gateway::*, read_json, signature, str_field, Error, Result};
use base64::engine::{general_purpose, Engine};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const BASE_URL: &str = "https://api.monnify.com";

#[derive(Debug)]
pub struct Monnify {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
    contract_code: String,
    source_account: String,
    /// cached bearer token and its expiry
    token: Mutex<Option<(String, Instant)>>,
}

impl Monnify {
    pub fn new(
        api_key: String,
        secret_key: String,
        contract_code: String,
        source_account: String,
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
            api_key,
            secret_key,
            contract_code,
            source_account,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some((t, expiry)) = token.as_ref() {
            if Instant::now() < *expiry {
                return Ok(t.clone());
            }
        }
        let basic = general_purpose::STANDARD.encode(format!("{}:{}", self.api_key, self.secret_key));
        let req = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic));
        let body = check(req).await?;
        let access = str_field(&body, "accessToken")
            .ok_or_else(|| Error::Invalid("missing accessToken".to_owned()))?;
        // refresh a minute early
        let ttl = body["expiresIn"].as_u64().unwrap_or(300).saturating_sub(60);
        debug!(ttl, "monnify token refreshed");
        *token = Some((access.clone(), Instant::now() + Duration::from_secs(ttl)));
        Ok(access)
    }

    async fn get(&self, path: &str) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self.client.get(self.url(path)).bearer_auth(token))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self.client.post(self.url(path)).bearer_auth(token).json(body))
    }
}

/// unwrap `responseBody` of a successful response
async fn check(req: RequestBuilder) -> Result<Value> {
    let (status, body) = read_json(req.send().await?).await?;
    if (200..300).contains(&status) && body["requestSuccessful"].as_bool() == Some(true) {
        Ok(body.get("responseBody").cloned().unwrap_or(Value::Null))
    } else {
        Err(api_error(status, &body))
    }
}

fn payment_status(s: &str) -> PaymentStatus {
    match s {
        "PAID" | "OVERPAID" => PaymentStatus::Success,
        "FAILED" | "CANCELLED" | "REVERSED" => PaymentStatus::Failed,
        "EXPIRED" | "ABANDONED" => PaymentStatus::Abandoned,
        _ => PaymentStatus::Pending,
    }
}

fn transfer_status(s: &str) -> TransferStatus {
    match s {
        "SUCCESS" | "SUCCESSFUL" | "COMPLETED" => TransferStatus::Success,
        "FAILED" | "EXPIRED" => TransferStatus::Failed,
        "REVERSED" => TransferStatus::Reversed,
        _ => TransferStatus::Pending,
    }
}

fn transfer_from(data: Value, reference: &str) -> Transfer {
    Transfer {
        reference: str_field(&data, "reference").unwrap_or_else(|| reference.to_owned()),
        transfer_code: str_field(&data, "transactionReference"),
        status: transfer_status(data["status"].as_str().unwrap_or_default()),
        raw: data,
    }
}

#[async_trait::async_trait]
impl Gateway for Monnify {
    fn provider(&self) -> Provider {
        Provider::Monnify
    }

    async fn initialize(&self, req: &CheckoutRequest) -> Result<Checkout> {
        let body = json!({
            "amount": to_major(req.amount),
            "customerName": req.name,
            "customerEmail": req.email,
            "paymentReference": req.reference,
            "paymentDescription": req.description,
            "currencyCode": req.currency,
            "contractCode": self.contract_code,
            "redirectUrl": req.callback_url,
            "paymentMethods": ["CARD", "ACCOUNT_TRANSFER"],
            "metaData": req.metadata,
        });
        let req_builder = self
            .post("/api/v1/merchant/transactions/init-transaction", &body)
            .await?;
        let data = check(req_builder).await?;
        let url = str_field(&data, "checkoutUrl")
            .ok_or_else(|| Error::Invalid("missing checkoutUrl".to_owned()))?;
        Ok(Checkout {
            authorization_url: url,
            access_code: str_field(&data, "transactionReference"),
            reference: req.reference.clone(),
            raw: data,
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification> {
        let req = self
            .get("/api/v2/merchant/transactions/query")
            .await?
            .query(&[("paymentReference", reference)]);
        let data = check(req).await?;
        Ok(Verification {
            reference: reference.to_owned(),
            status: payment_status(data["paymentStatus"].as_str().unwrap_or_default()),
            amount: to_minor(&data["amountPaid"]),
            currency: str_field(&data, "currencyCode"),
            raw: data,
        })
    }

    async fn list_banks(&self) -> Result<Vec<Bank>> {
        let data = check(self.get("/api/v1/banks").await?).await?;
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
        let req = self
            .get("/api/v1/disbursements/account/validate")
            .await?
            .query(&[("accountNumber", account_number), ("bankCode", bank_code)]);
        let data = check(req).await?;
        Ok(ResolvedAccount {
            account_number: str_field(&data, "accountNumber")
                .unwrap_or_else(|| account_number.to_owned()),
            account_name: str_field(&data, "accountName")
                .ok_or_else(|| Error::Invalid("missing accountName".to_owned()))?,
            bank_code: bank_code.to_owned(),
        })
    }

    async fn create_recipient(&self, req: &RecipientRequest) -> Result<Recipient> {
        // disbursements address the account directly
        Ok(Recipient {
            code: format!("{}:{}", req.bank_code, req.account_number),
            raw: Value::Null,
        })
    }

    async fn transfer(&self, req: &TransferRequest) -> Result<Transfer> {
        let body = json!({
            "amount": to_major(req.amount),
            "reference": req.reference,
            "narration": req.narration,
            "destinationBankCode": req.bank_code,
            "destinationAccountNumber": req.account_number,
            "currency": req.currency,
            "sourceAccountNumber": self.source_account,
        });
        let data = check(self.post("/api/v2/disbursements/single", &body).await?).await?;
        Ok(transfer_from(data, &req.reference))
    }

    async fn verify_transfer(
        &self,
        reference: &str,
        _transfer_code: Option<&str>,
    ) -> Result<Transfer> {
        let req = self
            .get("/api/v2/disbursements/single/summary")
            .await?
            .query(&[("reference", reference)]);
        let data = check(req).await?;
        Ok(transfer_from(data, reference))
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        signature::verify_hmac_sha512(self.secret_key.as_bytes(), body, signature)
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent> {
        let raw: Value = serde_json::from_slice(body)?;
        let event = raw["eventType"].as_str().unwrap_or_default().to_owned();
        let data = &raw["eventData"];
        let (kind, reference, amount) = match event.as_str() {
            "SUCCESSFUL_TRANSACTION" => (
                EventKind::ChargeSuccess,
                str_field(data, "paymentReference"),
                to_minor(&data["amountPaid"]),
            ),
            "SUCCESSFUL_DISBURSEMENT" => (
                EventKind::TransferSuccess,
                str_field(data, "reference"),
                to_minor(&data["amount"]),
            ),
            "FAILED_DISBURSEMENT" | "REVERSED_DISBURSEMENT" => (
                EventKind::TransferFailed,
                str_field(data, "reference"),
                to_minor(&data["amount"]),
            ),
            _ => (
                EventKind::Other,
                str_field(data, "paymentReference").or_else(|| str_field(data, "reference")),
                None,
            ),
        };
        Ok(WebhookEvent {
            event,
            kind,
            reference,
            amount,
            raw,
        })
    }
}
