//! Paystack rest api client.
//! https://paystack.com/docs/api/

use crate::{
    api_error,
    gateway::*,
    read_json, signature, str_field, Error, Result,
};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

pub const BASE_URL: &str = "https://api.paystack.co";

#[derive(Debug, Clone)]
pub struct Paystack {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl Paystack {
    pub fn new(secret_key: String, base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
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
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.secret_key)
    }

    fn post(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.secret_key)
            .json(body)
    }

    /// send the request and unwrap the `data` field of a successful response
    async fn call(&self, req: RequestBuilder) -> Result<Value> {
        let (status, body) = read_json(req.send().await?).await?;
        if (200..300).contains(&status) && body["status"].as_bool() == Some(true) {
            Ok(body.get("data").cloned().unwrap_or(Value::Null))
        } else {
            Err(api_error(status, &body))
        }
    }
}

fn payment_status(s: &str) -> PaymentStatus {
    match s {
        "success" => PaymentStatus::Success,
        "failed" | "reversed" => PaymentStatus::Failed,
        "abandoned" => PaymentStatus::Abandoned,
        _ => PaymentStatus::Pending,
    }
}

fn transfer_status(s: &str) -> TransferStatus {
    match s {
        "success" => TransferStatus::Success,
        "failed" => TransferStatus::Failed,
        "reversed" => TransferStatus::Reversed,
        _ => TransferStatus::Pending,
    }
}

fn transfer_from(data: Value, reference: &str) -> Transfer {
    Transfer {
        reference: str_field(&data, "reference").unwrap_or_else(|| reference.to_owned()),
        transfer_code: str_field(&data, "transfer_code"),
        status: transfer_status(data["status"].as_str().unwrap_or_default()),
        raw: data,
    }
}

#[async_trait::async_trait]
impl Gateway for Paystack {
    fn provider(&self) -> Provider {
        Provider::Paystack
    }

    async fn initialize(&self, req: &CheckoutRequest) -> Result<Checkout> {
        let mut body = json!({
            "email": req.email,
            "amount": req.amount,
            "currency": req.currency,
            "reference": req.reference,
            "metadata": req.metadata,
        });
        if let Some(url) = &req.callback_url {
            body["callback_url"] = json!(url);
        }
        let data = self.call(self.post("/transaction/initialize", &body)).await?;
        let authorization_url = str_field(&data, "authorization_url")
            .ok_or_else(|| Error::Invalid("missing authorization_url".to_owned()))?;
        Ok(Checkout {
            authorization_url,
            access_code: str_field(&data, "access_code"),
            reference: str_field(&data, "reference").unwrap_or_else(|| req.reference.clone()),
            raw: data,
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification> {
        let data = self
            .call(self.get(&format!("/transaction/verify/{}", reference)))
            .await?;
        Ok(Verification {
            reference: reference.to_owned(),
            status: payment_status(data["status"].as_str().unwrap_or_default()),
            amount: data["amount"].as_i64(),
            currency: str_field(&data, "currency"),
            raw: data,
        })
    }

    async fn list_banks(&self) -> Result<Vec<Bank>> {
        let data = self.call(self.get("/bank?country=nigeria")).await?;
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
            .get("/bank/resolve")
            .query(&[("account_number", account_number), ("bank_code", bank_code)]);
        let data = self.call(req).await?;
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
            "type": "nuban",
            "name": req.name,
            "account_number": req.account_number,
            "bank_code": req.bank_code,
            "currency": req.currency,
        });
        let data = self.call(self.post("/transferrecipient", &body)).await?;
        let code = str_field(&data, "recipient_code")
            .ok_or_else(|| Error::Invalid("missing recipient_code".to_owned()))?;
        Ok(Recipient { code, raw: data })
    }

    async fn transfer(&self, req: &TransferRequest) -> Result<Transfer> {
        let body = json!({
            "source": "balance",
            "amount": req.amount,
            "recipient": req.recipient_code,
            "reason": req.narration,
            "reference": req.reference,
            "currency": req.currency,
        });
        let data = self.call(self.post("/transfer", &body)).await?;
        Ok(transfer_from(data, &req.reference))
    }

    async fn verify_transfer(
        &self,
        reference: &str,
        _transfer_code: Option<&str>,
    ) -> Result<Transfer> {
        let data = self
            .call(self.get(&format!("/transfer/verify/{}", reference)))
            .await?;
        Ok(transfer_from(data, reference))
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        signature::verify_hmac_sha512(self.secret_key.as_bytes(), body, signature)
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent> {
        let raw: Value = serde_json::from_slice(body)?;
        let event = raw["event"].as_str().unwrap_or_default().to_owned();
        let data = &raw["data"];
        let kind = match event.as_str() {
            "charge.success" => EventKind::ChargeSuccess,
            "transfer.success" => EventKind::TransferSuccess,
            "transfer.failed" | "transfer.reversed" => EventKind::TransferFailed,
            _ => EventKind::Other,
        };
        Ok(WebhookEvent {
            reference: str_field(data, "reference"),
            amount: data["amount"].as_i64(),
            kind,
            event,
            raw,
        })
    }
}
