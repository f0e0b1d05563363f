use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Paystack,
    Flutterwave,
    Monnify,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Paystack, Provider::Flutterwave, Provider::Monnify];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Paystack => "paystack",
            Provider::Flutterwave => "flutterwave",
            Provider::Monnify => "monnify",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Paystack => "Paystack",
            Provider::Flutterwave => "Flutterwave",
            Provider::Monnify => "Monnify",
        }
    }

    /// prefix of locally generated payment references
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            Provider::Paystack => "PS",
            Provider::Flutterwave => "FLW",
            Provider::Monnify => "MNFY",
        }
    }

    /// http header carrying the webhook signature
    pub fn signature_header(&self) -> &'static str {
        match self {
            Provider::Paystack => "x-paystack-signature",
            Provider::Flutterwave => "verif-hash",
            Provider::Monnify => "monnify-signature",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paystack" => Ok(Provider::Paystack),
            "flutterwave" => Ok(Provider::Flutterwave),
            "monnify" => Ok(Provider::Monnify),
            _ => Err(Error::Invalid(format!("unknown gateway {}", s))),
        }
    }
}

/// Checkout request, amount in minor units (kobo).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckoutRequest {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub email: String,
    pub name: String,
    pub description: String,
    pub callback_url: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub authorization_url: String,
    pub access_code: Option<String>,
    /// provider side reference
    pub reference: String,
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub reference: String,
    pub status: PaymentStatus,
    /// paid amount in minor units
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientRequest {
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub code: String,
    pub raw: Value,
}

/// Transfer request, amount in minor units (kobo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub recipient_code: String,
    pub bank_code: String,
    pub account_number: String,
    pub narration: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Success,
    Failed,
    Reversed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub reference: String,
    pub transfer_code: Option<String>,
    pub status: TransferStatus,
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ChargeSuccess,
    TransferSuccess,
    TransferFailed,
    Other,
}

/// Webhook payload normalized across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// provider event name, e.g. `charge.success`
    pub event: String,
    pub kind: EventKind,
    pub reference: Option<String>,
    pub amount: Option<i64>,
    pub raw: Value,
}

/// the payment gateway trait for multiple providers
#[async_trait::async_trait]
pub trait Gateway {
    fn provider(&self) -> Provider;

    async fn initialize(&self, req: &CheckoutRequest) -> Result<Checkout>;

    async fn verify(&self, reference: &str) -> Result<Verification>;

    async fn list_banks(&self) -> Result<Vec<Bank>>;

    async fn resolve_account(&self, account_number: &str, bank_code: &str)
        -> Result<ResolvedAccount>;

    async fn create_recipient(&self, req: &RecipientRequest) -> Result<Recipient>;

    async fn transfer(&self, req: &TransferRequest) -> Result<Transfer>;

    async fn verify_transfer(&self, reference: &str, transfer_code: Option<&str>)
        -> Result<Transfer>;

    /// check the signature header against the raw body
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent>;
}

/// Parse a major unit amount (`5000`, `5000.5`, `"5,000.25"`) into minor units.
pub fn to_minor(value: &Value) -> Option<i64> {
    let s = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.replace(',', ""),
        _ => return None,
    };
    let s = s.trim();
    let (neg, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (int, frac) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    let int: i64 = if int.is_empty() { 0 } else { int.parse().ok()? };
    let mut frac_digits: String = frac.chars().take(2).collect();
    while frac_digits.len() < 2 {
        frac_digits.push('0');
    }
    let frac: i64 = frac_digits.parse().ok()?;
    let minor = int.checked_mul(100)?.checked_add(frac)?;
    Some(if neg { -minor } else { minor })
}

/// Minor units to a major unit json number.
pub fn to_major(minor: i64) -> Value {
    if minor % 100 == 0 {
        Value::from(minor / 100)
    } else {
        Value::from(minor as f64 / 100.0)
    }
}

/// Minor units to a fixed two decimal string, `123456` -> `"1234.56"`.
pub fn format_major(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
