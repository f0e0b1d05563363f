use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    #[error("gateway api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("{0}")]
    Message(String),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl Error {
    /// the provider has no record of the requested resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    pub fn from<E>(cause: E) -> Self
    where
        E: std::error::Error,
    {
        Self::Message(cause.to_string())
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub mod gateway;
pub use gateway::*;

pub mod signature;

pub mod paystack;
pub use paystack::Paystack;

pub mod flutterwave;
pub use flutterwave::Flutterwave;

pub mod monnify;
pub use monnify::Monnify;

/// Read the response body as json, an empty body becomes `Value::Null`.
pub(crate) async fn read_json(res: reqwest::Response) -> Result<(u16, Value)> {
    let status = res.status().as_u16();
    let text = res.text().await?;
    if text.trim().is_empty() {
        return Ok((status, Value::Null));
    }
    match serde_json::from_str(&text) {
        Ok(body) => Ok((status, body)),
        Err(_) => Err(Error::Api {
            status,
            message: text.chars().take(200).collect(),
        }),
    }
}

pub(crate) fn api_error(status: u16, body: &Value) -> Error {
    let message = body
        .get("message")
        .or_else(|| body.get("responseMessage"))
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_owned();
    Error::Api { status, message }
}

pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
