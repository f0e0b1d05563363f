//! Business logic over the database and payment gateways.

use crate::{setting::Setting, Error, Result};
use payment_gateway::{Gateway, Provider};
use rand::{distributions::Alphanumeric, Rng, RngCore};
use sea_orm::DbConn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod chat;
mod payment;
mod reconcile;
mod referral;
mod subscription;
mod task;
mod user;
mod wallet;
mod webhook;

pub use chat::*;
pub use payment::*;
pub use reconcile::*;
pub use referral::*;
pub use subscription::*;
pub use task::*;
pub use user::*;
pub use wallet::*;
pub use webhook::*;

pub type BoxGateway = Box<dyn Gateway + Send + Sync>;

/// Random lowercase hex string of `bytes * 2` chars.
pub fn rand_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Uppercase alphanumeric code.
pub fn rand_code(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

/// Query string pagination, pages start at 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Page {
    pub fn index(&self) -> u64 {
        self.page.max(1) - 1
    }

    pub fn size(&self) -> u64 {
        self.per_page.clamp(1, 100)
    }
}

pub struct Service {
    conn: DbConn,
    gateways: HashMap<Provider, BoxGateway>,
    site: String,
    payment: crate::setting::Payment,
    escrow: crate::setting::Escrow,
    referral: crate::setting::Referral,
}

impl Service {
    pub fn new(conn: DbConn, setting: &Setting) -> Self {
        Self {
            conn,
            gateways: HashMap::new(),
            site: setting.site(),
            payment: setting.payment.clone(),
            escrow: setting.escrow.clone(),
            referral: setting.referral.clone(),
        }
    }

    /// register a gateway client, replacing any client of the same provider
    pub fn add_gateway(&mut self, gateway: BoxGateway) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn db(&self) -> &DbConn {
        &self.conn
    }

    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.gateways.contains_key(p))
            .collect()
    }

    /// gateway client, the configured default when `provider` is none
    pub fn gateway(&self, provider: Option<Provider>) -> Result<(Provider, &BoxGateway)> {
        let provider = provider.unwrap_or(self.payment.default_gateway);
        self.gateways
            .get(&provider)
            .map(|g| (provider, g))
            .ok_or_else(|| Error::invalid(format!("Payment gateway {} is not configured", provider)))
    }

    pub fn callback_url(&self, provider: Provider) -> String {
        let path = match provider {
            Provider::Paystack => "/payments/fund/callback/",
            Provider::Flutterwave => "/payments/flutterwave/callback/",
            Provider::Monnify => "/payments/monnify/callback/",
        };
        format!("{}{}", self.site, path)
    }

    pub fn payment_setting(&self) -> &crate::setting::Payment {
        &self.payment
    }
}
