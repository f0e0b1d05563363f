use crate::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use payment_gateway::Provider;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// number of threads config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Thread {
    /// number of http server threads
    pub http: usize,
}

/// network config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Network {
    /// server bind host
    pub host: String,
    /// server bind port
    pub port: u16,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// auth config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Auth {
    /// jwt secret
    pub secret: String,

    /// jwt access token expiry in seconds
    pub access_token_expiry: usize,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            secret: "test".to_owned(),
            access_token_expiry: 2 * 24 * 60 * 60,
        }
    }
}

/// payment limits, amounts in kobo
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Payment {
    pub default_gateway: Provider,
    pub currency: String,
    pub min_amount: i64,
    pub max_amount: i64,
    pub min_withdrawal: i64,
    /// outbound gateway request timeout in seconds
    pub timeout: u64,
}

impl Default for Payment {
    fn default() -> Self {
        Self {
            default_gateway: Provider::Paystack,
            currency: "NGN".to_owned(),
            min_amount: 10_000,
            max_amount: 5_000_000_000,
            min_withdrawal: 10_000,
            timeout: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Paystack {
    pub secret_key: String,
    pub public_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Flutterwave {
    pub secret_key: String,
    pub public_key: String,
    /// webhook `verif-hash`
    pub secret_hash: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Monnify {
    pub api_key: String,
    pub secret_key: String,
    pub contract_code: String,
    /// wallet account for disbursements
    pub source_account: String,
    pub base_url: Option<String>,
}

/// task escrow release config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Escrow {
    /// company share of each released slot in basis points (0-10000)
    pub company_cut_bps: u32,
    /// account collecting the company share
    pub company_email: String,
}

impl Default for Escrow {
    fn default() -> Self {
        Self {
            company_cut_bps: 2000,
            company_email: "company@taskbox.local".to_owned(),
        }
    }
}

impl Escrow {
    /// split a payout into (member, company)
    pub fn split(&self, amount: i64) -> (i64, i64) {
        let cut = (amount as i128 * self.company_cut_bps as i128 / 10_000) as i64;
        let cut = cut.clamp(0, amount.max(0));
        (amount - cut, cut)
    }
}

/// referral signup bonus in kobo
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Referral {
    pub level1_bonus: i64,
    pub level2_bonus: i64,
}

impl Default for Referral {
    fn default() -> Self {
        Self {
            level1_bonus: 500,
            level2_bonus: 300,
        }
    }
}

impl Referral {
    pub fn bonus(&self, level: i32) -> i64 {
        match level {
            1 => self.level1_bonus,
            2 => self.level2_bonus,
            _ => 0,
        }
    }
}

/// periodic jobs config, durations in seconds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Jobs {
    pub enabled: bool,
    pub interval: u64,
    /// only reconcile payments pending longer than this
    pub pending_age: u64,
    /// ignore payments older than this
    pub lookback: u64,
}

impl Default for Jobs {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 10 * 60,
            pending_age: 10 * 60,
            lookback: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Setting {
    /// database url
    /// https://www.sea-ql.org/SeaORM/docs/install-and-config/connection/
    pub db_url: String,

    /// the public site url, used for gateway callback urls
    pub site: Option<String>,

    pub thread: Thread,
    pub network: Network,
    pub auth: Auth,

    pub payment: Payment,
    pub paystack: Paystack,
    pub flutterwave: Flutterwave,
    pub monnify: Monnify,

    pub escrow: Escrow,
    pub referral: Referral,
    pub jobs: Jobs,
}

impl Default for Setting {
    fn default() -> Self {
        Self {
            db_url: "sqlite://taskbox.sqlite?mode=rwc".to_string(),
            site: None,
            thread: Default::default(),
            network: Default::default(),
            auth: Default::default(),
            payment: Default::default(),
            paystack: Default::default(),
            flutterwave: Default::default(),
            monnify: Default::default(),
            escrow: Default::default(),
            referral: Default::default(),
            jobs: Default::default(),
        }
    }
}

impl Setting {
    pub fn site(&self) -> String {
        self.site
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.network.host, self.network.port))
            .trim_end_matches('/')
            .to_owned()
    }

    /// read config from file and env
    pub fn read<P: AsRef<Path>>(file: P, env_prefix: Option<String>) -> Result<Self> {
        let path = file
            .as_ref()
            .to_str()
            .ok_or_else(|| Error::Message("invalid config path".to_owned()))?;
        let mut config = Config::builder().add_source(File::with_name(path));
        if let Some(prefix) = env_prefix {
            config = config.add_source(Self::env_source(&prefix));
        }

        let config = config.build()?;
        let mut setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    fn env_source(prefix: &str) -> Environment {
        Environment::with_prefix(prefix)
            .try_parsing(true)
            .prefix_separator("_")
            .separator("__")
    }

    /// read config from env
    pub fn from_env(env_prefix: String) -> Result<Self> {
        let config = Config::builder()
            .add_source(Self::env_source(&env_prefix))
            .build()?;
        let mut setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    /// config from str
    pub fn from_str(s: &str, format: FileFormat) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(s, format))
            .build()?;
        let mut setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    fn validate(&mut self) -> Result<()> {
        if self.escrow.company_cut_bps > 10_000 {
            return Err(Error::Str("escrow.company_cut_bps must be between 0 and 10000"));
        }
        if self.auth.secret.trim().is_empty() {
            return Err(Error::Str("auth.secret must not be empty"));
        }
        if self.payment.min_amount <= 0 || self.payment.min_amount > self.payment.max_amount {
            return Err(Error::Str("invalid payment amount limits"));
        }
        self.payment.currency = self.payment.currency.to_uppercase();
        Ok(())
    }
}
