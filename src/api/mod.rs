//! http api

use crate::{AppState, Error};
use actix_web::{get, web, HttpRequest, Responder};
use serde_json::json;

pub mod chat;
pub mod payments;
pub mod referrals;
pub mod subscriptions;
pub mod tasks;
pub mod users;
pub mod wallets;

pub const CARGO_PKG_VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn version() -> String {
    CARGO_PKG_VERSION.map(ToOwned::to_owned).unwrap_or_default()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(info)
        .service(web::scope("/users").configure(users::configure))
        .service(web::scope("/wallets").configure(wallets::configure))
        .service(web::scope("/payments").configure(payments::configure))
        .service(web::scope("/tasks").configure(tasks::configure))
        .service(web::scope("/subscriptions").configure(subscriptions::configure))
        .service(web::scope("/referrals").configure(referrals::configure))
        .service(web::scope("/chat").configure(chat::configure));
}

/// peer address for login records
pub(crate) fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or_default()
        .to_owned()
}

#[get("/info")]
pub async fn info(state: web::Data<AppState>) -> Result<impl Responder, Error> {
    let payment = state.service.payment_setting();
    Ok(web::Json(json!({
        "version": version(),
        "gateways": state.service.providers(),
        "default_gateway": payment.default_gateway,
        "currency": payment.currency,
        "min_amount": payment.min_amount,
        "max_amount": payment.max_amount,
        "min_withdrawal": payment.min_withdrawal,
    })))
}
