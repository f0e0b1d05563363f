use crate::{
    auth::{AdminUser, AuthedUser},
    service::{Page, WebhookError},
    AppState, Error,
};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use payment_gateway::Provider;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(initiate_funding)
        .service(fund_callback)
        .service(flutterwave_callback)
        .service(monnify_callback)
        .service(withdraw)
        .service(banks)
        .service(verify_account)
        .service(monnify_banks)
        .service(monnify_verify_account)
        .service(paystack_webhook)
        .service(flutterwave_webhook)
        .service(monnify_webhook)
        .service(transactions)
        .service(transaction)
        .service(gateway_active);
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FundReq {
    amount: i64,
    gateway: Option<Provider>,
}

#[post("/fund/initiate/")]
pub async fn initiate_funding(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<FundReq>,
) -> Result<impl Responder, Error> {
    let funding = state
        .service
        .initiate_funding(&authed.user, data.amount, data.gateway)
        .await?;
    Ok(web::Json(json!({
        "success": true,
        "payment_id": funding.payment_id,
        "reference": funding.reference,
        "authorization_url": funding.authorization_url,
        "access_code": funding.access_code,
        "gateway": funding.gateway,
    })))
}

/// reference keys used by the gateways on the checkout redirect
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CallbackQuery {
    reference: Option<String>,
    trxref: Option<String>,
    tx_ref: Option<String>,
    #[serde(rename = "paymentReference")]
    payment_reference: Option<String>,
}

impl CallbackQuery {
    fn reference(&self) -> Option<&str> {
        [
            &self.reference,
            &self.trxref,
            &self.tx_ref,
            &self.payment_reference,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.as_str())
        .find(|s| !s.is_empty())
    }
}

async fn callback(
    state: &AppState,
    authed: &AuthedUser,
    query: &CallbackQuery,
) -> Result<HttpResponse, Error> {
    let reference = query
        .reference()
        .ok_or_else(|| Error::invalid("No reference provided"))?;
    let (payment, verification) = state
        .service
        .payment_callback(authed.user.id, reference)
        .await?;
    // refresh, a webhook may have landed in the meantime
    let payment = state
        .service
        .get_payment(payment.id)
        .await?
        .unwrap_or(payment);
    Ok(HttpResponse::Ok().json(json!({
        "payment_id": payment.id,
        "reference": payment.internal_reference,
        "status": payment.status,
        "amount": payment.amount,
        "gateway_status": verification.status,
        "gateway_amount": verification.amount,
    })))
}

#[get("/fund/callback/")]
pub async fn fund_callback(
    state: web::Data<AppState>,
    authed: AuthedUser,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, Error> {
    callback(&state, &authed, &query).await
}

#[get("/flutterwave/callback/")]
pub async fn flutterwave_callback(
    state: web::Data<AppState>,
    authed: AuthedUser,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, Error> {
    callback(&state, &authed, &query).await
}

#[get("/monnify/callback/")]
pub async fn monnify_callback(
    state: web::Data<AppState>,
    authed: AuthedUser,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, Error> {
    callback(&state, &authed, &query).await
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WithdrawReq {
    amount: i64,
    bank_code: String,
    account_number: String,
    gateway: Option<Provider>,
}

#[post("/withdraw/")]
pub async fn withdraw(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<WithdrawReq>,
) -> Result<impl Responder, Error> {
    let payment = state
        .service
        .withdraw(
            authed.user.id,
            data.amount,
            &data.bank_code,
            &data.account_number,
            data.gateway,
            None,
        )
        .await?;
    Ok(web::Json(json!({
        "success": true,
        "payment": payment,
    })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayQuery {
    gateway: Option<Provider>,
}

#[get("/banks/")]
pub async fn banks(
    state: web::Data<AppState>,
    _authed: AuthedUser,
    query: web::Query<GatewayQuery>,
) -> Result<impl Responder, Error> {
    let list = state.service.banks(query.gateway).await?;
    Ok(web::Json(json!({ "banks": list })))
}

#[get("/monnify/banks/")]
pub async fn monnify_banks(
    state: web::Data<AppState>,
    _authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let list = state.service.banks(Some(Provider::Monnify)).await?;
    Ok(web::Json(json!({ "banks": list })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VerifyAccountReq {
    account_number: String,
    bank_code: String,
    gateway: Option<Provider>,
}

#[post("/verify-account/")]
pub async fn verify_account(
    state: web::Data<AppState>,
    _authed: AuthedUser,
    data: web::Json<VerifyAccountReq>,
) -> Result<impl Responder, Error> {
    let account = state
        .service
        .verify_account(&data.account_number, &data.bank_code, data.gateway)
        .await?;
    Ok(web::Json(json!({ "account": account })))
}

#[post("/monnify/verify-account/")]
pub async fn monnify_verify_account(
    state: web::Data<AppState>,
    _authed: AuthedUser,
    data: web::Json<VerifyAccountReq>,
) -> Result<impl Responder, Error> {
    let account = state
        .service
        .verify_account(&data.account_number, &data.bank_code, Some(Provider::Monnify))
        .await?;
    Ok(web::Json(json!({ "account": account })))
}

async fn webhook(
    state: &AppState,
    provider: Provider,
    req: &HttpRequest,
    body: &[u8],
) -> Result<HttpResponse, WebhookError> {
    let signature = req
        .headers()
        .get(provider.signature_header())
        .and_then(|v| v.to_str().ok());
    let message = state
        .service
        .process_webhook(provider, body, signature)
        .await?;
    Ok(HttpResponse::Ok().content_type("text/plain").body(message))
}

#[post("/webhook/paystack/")]
pub async fn paystack_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, WebhookError> {
    webhook(&state, Provider::Paystack, &req, &body).await
}

#[post("/webhook/flutterwave/")]
pub async fn flutterwave_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, WebhookError> {
    webhook(&state, Provider::Flutterwave, &req, &body).await
}

#[post("/webhook/monnify/")]
pub async fn monnify_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, WebhookError> {
    webhook(&state, Provider::Monnify, &req, &body).await
}

#[get("/transactions/")]
pub async fn transactions(
    state: web::Data<AppState>,
    authed: AuthedUser,
    page: web::Query<Page>,
) -> Result<impl Responder, Error> {
    let list = state
        .service
        .transactions(authed.user.id, page.into_inner())
        .await?;
    Ok(web::Json(json!({ "transactions": list })))
}

#[get("/transactions/{id}/")]
pub async fn transaction(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, Error> {
    let payment = state
        .service
        .transaction(authed.user.id, path.into_inner())
        .await?;
    let detail = state.service.payment_detail(payment.id).await?;
    Ok(web::Json(json!({
        "transaction": payment,
        "detail": detail,
    })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayActiveReq {
    is_active: bool,
}

/// admin switch for a gateway, inactive gateways take no new payments
#[post("/gateways/{provider}/")]
pub async fn gateway_active(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Provider>,
    data: web::Json<GatewayActiveReq>,
) -> Result<impl Responder, Error> {
    let provider = path.into_inner();
    state
        .service
        .set_gateway_active(provider, data.is_active)
        .await?;
    Ok(web::Json(json!({
        "gateway": provider,
        "is_active": data.is_active,
    })))
}
