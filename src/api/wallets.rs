use crate::{
    auth::{AdminUser, AuthedUser},
    service::Page,
    AppState, Error,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use entity::wallet::Kind;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(balances)
        .service(records)
        .service(to_task)
        .service(to_main)
        .service(create_withdrawal)
        .service(withdrawals)
        .service(approve_withdrawal)
        .service(reject_withdrawal);
}

#[get("/")]
pub async fn balances(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let totals = state.service.balances(authed.user.id).await?;
    Ok(web::Json(json!({ "balances": totals })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsQuery {
    kind: Option<Kind>,
    page: u64,
    per_page: u64,
}

impl Default for RecordsQuery {
    fn default() -> Self {
        let page = Page::default();
        Self {
            kind: None,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

#[get("/records/")]
pub async fn records(
    state: web::Data<AppState>,
    authed: AuthedUser,
    query: web::Query<RecordsQuery>,
) -> Result<impl Responder, Error> {
    let page = Page {
        page: query.page,
        per_page: query.per_page,
    };
    let rows = state
        .service
        .records(authed.user.id, query.kind, page)
        .await?;
    Ok(web::Json(json!({ "records": rows })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AmountReq {
    amount: i64,
}

#[post("/transfer/to-task/")]
pub async fn to_task(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<AmountReq>,
) -> Result<impl Responder, Error> {
    let totals = state
        .service
        .transfer_to_task_wallet(authed.user.id, data.amount)
        .await?;
    Ok(web::Json(json!({ "balances": totals })))
}

#[post("/transfer/to-main/")]
pub async fn to_main(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<AmountReq>,
) -> Result<impl Responder, Error> {
    let totals = state
        .service
        .transfer_to_main_wallet(authed.user.id, data.amount)
        .await?;
    Ok(web::Json(json!({ "balances": totals })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WithdrawalReq {
    amount: i64,
    bank_code: String,
    account_number: String,
    account_name: String,
}

#[post("/withdrawals/")]
pub async fn create_withdrawal(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<WithdrawalReq>,
) -> Result<HttpResponse, Error> {
    let data = data.into_inner();
    let request = state
        .service
        .create_withdrawal_request(
            authed.user.id,
            data.amount,
            data.bank_code,
            data.account_number,
            data.account_name,
        )
        .await?;
    Ok(HttpResponse::Created().json(json!({ "withdrawal": request })))
}

/// own requests, every request for admins
#[get("/withdrawals/")]
pub async fn withdrawals(
    state: web::Data<AppState>,
    authed: AuthedUser,
    page: web::Query<Page>,
) -> Result<impl Responder, Error> {
    let user_id = if authed.user.role == entity::user::Role::Admin {
        None
    } else {
        Some(authed.user.id)
    };
    let list = state
        .service
        .withdrawal_requests(user_id, page.into_inner())
        .await?;
    Ok(web::Json(json!({ "withdrawals": list })))
}

#[post("/withdrawals/{id}/approve/")]
pub async fn approve_withdrawal(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let request = state
        .service
        .approve_withdrawal(path.into_inner(), admin.user.id)
        .await?;
    Ok(web::Json(json!({ "withdrawal": request })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RejectReq {
    reason: String,
}

#[post("/withdrawals/{id}/reject/")]
pub async fn reject_withdrawal(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i32>,
    data: web::Json<RejectReq>,
) -> Result<impl Responder, Error> {
    let request = state
        .service
        .reject_withdrawal(path.into_inner(), admin.user.id, data.into_inner().reason)
        .await?;
    Ok(web::Json(json!({ "withdrawal": request })))
}
