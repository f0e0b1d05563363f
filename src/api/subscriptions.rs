use crate::{
    auth::{AuthedUser, Subscriber},
    AppState, Error,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(plans)
        .service(subscribe)
        .service(current)
        .service(auto_renewal);
}

#[get("/plans/")]
pub async fn plans(state: web::Data<AppState>) -> Result<impl Responder, Error> {
    let rows = state.service.plans().await?;
    Ok(web::Json(json!({ "plans": rows })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeReq {
    plan_id: i32,
}

#[post("/subscribe/")]
pub async fn subscribe(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<SubscribeReq>,
) -> Result<HttpResponse, Error> {
    let subscription = state
        .service
        .subscribe(authed.user.id, data.plan_id)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "subscription": subscription })))
}

#[get("/current/")]
pub async fn current(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let context = state.service.subscription_context(authed.user.id).await?;
    Ok(web::Json(context))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRenewalReq {
    enabled: bool,
}

#[post("/auto-renewal/")]
pub async fn auto_renewal(
    state: web::Data<AppState>,
    subscriber: Subscriber,
    data: web::Json<AutoRenewalReq>,
) -> Result<impl Responder, Error> {
    let subscription = state
        .service
        .set_auto_renewal(&subscriber.subscription, data.enabled)
        .await?;
    Ok(web::Json(json!({ "subscription": subscription })))
}
