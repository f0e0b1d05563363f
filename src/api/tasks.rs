use crate::{
    auth::{AdminUser, AuthedUser},
    service::{NewTask, Page, Resolution, Review},
    AppState, Error,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(create)
        .service(mine)
        .service(my_submissions)
        .service(disputes)
        .service(detail)
        .service(cancel)
        .service(submit)
        .service(submissions)
        .service(review)
        .service(resubmit)
        .service(dispute)
        .service(resolve);
}

#[get("/")]
pub async fn list(
    state: web::Data<AppState>,
    _authed: AuthedUser,
    page: web::Query<Page>,
) -> Result<impl Responder, Error> {
    let tasks = state.service.list_tasks(page.into_inner()).await?;
    Ok(web::Json(json!({ "tasks": tasks })))
}

#[post("/")]
pub async fn create(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<NewTask>,
) -> Result<HttpResponse, Error> {
    let task = state
        .service
        .create_task(&authed.user, data.into_inner())
        .await?;
    let escrow = state.service.escrow(task.id).await?;
    Ok(HttpResponse::Created().json(json!({
        "task": task,
        "escrow": escrow,
    })))
}

#[get("/mine/")]
pub async fn mine(
    state: web::Data<AppState>,
    authed: AuthedUser,
    page: web::Query<Page>,
) -> Result<impl Responder, Error> {
    let tasks = state
        .service
        .my_tasks(authed.user.id, page.into_inner())
        .await?;
    Ok(web::Json(json!({ "tasks": tasks })))
}

#[get("/{id:\\d+}/")]
pub async fn detail(
    state: web::Data<AppState>,
    _authed: AuthedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let task = state.service.task(path.into_inner()).await?;
    let escrow = state.service.escrow(task.id).await?;
    Ok(web::Json(json!({
        "task": task,
        "escrow": escrow,
    })))
}

#[post("/{id:\\d+}/cancel/")]
pub async fn cancel(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let task = state
        .service
        .cancel_task(&authed.user, path.into_inner())
        .await?;
    let escrow = state.service.escrow(task.id).await?;
    Ok(web::Json(json!({
        "task": task,
        "escrow": escrow,
    })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProofReq {
    proof: String,
}

#[post("/{id:\\d+}/submit/")]
pub async fn submit(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<ProofReq>,
) -> Result<HttpResponse, Error> {
    let submission = state
        .service
        .submit(&authed.user, path.into_inner(), data.into_inner().proof)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "submission": submission })))
}

#[get("/{id:\\d+}/submissions/")]
pub async fn submissions(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let items = state
        .service
        .task_submissions(&authed.user, path.into_inner())
        .await?;
    Ok(web::Json(json!({ "submissions": items })))
}

#[get("/submissions/mine/")]
pub async fn my_submissions(
    state: web::Data<AppState>,
    authed: AuthedUser,
    page: web::Query<Page>,
) -> Result<impl Responder, Error> {
    let items = state
        .service
        .my_submissions(authed.user.id, page.into_inner())
        .await?;
    Ok(web::Json(json!({ "submissions": items })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReq {
    action: Review,
    #[serde(default)]
    reason: String,
}

#[post("/submissions/{id}/review/")]
pub async fn review(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<ReviewReq>,
) -> Result<impl Responder, Error> {
    let data = data.into_inner();
    let submission = state
        .service
        .review(&authed.user, path.into_inner(), data.action, data.reason)
        .await?;
    Ok(web::Json(json!({ "submission": submission })))
}

#[post("/submissions/{id}/resubmit/")]
pub async fn resubmit(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<ProofReq>,
) -> Result<impl Responder, Error> {
    let submission = state
        .service
        .resubmit(&authed.user, path.into_inner(), data.into_inner().proof)
        .await?;
    Ok(web::Json(json!({ "submission": submission })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisputeReq {
    reason: String,
}

#[post("/submissions/{id}/dispute/")]
pub async fn dispute(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<DisputeReq>,
) -> Result<HttpResponse, Error> {
    let row = state
        .service
        .raise_dispute(&authed.user, path.into_inner(), data.into_inner().reason)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "dispute": row })))
}

#[get("/disputes/")]
pub async fn disputes(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let items = state.service.disputes(&authed.user).await?;
    Ok(web::Json(json!({ "disputes": items })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveReq {
    resolution: Resolution,
    #[serde(default)]
    notes: String,
}

#[post("/disputes/{id}/resolve/")]
pub async fn resolve(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i32>,
    data: web::Json<ResolveReq>,
) -> Result<impl Responder, Error> {
    let data = data.into_inner();
    let row = state
        .service
        .resolve_dispute(&admin.user, path.into_inner(), data.resolution, data.notes)
        .await?;
    Ok(web::Json(json!({ "dispute": row })))
}
