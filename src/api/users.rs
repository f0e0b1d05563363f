use super::client_ip;
use crate::{
    auth::{AdminUser, AuthedUser, JwtToken},
    service::{ProfileUpdate, Registration},
    AppState, Error, Result,
};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use entity::user;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(logout)
        .service(me)
        .service(update_me)
        .service(set_role);
}

fn token_for(state: &AppState, user: &user::Model) -> Result<String> {
    Ok(JwtToken::generate(
        user.id,
        state.setting.auth.access_token_expiry,
        state.setting.auth.secret.as_bytes(),
    )?)
}

#[post("/register/")]
pub async fn register(
    state: web::Data<AppState>,
    data: web::Json<Registration>,
) -> Result<HttpResponse, Error> {
    let user = state.service.register(data.into_inner()).await?;
    let token = token_for(&state, &user)?;
    Ok(HttpResponse::Created().json(json!({
        "user": user,
        "token": token,
    })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoginReq {
    email: String,
    password: String,
}

#[post("/login/")]
pub async fn login(
    state: web::Data<AppState>,
    data: web::Json<LoginReq>,
    req: HttpRequest,
) -> Result<impl Responder, Error> {
    if data.email.is_empty() || data.password.is_empty() {
        return Err(Error::invalid("Email and password are required"));
    }
    let user = state
        .service
        .login(&data.email, &data.password, &client_ip(&req))
        .await?;
    let token = token_for(&state, &user)?;
    Ok(web::Json(json!({
        "user": user,
        "token": token,
        "expires_in": state.setting.auth.access_token_expiry,
    })))
}

#[post("/logout/")]
pub async fn logout(
    state: web::Data<AppState>,
    authed: AuthedUser,
    req: HttpRequest,
) -> Result<impl Responder, Error> {
    state.service.logout(authed.user.id, &client_ip(&req)).await?;
    Ok(web::Json(json!({"success": true})))
}

#[get("/me/")]
pub async fn me(state: web::Data<AppState>, authed: AuthedUser) -> Result<impl Responder, Error> {
    let profile = state.service.profile(authed.user.id).await?;
    let context = state.service.subscription_context(authed.user.id).await?;
    Ok(web::Json(json!({
        "user": authed.user,
        "profile": profile,
        "subscription": context,
    })))
}

#[post("/me/")]
pub async fn update_me(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<ProfileUpdate>,
) -> Result<impl Responder, Error> {
    let (user, profile) = state
        .service
        .update_profile(&authed.user, data.into_inner())
        .await?;
    Ok(web::Json(json!({
        "user": user,
        "profile": profile,
    })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleReq {
    role: user::Role,
}

/// admin sets the role of a user
#[post("/{id}/role/")]
pub async fn set_role(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<i32>,
    data: web::Json<RoleReq>,
) -> Result<impl Responder, Error> {
    let id = path.into_inner();
    if state.service.get_user_by_id(id).await?.is_none() {
        return Err(Error::NotFound("User"));
    }
    let user = state.service.set_role(id, data.role).await?;
    Ok(web::Json(json!({ "user": user })))
}
