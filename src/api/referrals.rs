use crate::{auth::AuthedUser, AppState, Error};
use actix_web::{get, web, Responder};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard);
}

#[get("/")]
pub async fn dashboard(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let board = state.service.referral_dashboard(&authed.user).await?;
    Ok(web::Json(board))
}
