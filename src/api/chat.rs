use crate::{
    auth::AuthedUser,
    service::Page,
    ws::{chat_ws, Notify, WsEvent},
    AppState, Error,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(rooms)
        .service(open_room)
        .service(messages)
        .service(send)
        .service(unread)
        .service(chat_ws);
}

#[get("/rooms/")]
pub async fn rooms(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let summaries = state.service.rooms(authed.user.id).await?;
    Ok(web::Json(json!({ "rooms": summaries })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReq {
    user_id: i32,
}

#[post("/rooms/")]
pub async fn open_room(
    state: web::Data<AppState>,
    authed: AuthedUser,
    data: web::Json<RoomReq>,
) -> Result<impl Responder, Error> {
    let room = state
        .service
        .get_or_create_room(&authed.user, data.user_id)
        .await?;
    Ok(web::Json(json!({ "room": room })))
}

#[get("/rooms/{id}/messages/")]
pub async fn messages(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
    page: web::Query<Page>,
) -> Result<impl Responder, Error> {
    let items = state
        .service
        .messages(authed.user.id, path.into_inner(), page.into_inner())
        .await?;
    Ok(web::Json(json!({ "messages": items })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MessageReq {
    content: String,
}

#[post("/rooms/{id}/messages/")]
pub async fn send(
    state: web::Data<AppState>,
    authed: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<MessageReq>,
) -> Result<HttpResponse, Error> {
    let (room, message) = state
        .service
        .send_message(authed.user.id, path.into_inner(), &data.content)
        .await?;
    state.hub.do_send(Notify {
        user_id: room.other(authed.user.id),
        event: WsEvent::new("chat.message", &message),
    });
    Ok(HttpResponse::Created().json(json!({ "message": message })))
}

#[get("/unread/")]
pub async fn unread(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    let count = state.service.unread_count(authed.user.id).await?;
    Ok(web::Json(json!({ "unread": count })))
}
