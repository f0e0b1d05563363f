//! Websocket push of chat events to connected users.

use crate::{auth::AuthedUser, AppState};
use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, Message, Recipient};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

static NEXT_SESSION_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Message)]
#[rtype(result = "()")]
struct WsMessage(pub String);

#[derive(Message)]
#[rtype(result = "()")]
struct Connect {
    user_id: i32,
    session_id: usize,
    addr: Recipient<WsMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
struct Disconnect {
    user_id: i32,
    session_id: usize,
}

/// Push an event to every session of a user.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Notify {
    pub user_id: i32,
    pub event: WsEvent,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WsEvent {
    pub event: String,
    pub data: Value,
}

impl WsEvent {
    pub fn new<S: Into<String>, T: Serialize>(event: S, data: &T) -> Self {
        Self {
            event: event.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }
}

/// Number of open sessions of a user.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct Sessions(pub i32);

#[derive(Default)]
pub struct WsHub {
    sessions: HashMap<i32, HashMap<usize, Recipient<WsMessage>>>,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for WsHub {
    type Context = actix::Context<Self>;
}

impl Handler<Connect> for WsHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Self::Context) -> Self::Result {
        debug!(user_id = msg.user_id, session_id = msg.session_id, "ws connect");
        self.sessions
            .entry(msg.user_id)
            .or_default()
            .insert(msg.session_id, msg.addr);
    }
}

impl Handler<Disconnect> for WsHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Self::Context) -> Self::Result {
        if let Some(user_sessions) = self.sessions.get_mut(&msg.user_id) {
            user_sessions.remove(&msg.session_id);
            if user_sessions.is_empty() {
                self.sessions.remove(&msg.user_id);
            }
        }
    }
}

impl Handler<Notify> for WsHub {
    type Result = ();

    fn handle(&mut self, msg: Notify, _: &mut Self::Context) -> Self::Result {
        if let Some(user_sessions) = self.sessions.get(&msg.user_id) {
            if let Ok(payload) = serde_json::to_string(&msg.event) {
                for addr in user_sessions.values() {
                    addr.do_send(WsMessage(payload.clone()));
                }
            }
        }
    }
}

impl Handler<Sessions> for WsHub {
    type Result = usize;

    fn handle(&mut self, msg: Sessions, _: &mut Self::Context) -> Self::Result {
        self.sessions.get(&msg.0).map(|s| s.len()).unwrap_or(0)
    }
}

struct WsSession {
    user_id: i32,
    session_id: usize,
    hub: Addr<WsHub>,
}

impl WsSession {
    fn new(user_id: i32, hub: Addr<WsHub>) -> Self {
        Self {
            user_id,
            session_id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            hub,
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hub.do_send(Connect {
            user_id: self.user_id,
            session_id: self.session_id,
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.hub.do_send(Disconnect {
            user_id: self.user_id,
            session_id: self.session_id,
        });
    }
}

impl Handler<WsMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}

impl actix::StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match item {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            // messages are sent over http
            Ok(_) => {}
            Err(_) => ctx.stop(),
        }
    }
}

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

/// upgrade to a websocket session, authed by the `token` query
#[get("/ws/")]
pub async fn chat_ws(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    if query.token.is_empty() {
        return Err(actix_web::error::ErrorUnauthorized("Missing token"));
    }
    let authed = AuthedUser::from_token(&query.token, &state).await?;
    ws::start(
        WsSession::new(authed.user.id, state.hub.clone()),
        &req,
        stream,
    )
}
