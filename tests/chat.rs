use actix_web::{test::init_service, web};
use anyhow::Result;
use serde_json::json;
use taskbox::{create_web_app, ws::Sessions};
use util::{auth_get, auth_post, call, create_test_state, get, register};

mod util;

#[actix_rt::test]
async fn rooms_and_messages() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (ada, ada_id) = register(&app, "ada@example.com", "member").await;
    let (adv, adv_id) = register(&app, "adv@example.com", "advertiser").await;
    let (eve, _) = register(&app, "eve@example.com", "member").await;

    let (_, status) = call(&app, auth_post("/chat/rooms/", &ada, json!({"user_id": ada_id}))).await;
    assert_eq!(status, 400);
    let (_, status) = call(&app, auth_post("/chat/rooms/", &ada, json!({"user_id": 9999}))).await;
    assert_eq!(status, 404);

    let (val, status) = call(&app, auth_post("/chat/rooms/", &ada, json!({"user_id": adv_id}))).await;
    assert_eq!(status, 200);
    // the advertiser side follows the role
    assert_eq!(val["room"]["advertiser_id"], adv_id);
    assert_eq!(val["room"]["worker_id"], ada_id);
    let room_id = val["room"]["id"].as_i64().unwrap();

    // same pair, either direction
    let (val, _) = call(&app, auth_post("/chat/rooms/", &adv, json!({"user_id": ada_id}))).await;
    assert_eq!(val["room"]["id"], room_id);

    let path = format!("/chat/rooms/{}/messages/", room_id);
    let (_, status) = call(&app, auth_post(&path, &ada, json!({"content": "   "}))).await;
    assert_eq!(status, 400);
    let long = "x".repeat(4001);
    let (_, status) = call(&app, auth_post(&path, &ada, json!({"content": long}))).await;
    assert_eq!(status, 400);
    let (_, status) = call(&app, auth_post(&path, &eve, json!({"content": "hi"}))).await;
    assert_eq!(status, 404);

    for content in ["Hello", "Is the task still open?"] {
        let (val, status) = call(&app, auth_post(&path, &ada, json!({"content": content}))).await;
        assert_eq!(status, 201);
        assert_eq!(val["message"]["sender_id"], ada_id);
        assert_eq!(val["message"]["is_read"], false);
    }

    let (val, _) = call(&app, auth_get("/chat/unread/", &adv)).await;
    assert_eq!(val["unread"], 2);
    let (val, _) = call(&app, auth_get("/chat/unread/", &ada)).await;
    assert_eq!(val["unread"], 0);

    let (val, _) = call(&app, auth_get("/chat/rooms/", &adv)).await;
    let rooms = val["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["id"], room_id);
    assert_eq!(rooms[0]["other_user_id"], ada_id);
    assert_eq!(rooms[0]["unread"], 2);

    // reading marks the other side's messages read, oldest first
    let (val, status) = call(&app, auth_get(&path, &adv)).await;
    assert_eq!(status, 200);
    let messages = val["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Hello");
    let (val, _) = call(&app, auth_get("/chat/unread/", &adv)).await;
    assert_eq!(val["unread"], 0);

    let (_, status) = call(&app, auth_get(&path, &eve)).await;
    assert_eq!(status, 404);

    let (val, _) = call(&app, auth_get(&format!("{}?per_page=1", path), &ada)).await;
    assert_eq!(val["messages"][0]["content"], "Is the task still open?");
    Ok(())
}

#[actix_rt::test]
async fn websocket_handshake() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    let upgrade = |uri: String| {
        get(&uri)
            .insert_header(("upgrade", "websocket"))
            .insert_header(("connection", "upgrade"))
            .insert_header(("sec-websocket-version", "13"))
            .insert_header(("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ=="))
    };

    let (_, status) = call(&app, upgrade("/chat/ws/?token=bad".to_owned())).await;
    assert_eq!(status, 401);
    let res = actix_web::test::call_service(
        &app,
        upgrade(format!("/chat/ws/?token={}", token)).to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 101);

    drop(res);
    // pushes to users without a session go nowhere
    assert_eq!(data.hub.send(Sessions(id + 1)).await?, 0);
    Ok(())
}
