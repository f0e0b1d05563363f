use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    test::init_service,
    web,
};
use anyhow::Result;
use entity::{user, wallet::Kind};
use serde_json::{json, Value};
use taskbox::{create_web_app, now};
use util::{auth_get, auth_post, call, create_test_state, fund, register, subscribe};

mod util;

async fn post_task<S, B, E>(app: &S, token: &str, payout: i64, slots: i32) -> (Value, u16)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: std::fmt::Debug,
{
    call(
        app,
        auth_post(
            "/tasks/",
            token,
            json!({
                "title": "Follow our page",
                "description": "Follow and like the latest post",
                "proof_instructions": "Screenshot of the follow",
                "payout_per_slot": payout,
                "total_slots": slots,
                "deadline": now() as i64 + 3600,
            }),
        ),
    )
    .await
}

async fn review<S, B, E>(app: &S, token: &str, id: i64, body: Value) -> (Value, u16)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: std::fmt::Debug,
{
    call(
        app,
        auth_post(&format!("/tasks/submissions/{}/review/", id), token, body),
    )
    .await
}

#[actix_rt::test]
async fn posting_requires_role_and_subscription() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (member, member_id) = register(&app, "member@example.com", "member").await;
    let (adv, adv_id) = register(&app, "adv@example.com", "advertiser").await;
    fund(&data, adv_id, Kind::Task, 10_000).await?;

    let (_, status) = post_task(&app, &member, 1000, 1).await;
    assert_eq!(status, 403);

    let (val, status) = post_task(&app, &adv, 1000, 1).await;
    assert_eq!(status, 403);
    assert_eq!(val["message"], "An active subscription is required");

    subscribe(&data, adv_id).await?;
    // 10_000 funded plus the business plan bonus
    assert_eq!(data.service.balances(adv_id).await?.task, 11_000);

    let (_, status) = post_task(&app, &adv, 0, 1).await;
    assert_eq!(status, 400);
    let (_, status) = post_task(&app, &adv, 1000, 0).await;
    assert_eq!(status, 400);
    let (val, status) = post_task(&app, &adv, 100_000, 1).await;
    assert_eq!(status, 400);
    assert_eq!(val["message"], "Insufficient balance");

    let (val, _) = call(&app, auth_get("/tasks/mine/", &adv)).await;
    assert!(val["tasks"].as_array().unwrap().is_empty());

    // members submit only with a subscription
    let (val, status) = post_task(&app, &adv, 1000, 2).await;
    assert_eq!(status, 201);
    let task_id = val["task"]["id"].as_i64().unwrap();
    let path = format!("/tasks/{}/submit/", task_id);
    let (_, status) = call(&app, auth_post(&path, &member, json!({"proof": "done"}))).await;
    assert_eq!(status, 403);
    subscribe(&data, member_id).await?;
    let (_, status) = call(&app, auth_post(&path, &member, json!({"proof": "done"}))).await;
    assert_eq!(status, 201);
    Ok(())
}

#[actix_rt::test]
async fn escrow_release_and_cancel() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (adv, adv_id) = register(&app, "adv@example.com", "advertiser").await;
    let (ada, ada_id) = register(&app, "ada@example.com", "member").await;
    let (bob, bob_id) = register(&app, "bob@example.com", "member").await;
    for id in [adv_id, ada_id, bob_id] {
        subscribe(&data, id).await?;
    }
    fund(&data, adv_id, Kind::Task, 2_000).await?;

    let (val, status) = post_task(&app, &adv, 1000, 3).await;
    assert_eq!(status, 201, "{}", val);
    assert_eq!(val["task"]["remaining_slots"], 3);
    assert_eq!(val["task"]["status"], "active");
    assert_eq!(val["escrow"]["amount"], 3000);
    assert_eq!(val["escrow"]["status"], "locked");
    let task_id = val["task"]["id"].as_i64().unwrap();
    assert_eq!(data.service.balances(adv_id).await?.task, 0);

    let (val, _) = call(&app, auth_get("/tasks/", &ada)).await;
    assert_eq!(val["tasks"].as_array().unwrap().len(), 1);

    let submit = format!("/tasks/{}/submit/", task_id);
    let (_, status) = call(&app, auth_post(&submit, &adv, json!({"proof": "me"}))).await;
    assert_eq!(status, 400);
    let (_, status) = call(&app, auth_post(&submit, &ada, json!({"proof": ""}))).await;
    assert_eq!(status, 400);
    let (val, status) = call(&app, auth_post(&submit, &ada, json!({"proof": "https://x/1"}))).await;
    assert_eq!(status, 201);
    assert_eq!(val["submission"]["status"], "pending");
    let ada_sub = val["submission"]["id"].as_i64().unwrap();
    let (_, status) = call(&app, auth_post(&submit, &ada, json!({"proof": "again"}))).await;
    assert_eq!(status, 400);

    let (val, _) = call(&app, auth_get(&format!("/tasks/{}/", task_id), &ada)).await;
    assert_eq!(val["task"]["remaining_slots"], 2);

    // only the owner reviews
    let (_, status) = review(&app, &bob, ada_sub, json!({"action": "approve"})).await;
    assert_eq!(status, 403);
    let (_, status) = review(&app, &adv, ada_sub, json!({"action": "reject"})).await;
    assert_eq!(status, 400);

    let (val, status) = review(&app, &adv, ada_sub, json!({"action": "approve"})).await;
    assert_eq!(status, 200, "{}", val);
    assert_eq!(val["submission"]["status"], "approved");
    assert_eq!(val["submission"]["reviewed_by"], adv_id);
    let (_, status) = review(&app, &adv, ada_sub, json!({"action": "approve"})).await;
    assert_eq!(status, 400);

    // 80/20 split of the slot payout
    assert_eq!(data.service.balances(ada_id).await?.main, 800);
    let company = data
        .service
        .get_user_by_email("company@test.local")
        .await?
        .unwrap();
    assert!(!company.is_active);
    assert_eq!(data.service.balances(company.id).await?.main, 200);
    let escrow = data.service.escrow(task_id as i32).await?.unwrap();
    assert_eq!((escrow.released, escrow.refunded), (1000, 0));

    let (val, status) = call(&app, auth_post(&submit, &bob, json!({"proof": "https://x/2"}))).await;
    assert_eq!(status, 201);
    let bob_sub = val["submission"]["id"].as_i64().unwrap();

    let (val, _) = call(&app, auth_get(&format!("/tasks/{}/submissions/", task_id), &adv)).await;
    assert_eq!(val["submissions"].as_array().unwrap().len(), 2);
    let (_, status) = call(&app, auth_get(&format!("/tasks/{}/submissions/", task_id), &bob)).await;
    assert_eq!(status, 403);

    // one free slot comes back, bob's pending slot stays reserved
    let cancel = format!("/tasks/{}/cancel/", task_id);
    let (_, status) = call(&app, auth_post(&cancel, &bob, json!({}))).await;
    assert_eq!(status, 403);
    let (val, status) = call(&app, auth_post(&cancel, &adv, json!({}))).await;
    assert_eq!(status, 200);
    assert_eq!(val["task"]["status"], "cancelled");
    assert_eq!(val["escrow"]["refunded"], 1000);
    assert_eq!(data.service.balances(adv_id).await?.task, 1000);
    let (_, status) = call(&app, auth_post(&cancel, &adv, json!({}))).await;
    assert_eq!(status, 400);

    let (val, _) = call(&app, auth_get("/tasks/", &ada)).await;
    assert!(val["tasks"].as_array().unwrap().is_empty());

    // rejecting on a cancelled task hands the reserved slot back
    let (val, status) = review(
        &app,
        &adv,
        bob_sub,
        json!({"action": "reject", "reason": "Screenshot is cropped"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(val["submission"]["rejection_reason"], "Screenshot is cropped");
    assert_eq!(data.service.balances(adv_id).await?.task, 2000);
    let escrow = data.service.escrow(task_id as i32).await?.unwrap();
    assert_eq!(escrow.remaining(), 0);
    assert_eq!(escrow.status, entity::escrow::Status::Released);
    assert_eq!(data.service.balances(bob_id).await?.main, 0);

    assert!(data.service.audit_wallets(false).await?.is_empty());
    Ok(())
}

#[actix_rt::test]
async fn last_approval_completes_task() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (adv, adv_id) = register(&app, "adv@example.com", "advertiser").await;
    let (ada, ada_id) = register(&app, "ada@example.com", "member").await;
    subscribe(&data, adv_id).await?;
    subscribe(&data, ada_id).await?;

    let (val, _) = post_task(&app, &adv, 1000, 1).await;
    let task_id = val["task"]["id"].as_i64().unwrap();
    let (val, _) = call(
        &app,
        auth_post(&format!("/tasks/{}/submit/", task_id), &ada, json!({"proof": "ok"})),
    )
    .await;
    let sub = val["submission"]["id"].as_i64().unwrap();
    review(&app, &adv, sub, json!({"action": "approve"})).await;

    let task = data.service.task(task_id as i32).await?;
    assert_eq!(task.status, entity::task::Status::Completed);
    assert_eq!(task.remaining_slots, 0);
    let escrow = data.service.escrow(task.id).await?.unwrap();
    assert_eq!(escrow.status, entity::escrow::Status::Released);

    let (val, _) = call(&app, auth_get("/tasks/submissions/mine/", &ada)).await;
    assert_eq!(val["submissions"][0]["status"], "approved");
    Ok(())
}

#[actix_rt::test]
async fn disputes_settle_rejections() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (adv, adv_id) = register(&app, "adv@example.com", "advertiser").await;
    let (ada, ada_id) = register(&app, "ada@example.com", "member").await;
    let (bob, bob_id) = register(&app, "bob@example.com", "member").await;
    let (admin, admin_id) = register(&app, "root@example.com", "member").await;
    data.service.set_role(admin_id, user::Role::Admin).await?;
    for id in [adv_id, ada_id, bob_id] {
        subscribe(&data, id).await?;
    }
    fund(&data, adv_id, Kind::Task, 1000).await?;

    let (val, _) = post_task(&app, &adv, 1000, 2).await;
    let task_id = val["task"]["id"].as_i64().unwrap();
    assert_eq!(data.service.balances(adv_id).await?.task, 0);
    let submit = format!("/tasks/{}/submit/", task_id);
    let (val, _) = call(&app, auth_post(&submit, &ada, json!({"proof": "a"}))).await;
    let ada_sub = val["submission"]["id"].as_i64().unwrap();
    let (val, _) = call(&app, auth_post(&submit, &bob, json!({"proof": "b"}))).await;
    let bob_sub = val["submission"]["id"].as_i64().unwrap();

    let reject = json!({"action": "reject", "reason": "Wrong account"});
    review(&app, &adv, ada_sub, reject.clone()).await;
    review(&app, &adv, bob_sub, reject.clone()).await;

    // a rejected proof can be sent again before any dispute
    let (val, status) = call(
        &app,
        auth_post(
            &format!("/tasks/submissions/{}/resubmit/", bob_sub),
            &bob,
            json!({"proof": "b2"}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(val["submission"]["status"], "pending");
    assert_eq!(val["submission"]["proof"], "b2");
    review(&app, &adv, bob_sub, reject).await;

    let dispute = |id: i64| format!("/tasks/submissions/{}/dispute/", id);
    let (_, status) = call(&app, auth_post(&dispute(ada_sub), &bob, json!({"reason": "x"}))).await;
    assert_eq!(status, 404);
    let (val, status) = call(
        &app,
        auth_post(&dispute(ada_sub), &ada, json!({"reason": "It is the right account"})),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(val["dispute"]["status"], "open");
    let ada_dispute = val["dispute"]["id"].as_i64().unwrap();
    let (_, status) = call(&app, auth_post(&dispute(ada_sub), &ada, json!({"reason": "again"}))).await;
    assert_eq!(status, 400);
    let (val, _) = call(&app, auth_post(&dispute(bob_sub), &bob, json!({"reason": "Please check"}))).await;
    let bob_dispute = val["dispute"]["id"].as_i64().unwrap();

    let (val, _) = call(&app, auth_get("/tasks/disputes/", &adv)).await;
    assert_eq!(val["disputes"].as_array().unwrap().len(), 2);
    let (val, _) = call(&app, auth_get("/tasks/disputes/", &ada)).await;
    assert_eq!(val["disputes"].as_array().unwrap().len(), 1);

    let resolve = |id: i64| format!("/tasks/disputes/{}/resolve/", id);
    let (_, status) = call(
        &app,
        auth_post(&resolve(ada_dispute), &adv, json!({"resolution": "favor_advertiser"})),
    )
    .await;
    assert_eq!(status, 403);

    let (val, status) = call(
        &app,
        auth_post(
            &resolve(ada_dispute),
            &admin,
            json!({"resolution": "favor_member", "notes": "Proof checks out"}),
        ),
    )
    .await;
    assert_eq!(status, 200, "{}", val);
    assert_eq!(val["dispute"]["status"], "resolved_favor_member");
    assert_eq!(val["dispute"]["resolved_by"], admin_id);
    assert_eq!(data.service.balances(ada_id).await?.main, 800);
    let sub = data.service.submission(ada_sub as i32).await?;
    assert_eq!(sub.status, entity::submission::Status::Approved);
    let (_, status) = call(
        &app,
        auth_post(&resolve(ada_dispute), &admin, json!({"resolution": "favor_member"})),
    )
    .await;
    assert_eq!(status, 400);

    let (val, status) = call(
        &app,
        auth_post(&resolve(bob_dispute), &admin, json!({"resolution": "favor_advertiser"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(val["dispute"]["status"], "resolved_favor_advertiser");
    assert_eq!(data.service.balances(bob_id).await?.main, 0);
    assert_eq!(data.service.balances(adv_id).await?.task, 1000);

    let escrow = data.service.escrow(task_id as i32).await?.unwrap();
    assert_eq!((escrow.released, escrow.refunded), (1000, 1000));

    // settled by the dispute
    let (_, status) = call(
        &app,
        auth_post(
            &format!("/tasks/submissions/{}/resubmit/", bob_sub),
            &bob,
            json!({"proof": "b3"}),
        ),
    )
    .await;
    assert_eq!(status, 400);

    assert!(data.service.audit_wallets(false).await?.is_empty());
    Ok(())
}

#[actix_rt::test]
async fn cancel_keeps_disputed_slots() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (adv, adv_id) = register(&app, "adv@example.com", "advertiser").await;
    let (ada, ada_id) = register(&app, "ada@example.com", "member").await;
    let (admin, admin_id) = register(&app, "root@example.com", "member").await;
    data.service.set_role(admin_id, user::Role::Admin).await?;
    subscribe(&data, adv_id).await?;
    subscribe(&data, ada_id).await?;

    let (val, _) = post_task(&app, &adv, 500, 2).await;
    let task_id = val["task"]["id"].as_i64().unwrap();
    let (val, _) = call(
        &app,
        auth_post(&format!("/tasks/{}/submit/", task_id), &ada, json!({"proof": "a"})),
    )
    .await;
    let sub = val["submission"]["id"].as_i64().unwrap();
    review(&app, &adv, sub, json!({"action": "reject", "reason": "no"})).await;
    let (val, _) = call(
        &app,
        auth_post(
            &format!("/tasks/submissions/{}/dispute/", sub),
            &ada,
            json!({"reason": "yes"}),
        ),
    )
    .await;
    let dispute_id = val["dispute"]["id"].as_i64().unwrap();

    let (val, _) = call(&app, auth_post(&format!("/tasks/{}/cancel/", task_id), &adv, json!({}))).await;
    assert_eq!(val["escrow"]["refunded"], 500);
    assert_eq!(data.service.balances(adv_id).await?.task, 500);

    // the reserved slot still pays out
    let (_, status) = call(
        &app,
        auth_post(
            &format!("/tasks/disputes/{}/resolve/", dispute_id),
            &admin,
            json!({"resolution": "favor_member"}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(data.service.balances(ada_id).await?.main, 400);
    let escrow = data.service.escrow(task_id as i32).await?.unwrap();
    assert_eq!(escrow.remaining(), 0);
    Ok(())
}
