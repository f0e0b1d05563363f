use actix_web::{test::init_service, web};
use anyhow::Result;
use entity::{plan, subscription, wallet::Kind};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use taskbox::{create_web_app, now};
use util::{auth_get, auth_post, business_plan, call, create_test_state, fund, get, register};

mod util;

/// move the expiry into the past so the renewal job picks it up
async fn expire(state: &taskbox::AppState, id: i32) -> Result<()> {
    subscription::ActiveModel {
        id: Set(id),
        expiry_at: Set(now() as i64 - 60),
        ..Default::default()
    }
    .update(state.service.db())
    .await?;
    Ok(())
}

#[actix_rt::test]
async fn subscribe_from_main_wallet() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    let (val, status) = call(&app, get("/subscriptions/plans/")).await;
    assert_eq!(status, 200);
    let plans = val["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 2);
    // cheapest first
    assert_eq!(plans[0]["plan_type"], "trial");
    assert_eq!(plans[1]["price"], 2500);

    // seeding twice keeps the same rows
    assert_eq!(data.service.create_plans().await?.len(), 2);
    assert_eq!(data.service.plans().await?.len(), 2);

    let plan_id = business_plan(&data).await?;
    let (val, status) = call(
        &app,
        auth_post("/subscriptions/subscribe/", &token, json!({"plan_id": plan_id})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(val["message"], "Insufficient balance");

    fund(&data, id, Kind::Main, 3000).await?;
    let (val, status) = call(
        &app,
        auth_post("/subscriptions/subscribe/", &token, json!({"plan_id": plan_id})),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(val["subscription"]["status"], "active");
    assert_eq!(val["subscription"]["auto_renewal"], false);

    let balances = data.service.balances(id).await?;
    assert_eq!(balances.main, 500);
    assert_eq!(balances.task, 1000);

    let (val, _) = call(&app, auth_get("/subscriptions/current/", &token)).await;
    assert_eq!(val["has_active_subscription"], true);
    assert_eq!(val["plan"]["plan_type"], "business");
    assert_eq!(val["wallet_balance"], 500);
    assert_eq!(val["task_wallet_balance"], 1000);
    let user = data.service.get_user_by_id(id).await?.unwrap();
    assert!(user.is_subscribed);

    let (_, status) = call(
        &app,
        auth_post("/subscriptions/subscribe/", &token, json!({"plan_id": 9999})),
    )
    .await;
    assert_eq!(status, 404);
    Ok(())
}

#[actix_rt::test]
async fn renewal_job() -> Result<()> {
    let (state, _dir) = create_test_state(None).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (ada, ada_id) = register(&app, "ada@example.com", "member").await;
    let (bob, bob_id) = register(&app, "bob@example.com", "member").await;
    let plan_id = business_plan(&data).await?;

    let (_, status) = call(
        &app,
        auth_post("/subscriptions/auto-renewal/", &ada, json!({"enabled": true})),
    )
    .await;
    assert_eq!(status, 403);

    fund(&data, ada_id, Kind::Main, 5000).await?;
    fund(&data, bob_id, Kind::Main, 2500).await?;
    let ada_sub = data.service.subscribe(ada_id, plan_id).await?;
    let bob_sub = data.service.subscribe(bob_id, plan_id).await?;

    for token in [&ada, &bob] {
        let (val, status) = call(
            &app,
            auth_post("/subscriptions/auto-renewal/", token, json!({"enabled": true})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(val["subscription"]["auto_renewal"], true);
    }

    // nothing due yet
    let report = data.service.renew_subscriptions().await?;
    assert_eq!((report.renewed, report.expired), (0, 0));

    expire(&data, ada_sub.id).await?;
    expire(&data, bob_sub.id).await?;
    let report = data.service.renew_subscriptions().await?;
    assert_eq!(report.renewed, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(report.errors, 0);

    // ada could pay, bob could not
    let ada_now = data.service.active_subscription(ada_id).await?.unwrap();
    assert_eq!(ada_now.id, ada_sub.id);
    assert!(ada_now.expiry_at > now() as i64);
    assert_eq!(data.service.balances(ada_id).await?.main, 0);

    assert!(data.service.active_subscription(bob_id).await?.is_none());
    let bob_user = data.service.get_user_by_id(bob_id).await?.unwrap();
    assert!(!bob_user.is_subscribed);
    let (val, _) = call(&app, auth_get("/subscriptions/current/", &bob)).await;
    assert_eq!(val["has_active_subscription"], false);
    assert!(val["plan"].is_null());

    // a resubscription replaces the active one
    fund(&data, ada_id, Kind::Main, 300).await?;
    let trial = data
        .service
        .plans()
        .await?
        .into_iter()
        .find(|p| p.plan_type == plan::PlanType::Trial)
        .unwrap();
    let new_sub = data.service.subscribe(ada_id, trial.id).await?;
    let active = data.service.active_subscription(ada_id).await?.unwrap();
    assert_eq!(active.id, new_sub.id);
    Ok(())
}
