#![allow(unused)]

use actix_http::{body::MessageBody, header::AUTHORIZATION, Method, Request};
use actix_web::{
    dev::{Service, ServiceResponse},
    test::{call_service, read_body, read_body_json, TestRequest},
    web,
};
use anyhow::Result;
use entity::{record::Category, wallet::Kind};
use httpmock::MockServer;
use migration::{Migrator, MigratorTrait};
use serde_json::{json, Value};
use taskbox::{service::Change, setting::Setting, AppState};
use tempfile::TempDir;

pub const PAYSTACK_SECRET: &str = "sk_test_taskbox";
pub const FLUTTERWAVE_HASH: &str = "flw-hash";
pub const MONNIFY_SECRET: &str = "monnify-secret";

/// Fresh sqlite database in a temp dir, gateways pointed at `mock` when given.
/// Keep the returned dir alive for the whole test.
pub async fn create_test_state(mock: Option<&MockServer>) -> Result<(AppState, TempDir)> {
    let dir = tempfile::tempdir()?;
    let mut setting = Setting::default();
    setting.db_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("taskbox.sqlite").display()
    );
    setting.jobs.enabled = false;
    setting.escrow.company_email = "company@test.local".to_owned();
    if let Some(server) = mock {
        setting.paystack.secret_key = PAYSTACK_SECRET.to_owned();
        setting.paystack.base_url = Some(server.base_url());
        setting.flutterwave.secret_key = "FLWSECK_TEST".to_owned();
        setting.flutterwave.secret_hash = FLUTTERWAVE_HASH.to_owned();
        setting.flutterwave.base_url = Some(server.base_url());
        setting.monnify.api_key = "MK_TEST".to_owned();
        setting.monnify.secret_key = MONNIFY_SECRET.to_owned();
        setting.monnify.contract_code = "100".to_owned();
        setting.monnify.base_url = Some(server.base_url());
    }
    let state = AppState::from_setting(setting).await?;
    Migrator::fresh(state.service.db()).await?;
    state.service.setup_gateways().await?;
    state.service.create_plans().await?;
    Ok((state, dir))
}

pub fn auth_get(path: &str, token: &str) -> TestRequest {
    TestRequest::with_uri(path).insert_header((AUTHORIZATION, format!("Bearer {}", token)))
}

pub fn get(path: &str) -> TestRequest {
    TestRequest::with_uri(path)
}

pub fn auth_post(path: &str, token: &str, data: Value) -> TestRequest {
    TestRequest::with_uri(path)
        .method(Method::POST)
        .set_json(data)
        .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
}

pub fn post(path: &str, data: Value) -> TestRequest {
    TestRequest::with_uri(path)
        .method(Method::POST)
        .set_json(data)
}

/// raw body post, as gateways deliver webhooks
pub fn webhook(path: &str, header: &str, signature: Option<&str>, body: &str) -> TestRequest {
    let mut req = TestRequest::with_uri(path)
        .method(Method::POST)
        .insert_header(("content-type", "application/json"))
        .set_payload(body.to_owned());
    if let Some(signature) = signature {
        req = req.insert_header((header.to_owned(), signature.to_owned()));
    }
    req
}

pub async fn json<B>(res: ServiceResponse<B>) -> Value
where
    B: MessageBody,
{
    assert_eq!(
        res.headers().get(actix_http::header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    read_body_json::<Value, _>(res).await
}

/// json body, or null, with the status code
pub async fn call<S, B, E>(app: &S, req: TestRequest) -> (Value, u16)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: std::fmt::Debug,
{
    let res = call_service(app, req.to_request()).await;
    let status = res.status().as_u16();
    let body = read_body(res).await;
    (serde_json::from_slice(&body).unwrap_or(Value::Null), status)
}

/// text body with the status code
pub async fn call_text<S, B, E>(app: &S, req: TestRequest) -> (String, u16)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: std::fmt::Debug,
{
    let res = call_service(app, req.to_request()).await;
    let status = res.status().as_u16();
    let body = read_body(res).await;
    (String::from_utf8_lossy(&body).into_owned(), status)
}

/// register through the api, returns (token, user id)
pub async fn register<S, B, E>(app: &S, email: &str, role: &str) -> (String, i32)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: std::fmt::Debug,
{
    let (val, status) = call(
        app,
        post(
            "/users/register/",
            json!({
                "email": email,
                "password": "password123",
                "first_name": "Test",
                "last_name": "User",
                "role": role,
            }),
        ),
    )
    .await;
    assert_eq!(status, 201, "{}", val);
    (
        val["token"].as_str().unwrap().to_owned(),
        val["user"]["id"].as_i64().unwrap() as i32,
    )
}

pub async fn fund(state: &AppState, user_id: i32, kind: Kind, amount: i64) -> Result<()> {
    state
        .service
        .credit(
            Change::new(user_id, kind, amount, Category::AdminAdjustment, "test funding")
                .reference(format!("TEST_{}", taskbox::service::rand_hex(8))),
        )
        .await?;
    Ok(())
}

pub async fn business_plan(state: &AppState) -> Result<i32> {
    Ok(state
        .service
        .plans()
        .await?
        .into_iter()
        .find(|p| p.plan_type == entity::plan::PlanType::Business)
        .map(|p| p.id)
        .unwrap())
}

/// fund the main wallet and buy the business plan
pub async fn subscribe(state: &AppState, user_id: i32) -> Result<()> {
    let plan_id = business_plan(state).await?;
    fund(state, user_id, Kind::Main, 2500).await?;
    state.service.subscribe(user_id, plan_id).await?;
    Ok(())
}

pub fn sign(body: &str) -> String {
    payment_gateway::signature::hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body.as_bytes())
}

pub fn sign_monnify(body: &str) -> String {
    payment_gateway::signature::hmac_sha512_hex(MONNIFY_SECRET.as_bytes(), body.as_bytes())
}
