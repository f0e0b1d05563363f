use actix_web::{test::init_service, web};
use anyhow::Result;
use entity::{user, wallet::Kind};
use httpmock::{Method::GET, Method::POST, MockServer};
use serde_json::json;
use taskbox::create_web_app;
use util::{
    auth_get, auth_post, call, call_text, create_test_state, fund, get, register, sign,
    sign_monnify, webhook, FLUTTERWAVE_HASH,
};

mod util;

const PAYSTACK_HOOK: &str = "/payments/webhook/paystack/";
const PAYSTACK_HEADER: &str = "x-paystack-signature";

async fn mock_initialize(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transaction/initialize");
            then.status(200).json_body(json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": "https://checkout.paystack.com/abc",
                    "access_code": "abc"
                }
            }));
        })
        .await;
}

async fn mock_payout(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/bank/resolve");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"account_number": "0123456789", "account_name": "ADA LOVELACE"}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transferrecipient");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"recipient_code": "RCP_test"}
            }));
        })
        .await;
}

#[actix_rt::test]
async fn funding_webhook_credits_once() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_initialize(&server).await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    // below the minimum
    let (_, status) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 500})),
    )
    .await;
    assert_eq!(status, 400);

    let (val, status) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 20_000})),
    )
    .await;
    assert_eq!(status, 200, "{}", val);
    assert_eq!(val["authorization_url"], "https://checkout.paystack.com/abc");
    assert_eq!(val["gateway"], "paystack");
    let reference = val["reference"].as_str().unwrap().to_owned();
    assert!(reference.starts_with("PS_"));
    let payment_id = val["payment_id"].as_str().unwrap().to_owned();

    let body = json!({
        "event": "charge.success",
        "data": {"reference": reference, "amount": 20_000, "status": "success"}
    })
    .to_string();

    let (text, status) = call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, None, &body)).await;
    assert_eq!((text.as_str(), status), ("No signature", 400));
    let (text, status) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some("00"), &body)).await;
    assert_eq!((text.as_str(), status), ("Invalid signature", 400));
    let garbage = "not json";
    let (text, status) = call_text(
        &app,
        webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(garbage)), garbage),
    )
    .await;
    assert_eq!((text.as_str(), status), ("Invalid JSON", 400));
    assert_eq!(data.service.balances(id).await?.main, 0);

    let (text, status) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!((text.as_str(), status), ("OK", 200));
    assert_eq!(data.service.balances(id).await?.main, 20_000);

    let (text, status) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!((text.as_str(), status), ("Duplicate event ignored", 200));
    assert_eq!(data.service.balances(id).await?.main, 20_000);

    let path = format!("/payments/transactions/{}/", payment_id);
    let (val, status) = call(&app, auth_get(&path, &token)).await;
    assert_eq!(status, 200);
    assert_eq!(val["transaction"]["status"], "success");
    assert_eq!(val["transaction"]["balance_after"], 20_000);
    assert_eq!(
        val["detail"]["authorization_url"],
        "https://checkout.paystack.com/abc"
    );

    let (other, _) = register(&app, "bob@example.com", "member").await;
    let (_, status) = call(&app, auth_get(&path, &other)).await;
    assert_eq!(status, 404);

    let (val, _) = call(&app, auth_get("/payments/transactions/", &token)).await;
    assert_eq!(val["transactions"].as_array().unwrap().len(), 1);

    assert!(data.service.audit_wallets(false).await?.is_empty());
    Ok(())
}

#[actix_rt::test]
async fn initialize_failure_marks_payment_failed() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transaction/initialize");
            then.status(400)
                .json_body(json!({"status": false, "message": "Invalid key"}));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;
    let (token, _) = register(&app, "ada@example.com", "member").await;

    let (val, status) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 20_000})),
    )
    .await;
    assert_eq!(status, 502);
    assert_eq!(val["error"], true);

    let (val, _) = call(&app, auth_get("/payments/transactions/", &token)).await;
    let list = val["transactions"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["status"], "failed");
    Ok(())
}

#[actix_rt::test]
async fn failed_transfer_refunds_once() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_payout(&server).await;
    let transfer = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/transfer")
                .json_body_partial(r#"{"amount": 20000, "recipient": "RCP_test"}"#);
            then.status(200).json_body(json!({
                "status": true,
                "data": {"status": "pending", "transfer_code": "TRF_test"}
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;
    fund(&data, id, Kind::Main, 50_000).await?;

    let (_, status) = call(
        &app,
        auth_post(
            "/payments/withdraw/",
            &token,
            json!({"amount": 90_000, "bank_code": "058", "account_number": "0123456789"}),
        ),
    )
    .await;
    assert_eq!(status, 400);

    let (val, status) = call(
        &app,
        auth_post(
            "/payments/withdraw/",
            &token,
            json!({"amount": 20_000, "bank_code": "058", "account_number": "0123456789"}),
        ),
    )
    .await;
    assert_eq!(status, 200, "{}", val);
    transfer.assert_async().await;
    assert_eq!(val["payment"]["status"], "pending");
    assert_eq!(val["payment"]["type"], "withdrawal");
    let reference = val["payment"]["internal_reference"]
        .as_str()
        .unwrap()
        .to_owned();
    assert_eq!(data.service.balances(id).await?.main, 30_000);

    let payment_id = val["payment"]["id"].as_str().unwrap().parse()?;
    let detail = data.service.payment_detail(payment_id).await?.unwrap();
    assert_eq!(detail.transfer_code.as_deref(), Some("TRF_test"));
    assert_eq!(detail.account_name.as_deref(), Some("ADA LOVELACE"));

    let body = json!({
        "event": "transfer.failed",
        "data": {"reference": reference, "amount": 20_000, "status": "failed"}
    })
    .to_string();
    let (text, _) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!(text, "OK");
    assert_eq!(data.service.balances(id).await?.main, 50_000);

    let (text, _) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!(text, "Duplicate event ignored");

    // a different event for the same transfer finds it already failed
    let body = json!({
        "event": "transfer.reversed",
        "data": {"reference": reference, "amount": 20_000, "status": "reversed"}
    })
    .to_string();
    let (text, _) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!(text, "OK");
    assert_eq!(data.service.balances(id).await?.main, 50_000);

    let payment = data.service.get_payment(payment_id).await?.unwrap();
    assert_eq!(payment.status, entity::payment::Status::Failed);
    assert!(data.service.audit_wallets(false).await?.is_empty());
    Ok(())
}

#[actix_rt::test]
async fn transfer_error_refunds() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_payout(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transfer");
            then.status(400).json_body(json!({
                "status": false,
                "message": "Your balance is not enough to fulfil this request"
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;
    fund(&data, id, Kind::Main, 50_000).await?;

    let (_, status) = call(
        &app,
        auth_post(
            "/payments/withdraw/",
            &token,
            json!({"amount": 20_000, "bank_code": "058", "account_number": "0123456789"}),
        ),
    )
    .await;
    assert_eq!(status, 502);
    assert_eq!(data.service.balances(id).await?.main, 50_000);

    let (val, _) = call(&app, auth_get("/payments/transactions/", &token)).await;
    assert_eq!(val["transactions"][0]["status"], "failed");
    let (val, _) = call(&app, auth_get("/wallets/records/", &token)).await;
    let records = val["records"].as_array().unwrap();
    assert_eq!(records[0]["category"], "refund");
    assert_eq!(records[1]["category"], "withdrawal");
    Ok(())
}

#[actix_rt::test]
async fn approved_request_pays_out() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_payout(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transfer");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"status": "pending", "transfer_code": "TRF_test"}
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;
    let (admin_token, admin_id) = register(&app, "root@example.com", "member").await;
    data.service.set_role(admin_id, user::Role::Admin).await?;
    fund(&data, id, Kind::Main, 50_000).await?;

    let (val, _) = call(
        &app,
        auth_post(
            "/wallets/withdrawals/",
            &token,
            json!({"amount": 40_000, "bank_code": "058", "account_number": "0123456789"}),
        ),
    )
    .await;
    let request_id = val["withdrawal"]["id"].as_i64().unwrap();

    // held by the request
    let (_, status) = call(
        &app,
        auth_post(
            "/payments/withdraw/",
            &token,
            json!({"amount": 20_000, "bank_code": "058", "account_number": "0123456789"}),
        ),
    )
    .await;
    assert_eq!(status, 400);

    let path = format!("/wallets/withdrawals/{}/approve/", request_id);
    let (val, status) = call(&app, auth_post(&path, &admin_token, json!({}))).await;
    assert_eq!(status, 200, "{}", val);
    assert_eq!(val["withdrawal"]["status"], "approved");
    assert_eq!(val["withdrawal"]["processed_by"], admin_id);
    let payment_id: uuid::Uuid = val["withdrawal"]["payment_id"].as_str().unwrap().parse()?;
    assert_eq!(data.service.balances(id).await?.main, 10_000);

    let (_, status) = call(&app, auth_post(&path, &admin_token, json!({}))).await;
    assert_eq!(status, 400);

    let payment = data.service.get_payment(payment_id).await?.unwrap();
    let body = json!({
        "event": "transfer.success",
        "data": {"reference": payment.internal_reference, "amount": 40_000, "status": "success"}
    })
    .to_string();
    let (text, _) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!(text, "OK");

    let (val, _) = call(&app, auth_get("/wallets/withdrawals/", &token)).await;
    assert_eq!(val["withdrawals"][0]["status"], "completed");
    assert_eq!(data.service.balances(id).await?.main, 10_000);
    Ok(())
}

#[actix_rt::test]
async fn reconcile_pending_funding() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_initialize(&server).await;
    let verify = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/transaction/verify/PS_");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"status": "success", "amount": 20_000, "currency": "NGN"}
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    let (val, _) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 20_000})),
    )
    .await;
    let reference = val["reference"].as_str().unwrap().to_owned();

    let path = format!("/payments/fund/callback/?trxref={}", reference);
    let (_, status) = call(&app, get(&path)).await;
    assert_eq!(status, 401);
    let (other, _) = register(&app, "bob@example.com", "member").await;
    let (_, status) = call(&app, auth_get(&path, &other)).await;
    assert_eq!(status, 404);

    // the redirect only verifies
    let (val, status) = call(&app, auth_get(&path, &token)).await;
    assert_eq!(status, 200);
    assert_eq!(val["reference"], reference.as_str());
    assert_eq!(val["status"], "pending");
    assert_eq!(val["gateway_status"], "success");
    assert_eq!(val["gateway_amount"], 20_000);
    assert!(val.get("metadata").is_none());
    assert!(val.get("gateway_response").is_none());
    assert_eq!(data.service.balances(id).await?.main, 0);

    let (_, status) = call(&app, auth_get("/payments/fund/callback/", &token)).await;
    assert_eq!(status, 400);

    let report = data.service.reconcile_payments(0, 3600).await?;
    assert_eq!(report.checked, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(data.service.balances(id).await?.main, 20_000);
    verify.assert_hits_async(2).await;

    let report = data.service.reconcile_payments(0, 3600).await?;
    assert_eq!(report.checked, 0);
    assert_eq!(data.service.balances(id).await?.main, 20_000);
    Ok(())
}

#[actix_rt::test]
async fn flutterwave_webhook_hash() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/payments");
            then.status(200).json_body(json!({
                "status": "success",
                "message": "Hosted Link",
                "data": {"link": "https://checkout.flutterwave.com/v3/hosted/pay/abc"}
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    let (val, status) = call(
        &app,
        auth_post(
            "/payments/fund/initiate/",
            &token,
            json!({"amount": 20_000, "gateway": "flutterwave"}),
        ),
    )
    .await;
    assert_eq!(status, 200, "{}", val);
    let reference = val["reference"].as_str().unwrap().to_owned();
    assert!(reference.starts_with("FLW_"));

    let body = json!({
        "event": "charge.completed",
        "data": {"tx_ref": reference, "status": "successful", "amount": 200, "currency": "NGN"}
    })
    .to_string();
    let hook = "/payments/webhook/flutterwave/";
    let (text, status) = call_text(&app, webhook(hook, "verif-hash", Some("wrong"), &body)).await;
    assert_eq!((text.as_str(), status), ("Invalid signature", 400));

    let (text, status) =
        call_text(&app, webhook(hook, "verif-hash", Some(FLUTTERWAVE_HASH), &body)).await;
    assert_eq!((text.as_str(), status), ("OK", 200));
    assert_eq!(data.service.balances(id).await?.main, 20_000);
    Ok(())
}

#[actix_rt::test]
async fn banks_and_gateway_switch() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/bank");
            then.status(200).json_body(json!({
                "status": true,
                "data": [
                    {"name": "Access Bank", "code": "044"},
                    {"name": "Guaranty Trust Bank", "code": "058"}
                ]
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, _) = register(&app, "ada@example.com", "member").await;
    let (admin_token, admin_id) = register(&app, "root@example.com", "member").await;
    data.service.set_role(admin_id, user::Role::Admin).await?;

    let (_, status) = call(&app, get("/payments/banks/?gateway=paystack")).await;
    assert_eq!(status, 401);
    let (val, status) = call(&app, auth_get("/payments/banks/?gateway=paystack", &token)).await;
    assert_eq!(status, 200);
    let banks = val["banks"].as_array().unwrap();
    assert_eq!(banks.len(), 2);
    assert_eq!(banks[1]["code"], "058");

    let (_, status) = call(
        &app,
        auth_post(
            "/payments/verify-account/",
            &token,
            json!({"account_number": "123", "bank_code": "058"}),
        ),
    )
    .await;
    assert_eq!(status, 400);

    let (_, status) = call(
        &app,
        auth_post("/payments/gateways/paystack/", &token, json!({"is_active": false})),
    )
    .await;
    assert_eq!(status, 403);
    let (val, status) = call(
        &app,
        auth_post("/payments/gateways/paystack/", &admin_token, json!({"is_active": false})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(val["is_active"], false);

    let (val, status) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 20_000})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(val["message"], "Payment gateway Paystack is not available");

    // rows keep the admin switch
    data.service.setup_gateways().await?;
    let (_, status) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 20_000})),
    )
    .await;
    assert_eq!(status, 400);

    let (val, _) = call(&app, get("/info")).await;
    assert_eq!(val["gateways"].as_array().unwrap().len(), 3);
    Ok(())
}

async fn mock_verify_transfer(
    server: &MockServer,
    reference: &str,
    status: u16,
    body: serde_json::Value,
) {
    let path = format!("/transfer/verify/{}", reference);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(status).json_body(body);
        })
        .await;
}

#[actix_rt::test]
async fn reconcile_pending_withdrawals() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_payout(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transfer");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"status": "pending", "transfer_code": "TRF_test"}
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;
    fund(&data, id, Kind::Main, 100_000).await?;

    let mut references = vec![];
    for _ in 0..3 {
        let (val, status) = call(
            &app,
            auth_post(
                "/payments/withdraw/",
                &token,
                json!({"amount": 20_000, "bank_code": "058", "account_number": "0123456789"}),
            ),
        )
        .await;
        assert_eq!(status, 200, "{}", val);
        references.push((
            val["payment"]["internal_reference"].as_str().unwrap().to_owned(),
            val["payment"]["id"].as_str().unwrap().parse::<uuid::Uuid>()?,
        ));
    }
    assert_eq!(data.service.balances(id).await?.main, 40_000);

    mock_verify_transfer(
        &server,
        &references[0].0,
        200,
        json!({"status": true, "data": {"status": "success", "transfer_code": "TRF_test"}}),
    )
    .await;
    mock_verify_transfer(
        &server,
        &references[1].0,
        200,
        json!({"status": true, "data": {"status": "failed", "transfer_code": "TRF_test"}}),
    )
    .await;
    // debited, but the transfer call never reached the provider
    mock_verify_transfer(
        &server,
        &references[2].0,
        404,
        json!({"status": false, "message": "Transfer not found"}),
    )
    .await;

    let report = data.service.reconcile_payments(0, 3600).await?;
    assert_eq!(report.checked, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.errors, 0);
    assert_eq!(data.service.balances(id).await?.main, 80_000);

    let statuses = [
        entity::payment::Status::Success,
        entity::payment::Status::Failed,
        entity::payment::Status::Failed,
    ];
    for ((_, payment_id), status) in references.iter().zip(statuses) {
        let payment = data.service.get_payment(*payment_id).await?.unwrap();
        assert_eq!(payment.status, status);
    }

    // nothing left pending, refunds are not repeated
    let report = data.service.reconcile_payments(0, 3600).await?;
    assert_eq!(report.checked, 0);
    assert_eq!(data.service.balances(id).await?.main, 80_000);
    assert!(data.service.audit_wallets(false).await?.is_empty());
    Ok(())
}

#[actix_rt::test]
async fn monnify_webhook_funds_wallet() -> Result<()> {
    let server = MockServer::start_async().await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/auth/login");
            then.status(200).json_body(json!({
                "requestSuccessful": true,
                "responseMessage": "success",
                "responseBody": {"accessToken": "token", "expiresIn": 3600}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/merchant/transactions/init-transaction");
            then.status(200).json_body(json!({
                "requestSuccessful": true,
                "responseMessage": "success",
                "responseBody": {
                    "transactionReference": "MNFY|20231010|000001",
                    "checkoutUrl": "https://sandbox.sdk.monnify.com/checkout/MNFY"
                }
            }));
        })
        .await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    let (val, status) = call(
        &app,
        auth_post(
            "/payments/fund/initiate/",
            &token,
            json!({"amount": 20_000, "gateway": "monnify"}),
        ),
    )
    .await;
    assert_eq!(status, 200, "{}", val);
    assert_eq!(val["gateway"], "monnify");
    assert_eq!(
        val["authorization_url"],
        "https://sandbox.sdk.monnify.com/checkout/MNFY"
    );
    let reference = val["reference"].as_str().unwrap().to_owned();
    assert!(reference.starts_with("MNFY_"));
    login.assert_async().await;

    let body = json!({
        "eventType": "SUCCESSFUL_TRANSACTION",
        "eventData": {
            "paymentReference": reference,
            "transactionReference": "MNFY|20231010|000001",
            "amountPaid": "200.00",
            "paymentStatus": "PAID"
        }
    })
    .to_string();
    let hook = "/payments/webhook/monnify/";
    let header = "monnify-signature";

    // signed with another key
    let (text, status) = call_text(&app, webhook(hook, header, Some(&sign(&body)), &body)).await;
    assert_eq!((text.as_str(), status), ("Invalid signature", 400));
    assert_eq!(data.service.balances(id).await?.main, 0);

    let (text, status) =
        call_text(&app, webhook(hook, header, Some(&sign_monnify(&body)), &body)).await;
    assert_eq!((text.as_str(), status), ("OK", 200));
    assert_eq!(data.service.balances(id).await?.main, 20_000);

    let (text, _) =
        call_text(&app, webhook(hook, header, Some(&sign_monnify(&body)), &body)).await;
    assert_eq!(text, "Duplicate event ignored");
    assert_eq!(data.service.balances(id).await?.main, 20_000);

    let (val, _) = call(&app, auth_get("/payments/transactions/", &token)).await;
    assert_eq!(val["transactions"][0]["status"], "success");
    assert!(data.service.audit_wallets(false).await?.is_empty());
    Ok(())
}

#[actix_rt::test]
async fn webhook_only_settles_its_own_gateway() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_initialize(&server).await;
    let (state, _dir) = create_test_state(Some(&server)).await?;
    let data = web::Data::new(state);
    let app = init_service(create_web_app(data.clone())).await;
    let (token, id) = register(&app, "ada@example.com", "member").await;

    let (val, _) = call(
        &app,
        auth_post("/payments/fund/initiate/", &token, json!({"amount": 20_000})),
    )
    .await;
    let reference = val["reference"].as_str().unwrap().to_owned();
    assert!(reference.starts_with("PS_"));

    // a correctly signed flutterwave event naming a paystack payment
    let body = json!({
        "event": "charge.completed",
        "data": {"tx_ref": reference, "status": "successful", "amount": 200, "currency": "NGN"}
    })
    .to_string();
    let (_, status) = call_text(
        &app,
        webhook("/payments/webhook/flutterwave/", "verif-hash", Some(FLUTTERWAVE_HASH), &body),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(data.service.balances(id).await?.main, 0);

    let body = json!({
        "event": "charge.success",
        "data": {"reference": reference, "amount": 20_000, "status": "success"}
    })
    .to_string();
    let (text, _) =
        call_text(&app, webhook(PAYSTACK_HOOK, PAYSTACK_HEADER, Some(&sign(&body)), &body)).await;
    assert_eq!(text, "OK");
    assert_eq!(data.service.balances(id).await?.main, 20_000);
    Ok(())
}
