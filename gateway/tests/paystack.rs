use anyhow::Result;
use httpmock::{Method::GET, Method::POST, MockServer};
use payment_gateway::{
    CheckoutRequest, Gateway, PaymentStatus, Paystack, RecipientRequest, TransferRequest,
    TransferStatus,
};
use serde_json::json;

fn client(server: &MockServer) -> Result<Paystack> {
    Ok(Paystack::new(
        "sk_test".to_owned(),
        Some(server.base_url()),
        None,
    )?)
}

#[tokio::test]
async fn initialize_and_verify() -> Result<()> {
    let server = MockServer::start_async().await;
    let init = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/transaction/initialize")
                .header("Authorization", "Bearer sk_test")
                .json_body_partial(r#"{"amount": 500000, "reference": "PS_1", "email": "a@b.com"}"#);
            then.status(200).json_body(json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": "https://checkout.paystack.com/abc",
                    "access_code": "abc",
                    "reference": "PS_1"
                }
            }));
        })
        .await;
    let verify = server
        .mock_async(|when, then| {
            when.method(GET).path("/transaction/verify/PS_1");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"status": "success", "amount": 500000, "currency": "NGN", "reference": "PS_1"}
            }));
        })
        .await;

    let client = client(&server)?;
    let checkout = client
        .initialize(&CheckoutRequest {
            reference: "PS_1".to_owned(),
            amount: 500_000,
            currency: "NGN".to_owned(),
            email: "a@b.com".to_owned(),
            ..Default::default()
        })
        .await?;
    assert_eq!(checkout.authorization_url, "https://checkout.paystack.com/abc");
    assert_eq!(checkout.access_code.as_deref(), Some("abc"));
    init.assert_async().await;

    let v = client.verify("PS_1").await?;
    assert_eq!(v.status, PaymentStatus::Success);
    assert_eq!(v.amount, Some(500_000));
    verify.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn api_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/transaction/initialize");
            then.status(400)
                .json_body(json!({"status": false, "message": "Invalid key"}));
        })
        .await;
    // 200 with status false is also a failure
    server
        .mock_async(|when, then| {
            when.method(GET).path("/transaction/verify/PS_2");
            then.status(200)
                .json_body(json!({"status": false, "message": "Transaction reference not found"}));
        })
        .await;

    let client = client(&server)?;
    let err = client
        .initialize(&CheckoutRequest {
            reference: "PS_2".to_owned(),
            amount: 100,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid key"));

    let err = client.verify("PS_2").await.unwrap_err();
    assert!(err.to_string().contains("not found"));
    Ok(())
}

#[tokio::test]
async fn banks_and_transfer() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/bank");
            then.status(200).json_body(json!({
                "status": true,
                "data": [{"name": "Access Bank", "code": "044"}, {"name": "GTBank", "code": "058"}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/bank/resolve")
                .query_param("account_number", "0123456789")
                .query_param("bank_code", "044");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"account_number": "0123456789", "account_name": "JANE DOE"}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/transferrecipient")
                .json_body_partial(r#"{"type": "nuban", "currency": "NGN"}"#);
            then.status(201).json_body(json!({
                "status": true,
                "data": {"recipient_code": "RCP_1"}
            }));
        })
        .await;
    let transfer = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/transfer")
                .json_body_partial(r#"{"source": "balance", "amount": 150000, "recipient": "RCP_1"}"#);
            then.status(200).json_body(json!({
                "status": true,
                "data": {"reference": "WD_1", "transfer_code": "TRF_1", "status": "pending"}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/transfer/verify/WD_1");
            then.status(200).json_body(json!({
                "status": true,
                "data": {"reference": "WD_1", "transfer_code": "TRF_1", "status": "reversed"}
            }));
        })
        .await;

    let client = client(&server)?;
    let banks = client.list_banks().await?;
    assert_eq!(banks.len(), 2);
    assert_eq!(banks[1].code, "058");

    let account = client.resolve_account("0123456789", "044").await?;
    assert_eq!(account.account_name, "JANE DOE");

    let recipient = client
        .create_recipient(&RecipientRequest {
            name: account.account_name.clone(),
            account_number: "0123456789".to_owned(),
            bank_code: "044".to_owned(),
            currency: "NGN".to_owned(),
        })
        .await?;
    assert_eq!(recipient.code, "RCP_1");

    let t = client
        .transfer(&TransferRequest {
            reference: "WD_1".to_owned(),
            amount: 150_000,
            currency: "NGN".to_owned(),
            recipient_code: recipient.code,
            bank_code: "044".to_owned(),
            account_number: "0123456789".to_owned(),
            narration: "withdrawal".to_owned(),
        })
        .await?;
    assert_eq!(t.status, TransferStatus::Pending);
    assert_eq!(t.transfer_code.as_deref(), Some("TRF_1"));
    transfer.assert_async().await;

    let t = client.verify_transfer("WD_1", None).await?;
    assert_eq!(t.status, TransferStatus::Reversed);
    Ok(())
}
