mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::setup_state_with;
use ruralmarknet::{
    app::build_app,
    config::{AppConfig, PaymentConfig},
    routes::params::MAX_PAGE,
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app_with(payments: PaymentConfig) -> anyhow::Result<Router> {
    let mut config = AppConfig::for_database("sqlite::memory:");
    config.payments = payments;
    Ok(build_app(setup_state_with(config).await?))
}

async fn send(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn webhook_body() -> Value {
    json!({
        "payment_id": "00000000-0000-0000-0000-000000000000",
        "status": "succeeded"
    })
}

#[tokio::test]
async fn health_and_fallback() -> anyhow::Result<()> {
    let app = app_with(PaymentConfig::default()).await?;

    let (status, body) = send(&app, Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "up");

    let (status, body) = send(&app, Request::get("/nowhere").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nowhere");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> anyhow::Result<()> {
    let app = app_with(PaymentConfig::default()).await?;

    let (status, body) = send(&app, Request::get("/api/orders").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"]["error"], body["message"]);

    for uri in ["/api/dashboard/customer", "/api/dashboard/farmer", "/api/admin/reports/financial"] {
        let (status, _) = send(&app, Request::get(uri).body(Body::empty())?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let request = Request::get("/api/cart")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn register_login_and_browse() -> anyhow::Result<()> {
    let app = app_with(PaymentConfig::default()).await?;

    let register = json!({
        "email": "Farmer@Example.com",
        "password": "password123",
        "full_name": "Ravi",
        "role": "farmer"
    });
    let (status, body) = send(&app, json_request("POST", "/api/auth/register", register.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "farmer@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = send(&app, json_request("POST", "/api/auth/register", register)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let admin = json!({
        "email": "boss@example.com",
        "password": "password123",
        "full_name": "Boss",
        "role": "admin"
    });
    let (status, _) = send(&app, json_request("POST", "/api/auth/register", admin)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let login = json!({ "email": "farmer@example.com", "password": "password123" });
    let (status, body) = send(&app, json_request("POST", "/api/auth/login", login)).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().expect("token").to_string();
    assert!(token.starts_with("Bearer "));

    let product = json!({
        "name": "Spinach",
        "category": "vegetables",
        "unit": "bunch",
        "price": 2000,
        "stock": 15
    });
    let mut request = json_request("POST", "/api/products", product);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, token.parse()?);
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["available"], true);

    let (status, body) = send(&app, Request::get("/api/products?q=spin").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let invalid = json!({
        "name": "Broken",
        "category": "vegetables",
        "price": 0,
        "stock": 1
    });
    let mut request = json_request("POST", "/api/products", invalid);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, token.parse()?);
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn webhooks_reject_unconfigured_providers() -> anyhow::Result<()> {
    let app = app_with(PaymentConfig::default()).await?;

    let (status, _) = send(&app, json_request("POST", "/api/payments/webhooks/stripe", webhook_body())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, json_request("POST", "/api/payments/webhooks/paypal", webhook_body())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn webhooks_require_provider_headers() -> anyhow::Result<()> {
    let app = app_with(PaymentConfig {
        stripe_api_key: None,
        stripe_webhook_secret: Some("whsec_test".into()),
        paypal_client_id: Some("client".into()),
        paypal_client_secret: Some("secret".into()),
    })
    .await?;

    let (status, _) = send(&app, json_request("POST", "/api/payments/webhooks/stripe", webhook_body())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, json_request("POST", "/api/payments/webhooks/paypal", webhook_body())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut request = json_request("POST", "/api/payments/webhooks/stripe", webhook_body());
    request
        .headers_mut()
        .insert("stripe-signature", "t=1,v1=abc".parse()?);
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    Ok(())
}

#[tokio::test]
async fn out_of_range_pages_are_clamped() -> anyhow::Result<()> {
    let app = app_with(PaymentConfig::default()).await?;

    let request = Request::get("/api/products?page=9223372036854775807").body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["page"], MAX_PAGE);
    assert_eq!(body["data"], json!([]));

    let request = Request::get("/api/products?page=-3&per_page=0").body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["per_page"], 1);
    assert_eq!(body["meta"]["total_pages"], 0);
    Ok(())
}
