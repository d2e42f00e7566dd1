use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{PaymentSession, StartPaymentRequest, WebhookAck, WebhookPayload},
    entity::payments::Provider,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{order_id}", get(get_payment))
        .route("/orders/{order_id}/start", post(start_payment))
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/webhooks/paypal", post(paypal_webhook))
}

#[utoipa::path(
    get,
    path = "/api/payments/orders/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Payment for the order", body = ApiResponse<Payment>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::get_payment(&state, &user, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/orders/{order_id}/start",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    request_body = StartPaymentRequest,
    responses(
        (status = 200, description = "Provider session to redirect to", body = ApiResponse<PaymentSession>),
        (status = 400, description = "Payment already settled or order closed"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn start_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<StartPaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentSession>>> {
    let resp = payment_service::start_payment(&state, &user, order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhooks/stripe",
    request_body = WebhookPayload,
    params(
        ("Stripe-Signature" = String, Header, description = "Stripe webhook signature")
    ),
    responses(
        (status = 200, description = "Acknowledged", body = WebhookAck),
        (status = 400, description = "Missing signature header"),
        (status = 403, description = "Stripe webhooks are not configured")
    ),
    tag = "Payments"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<Json<WebhookAck>> {
    let ack = payment_service::handle_webhook(&state, Provider::Stripe, &headers, payload).await?;
    Ok(Json(ack))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhooks/paypal",
    request_body = WebhookPayload,
    params(
        ("Paypal-Transmission-Id" = String, Header, description = "PayPal transmission id")
    ),
    responses(
        (status = 200, description = "Acknowledged", body = WebhookAck),
        (status = 400, description = "Missing transmission header"),
        (status = 403, description = "PayPal credentials are not configured")
    ),
    tag = "Payments"
)]
pub async fn paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<Json<WebhookAck>> {
    let ack = payment_service::handle_webhook(&state, Provider::Paypal, &headers, payload).await?;
    Ok(Json(ack))
}
