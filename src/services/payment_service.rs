use axum::http::HeaderMap;
use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    config::PaymentConfig,
    dto::payments::{PaymentSession, StartPaymentRequest, WebhookAck, WebhookOutcome, WebhookPayload},
    entity::{
        orders::Entity as Orders,
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Provider},
    },
    error::{AppError, AppResult},
    lifecycle::{PaymentStatus, StateMachine},
    middleware::auth::AuthUser,
    models::Payment,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
pub const PAYPAL_TRANSMISSION_HEADER: &str = "paypal-transmission-id";

const STRIPE_CHECKOUT_URL: &str = "https://checkout.stripe.com/pay/mock-session";
const STRIPE_CLIENT_SECRET: &str = "mock_client_secret";
const PAYPAL_CHECKOUT_URL: &str = "https://www.paypal.com/checkoutnow?token=mock-token";

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    // Payment details stay between the paying customer and staff.
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .filter(|o| user.is_admin() || o.customer_id == user.user_id)
        .ok_or(AppError::NotFound)?;

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Payment",
        Payment::from(payment),
        Some(Meta::empty()),
    ))
}

/// Hands the customer to the chosen provider. Switching provider is allowed
/// while the payment is still pending.
pub async fn start_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: StartPaymentRequest,
) -> AppResult<ApiResponse<PaymentSession>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .filter(|o| o.customer_id == user.user_id)
        .ok_or(AppError::NotFound)?;

    if !order.status.is_open() {
        return Err(AppError::BadRequest(format!(
            "Order is {} and cannot be paid",
            order.status
        )));
    }

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if payment.status != PaymentStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Payment is already {}",
            payment.status
        )));
    }

    let payment = if payment.provider != payload.provider {
        let mut active: PaymentActive = payment.into();
        active.provider = Set(payload.provider);
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?
    } else {
        payment
    };

    let session = session_for(payment.provider, order.id);
    tracing::info!(
        order_id = %order.id,
        payment_id = %payment.id,
        provider = payment.provider.as_str(),
        "payment session started"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "payment_start",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "provider": payment.provider }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment session",
        session,
        Some(Meta::empty()),
    ))
}

fn session_for(provider: Provider, order_id: Uuid) -> PaymentSession {
    match provider {
        Provider::Stripe => PaymentSession {
            provider,
            redirect_url: STRIPE_CHECKOUT_URL.to_string(),
            client_secret: Some(STRIPE_CLIENT_SECRET.to_string()),
        },
        Provider::Paypal => PaymentSession {
            provider,
            redirect_url: PAYPAL_CHECKOUT_URL.to_string(),
            client_secret: None,
        },
        Provider::CashOnDelivery => PaymentSession {
            provider,
            redirect_url: format!("/api/orders/{order_id}"),
            client_secret: None,
        },
    }
}

/// Rejects webhooks for a provider that isn't configured or that arrive
/// without the provider's signature header.
pub fn check_webhook(
    config: &PaymentConfig,
    provider: Provider,
    headers: &HeaderMap,
) -> AppResult<()> {
    let (configured, header) = match provider {
        Provider::Stripe => (
            config.stripe_webhook_secret.is_some(),
            STRIPE_SIGNATURE_HEADER,
        ),
        Provider::Paypal => (config.paypal_configured(), PAYPAL_TRANSMISSION_HEADER),
        Provider::CashOnDelivery => (false, ""),
    };
    if !configured {
        return Err(AppError::Forbidden);
    }
    // TODO: verify the Stripe-Signature HMAC and call PayPal's verify-webhook-signature API.
    if !headers.contains_key(header) {
        return Err(AppError::BadRequest(format!("Missing {header} header")));
    }
    Ok(())
}

pub async fn handle_webhook(
    state: &AppState,
    provider: Provider,
    headers: &HeaderMap,
    payload: WebhookPayload,
) -> AppResult<WebhookAck> {
    check_webhook(&state.config.payments, provider, headers)?;

    let target = match payload.status {
        WebhookOutcome::Succeeded => PaymentStatus::Paid,
        WebhookOutcome::Failed => PaymentStatus::Failed,
    };

    let txn = state.orm.begin().await?;
    let payment = Payments::find_by_id(payload.payment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let Some(payment) = payment else {
        tracing::warn!(payment_id = %payload.payment_id, provider = provider.as_str(), "webhook for unknown payment");
        return Ok(ignored());
    };

    if payment.provider != provider {
        tracing::warn!(
            payment_id = %payment.id,
            expected = payment.provider.as_str(),
            got = provider.as_str(),
            "webhook from the wrong provider"
        );
        return Ok(ignored());
    }

    let previous = payment.status;
    let next = match previous.transition(target) {
        Ok(next) => next,
        Err(err) => {
            // Providers retry deliveries; replays must not error.
            tracing::info!(payment_id = %payment.id, error = %err, "webhook ignored");
            return Ok(ignored());
        }
    };

    let mut raw = payload.extra;
    raw.insert("status".into(), Value::from(match payload.status {
        WebhookOutcome::Succeeded => "succeeded",
        WebhookOutcome::Failed => "failed",
    }));

    let mut active: PaymentActive = payment.into();
    active.status = Set(next);
    if let Some(transaction_id) = payload.transaction_id {
        active.transaction_id = Set(Some(transaction_id));
    }
    active.raw_response = Set(Some(Value::Object(raw)));
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        from = %previous,
        to = %next,
        provider = provider.as_str(),
        "payment status changed"
    );
    audit::record(
        &state.orm,
        None,
        "payment_webhook",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "status": payment.status }),
    )
    .await;

    Ok(WebhookAck {
        status: "ok".to_string(),
    })
}

fn ignored() -> WebhookAck {
    WebhookAck {
        status: "ignored".to_string(),
    }
}

/// Admin only: `paid -> refunded`.
pub async fn refund_payment(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    crate::middleware::auth::ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let payment = Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let next = payment.status.transition(PaymentStatus::Refunded)?;
    let mut active: PaymentActive = payment.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(payment_id = %payment.id, "payment refunded");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "payment_refund",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "amount": payment.amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment refunded",
        Payment::from(payment),
        Some(Meta::empty()),
    ))
}
