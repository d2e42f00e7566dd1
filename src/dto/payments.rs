use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::payments::Provider;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartPaymentRequest {
    pub provider: Provider,
}

/// Where to send the customer to finish paying.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSession {
    pub provider: Provider,
    pub redirect_url: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookPayload {
    pub payment_id: Uuid,
    pub transaction_id: Option<String>,
    pub status: WebhookOutcome,
    /// Everything else the provider sent; stored as the raw response.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub status: String,
}
