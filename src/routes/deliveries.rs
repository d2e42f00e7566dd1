use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::deliveries::{DeliveryList, UpdateDeliveryRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Delivery,
    response::ApiResponse,
    routes::params::DeliveryListQuery,
    services::delivery_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries))
        .route("/{id}", get(get_delivery).patch(update_delivery))
}

#[utoipa::path(
    get,
    path = "/api/deliveries",
    params(DeliveryListQuery),
    responses(
        (status = 200, description = "Deliveries visible to the caller", body = ApiResponse<DeliveryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DeliveryListQuery>,
) -> AppResult<Json<ApiResponse<DeliveryList>>> {
    let resp = delivery_service::list_deliveries(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    params(
        ("id" = Uuid, Path, description = "Delivery ID")
    ),
    responses(
        (status = 200, description = "Get delivery", body = ApiResponse<Delivery>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Delivery>>> {
    let resp = delivery_service::get_delivery(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/deliveries/{id}",
    params(
        ("id" = Uuid, Path, description = "Delivery ID")
    ),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery updated", body = ApiResponse<Delivery>),
        (status = 403, description = "Not the assigned farmer"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Status change not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Deliveries"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryRequest>,
) -> AppResult<Json<ApiResponse<Delivery>>> {
    let resp = delivery_service::update_delivery(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
