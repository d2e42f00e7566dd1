use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::dashboard::{CustomerDashboard, FarmerDashboard},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer", get(customer_dashboard))
        .route("/farmer", get(farmer_dashboard))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/customer",
    responses(
        (status = 200, description = "Order, spend and delivery summary", body = ApiResponse<CustomerDashboard>),
        (status = 403, description = "Customers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn customer_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CustomerDashboard>>> {
    let resp = dashboard_service::customer_dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/farmer",
    responses(
        (status = 200, description = "Listings, revenue and delivery summary", body = ApiResponse<FarmerDashboard>),
        (status = 403, description = "Farmers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn farmer_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FarmerDashboard>>> {
    let resp = dashboard_service::farmer_dashboard(&state, &user).await?;
    Ok(Json(resp))
}
