use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::deliveries::{DeliveryList, UpdateDeliveryRequest},
    entity::{
        deliveries::{
            self, ActiveModel as DeliveryActive, Column as DeliveryCol, Entity as Deliveries,
            Model as DeliveryModel,
        },
        orders::{Column as OrderCol, Entity as Orders},
        users::Role,
    },
    error::{AppError, AppResult},
    events::{self, LifecycleEvent},
    lifecycle::{DeliveryStatus, StateMachine},
    middleware::auth::AuthUser,
    models::Delivery,
    response::{ApiResponse, Meta},
    routes::params::DeliveryListQuery,
    state::AppState,
};

/// Customers see deliveries for their orders, farmers see what is assigned to them.
pub async fn list_deliveries(
    state: &AppState,
    user: &AuthUser,
    query: DeliveryListQuery,
) -> AppResult<ApiResponse<DeliveryList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Deliveries::find();
    finder = match user.role {
        Role::Admin => finder,
        Role::Farmer => finder.filter(DeliveryCol::AssignedFarmerId.eq(user.user_id)),
        Role::Customer => finder
            .join(JoinType::InnerJoin, deliveries::Relation::Order.def())
            .filter(OrderCol::CustomerId.eq(user.user_id)),
    };
    if let Some(status) = query.status {
        finder = finder.filter(DeliveryCol::Status.eq(status));
    }
    let finder = finder
        .order_by_asc(DeliveryCol::ScheduledDate)
        .order_by_desc(DeliveryCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Delivery::from)
        .collect();

    Ok(ApiResponse::success(
        "Deliveries",
        DeliveryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_delivery(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Delivery>> {
    let delivery = Deliveries::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !is_visible(&state.orm, user, &delivery).await? {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Delivery",
        Delivery::from(delivery),
        Some(Meta::empty()),
    ))
}

/// Only the assigned farmer or an admin may edit. Reaching `delivered`
/// completes the order in the same transaction.
pub async fn update_delivery(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDeliveryRequest,
) -> AppResult<ApiResponse<Delivery>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let delivery = Deliveries::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_manage(user, &delivery) {
        // The buyer may look but not edit; everyone else gets nothing.
        return Err(if is_visible(&txn, user, &delivery).await? {
            AppError::Forbidden
        } else {
            AppError::NotFound
        });
    }

    let previous = delivery.status;
    let order_id = delivery.order_id;
    let mut active: DeliveryActive = delivery.into();

    let next = match payload.status {
        Some(to) if to != previous => Some(previous.transition(to)?),
        Some(_) => None,
        None => None,
    };
    if let Some(next) = next {
        active.status = Set(next);
    }
    if let Some(driver_name) = payload.driver_name {
        active.driver_name = Set(driver_name.trim().to_string());
    }
    if let Some(contact_number) = payload.contact_number {
        active.contact_number = Set(contact_number.trim().to_string());
    }
    if let Some(date) = payload.scheduled_date {
        active.scheduled_date = Set(Some(date));
    }
    if let Some(window) = payload.scheduled_window {
        active.scheduled_window = Set(window);
    }
    active.updated_at = Set(Utc::now().into());
    let delivery = active.update(&txn).await?;

    if next == Some(DeliveryStatus::Delivered) {
        events::dispatch(&txn, LifecycleEvent::DeliveryCompleted { order_id }).await?;
    }

    txn.commit().await?;

    if let Some(next) = next {
        tracing::info!(delivery_id = %id, from = %previous, to = %next, "delivery status changed");
    }
    audit::record(
        &state.orm,
        Some(user.user_id),
        "delivery_update",
        "deliveries",
        serde_json::json!({
            "delivery_id": id,
            "previous_status": previous,
            "status": delivery.status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Delivery updated",
        Delivery::from(delivery),
        Some(Meta::empty()),
    ))
}

async fn is_visible<C>(conn: &C, user: &AuthUser, delivery: &DeliveryModel) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    Ok(match user.role {
        Role::Admin => true,
        Role::Farmer => delivery.assigned_farmer_id == Some(user.user_id),
        Role::Customer => Orders::find_by_id(delivery.order_id)
            .filter(Condition::all().add(OrderCol::CustomerId.eq(user.user_id)))
            .one(conn)
            .await?
            .is_some(),
    })
}

fn can_manage(user: &AuthUser, delivery: &DeliveryModel) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Farmer => delivery.assigned_farmer_id == Some(user.user_id),
        Role::Customer => false,
    }
}
