use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        deliveries::{Column as DeliveryCol, Entity as Deliveries},
        order_items::{self, ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
        products::{Column as ProdCol, Entity as Products},
        users::Role,
    },
    error::{AppError, AppResult},
    events::{self, LifecycleEvent},
    lifecycle::{OrderStatus, PaymentStatus, StateMachine},
    middleware::auth::{AuthUser, ensure_customer, ensure_farmer},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub const CURRENCY: &str = "INR";

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let finder = Orders::find().filter(OrderCol::CustomerId.eq(user.user_id));
    paginate_orders(state, finder, query, "Ok").await
}

/// Orders containing at least one of the farmer's products.
pub async fn incoming_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_farmer(user)?;
    let finder = Orders::find()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(ProdCol::FarmerId.eq(user.user_id))
        .distinct();
    paginate_orders(state, finder, query, "Incoming orders").await
}

pub(crate) async fn paginate_orders(
    state: &AppState,
    finder: Select<Orders>,
    query: OrderListQuery,
    message: &str,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut finder = finder;
    if let Some(status) = query.status {
        finder = finder.filter(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        message,
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let payload = payload.normalized();
    payload.validate()?;
    if let Some(date) = payload.scheduled_date {
        if date < Utc::now().date_naive() {
            return Err(AppError::BadRequest(
                "Scheduled date cannot be in the past".into(),
            ));
        }
    }

    let txn = state.orm.begin().await?;

    let cart = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = cart.iter().map(|c| c.product_id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut total_amount: i64 = 0;
    let mut line_totals: Vec<i64> = Vec::with_capacity(cart.len());
    for row in &cart {
        if row.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        let product = products
            .get(&row.product_id)
            .ok_or_else(|| AppError::BadRequest("Cart references a removed product".into()))?;
        if !product.available {
            return Err(AppError::BadRequest(format!(
                "{} is no longer available",
                product.name
            )));
        }
        if product.stock < row.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}: {} left",
                product.name, product.stock
            )));
        }
        let line_total = product
            .price
            .checked_mul(i64::from(row.quantity))
            .ok_or_else(|| AppError::BadRequest(format!("Line total for {} is too large", product.name)))?;
        total_amount = total_amount
            .checked_add(line_total)
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
        line_totals.push(line_total);
    }

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        customer_id: Set(user.user_id),
        status: Set(OrderStatus::Pending),
        total_amount: Set(total_amount),
        delivery_address: Set(payload.delivery_address),
        scheduled_date: Set(payload.scheduled_date),
        scheduled_window: Set(payload.scheduled_window),
        notes: Set(payload.notes.unwrap_or_default()),
        invoice_number: Set(build_invoice_number(order_id)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(cart.len());
    for (position, (row, line_total)) in cart.iter().zip(line_totals).enumerate() {
        let Some(product) = products.get(&row.product_id) else {
            return Err(AppError::BadRequest("Cart references a removed product".into()));
        };

        // Conditional decrement: a concurrent checkout can't take stock below zero.
        let updated = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(row.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(ProdCol::Id.eq(row.product_id))
            .filter(ProdCol::Stock.gte(row.quantity))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }

        // Offset by position so line items keep cart order.
        let created_at = now + chrono::Duration::microseconds(position as i64);
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            quantity: Set(row.quantity),
            price: Set(product.price),
            line_total: Set(line_total),
            created_at: Set(created_at.into()),
        }
        .insert(&txn)
        .await?;

        order_items.push(OrderItem::from(item));
    }

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        provider: Set(payload.payment_provider),
        status: Set(PaymentStatus::Pending),
        amount: Set(total_amount),
        currency: Set(CURRENCY.to_string()),
        transaction_id: Set(None),
        raw_response: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, total_amount, "order placed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: Order::from(order),
            items: order_items,
            delivery: None,
            payment: Some(payment.into()),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_view(&state.orm, user, &order).await? {
        return Err(AppError::NotFound);
    }

    let data = load_details(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// `pending -> confirmed`; schedules the delivery.
pub async fn confirm_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;

    if !can_view(&txn, user, &order).await? {
        return Err(AppError::NotFound);
    }
    // Visible to the owning customer, but only staff and farmers confirm.
    if user.role == Role::Customer {
        return Err(AppError::Forbidden);
    }

    let order = set_status(&txn, order, OrderStatus::Confirmed).await?;
    events::dispatch(&txn, LifecycleEvent::OrderConfirmed { order_id: order.id }).await?;
    let data = load_details(&txn, order).await?;

    txn.commit().await?;

    tracing::info!(order_id = %id, "order confirmed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_confirm",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order confirmed", data, Some(Meta::empty())))
}

/// Allowed from `pending` or `confirmed`; restores reserved stock.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;

    let allowed = match user.role {
        Role::Admin => true,
        Role::Customer => order.customer_id == user.user_id,
        Role::Farmer => farmer_has_items(&txn, order.id, user.user_id).await?,
    };
    if !allowed {
        return Err(AppError::NotFound);
    }

    let previous = order.status;
    let order = set_status(&txn, order, OrderStatus::Cancelled).await?;
    events::dispatch(&txn, LifecycleEvent::OrderCancelled { order_id: order.id }).await?;
    let data = load_details(&txn, order).await?;

    txn.commit().await?;

    tracing::info!(order_id = %id, from = %previous, "order cancelled");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id, "previous_status": previous }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}

pub(crate) async fn lock_order<C>(conn: &C, id: Uuid) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn set_status<C>(conn: &C, order: OrderModel, to: OrderStatus) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    let next = order.status.transition(to)?;
    let mut active: OrderActive = order.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

pub(crate) async fn farmer_has_items<C>(conn: &C, order_id: Uuid, farmer_id: Uuid) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let count = OrderItems::find()
        .inner_join(Products)
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(ProdCol::FarmerId.eq(farmer_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub(crate) async fn can_view<C>(conn: &C, user: &AuthUser, order: &OrderModel) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    Ok(match user.role {
        Role::Admin => true,
        Role::Customer => order.customer_id == user.user_id,
        Role::Farmer => farmer_has_items(conn, order.id, user.user_id).await?,
    })
}

pub(crate) async fn load_details<C>(conn: &C, order: OrderModel) -> AppResult<OrderWithItems>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let delivery = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .one(conn)
        .await?
        .map(Into::into);

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(conn)
        .await?
        .map(Into::into);

    Ok(OrderWithItems {
        order: Order::from(order),
        items,
        delivery,
        payment,
    })
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    let short = &suffix[..8];
    format!("INV-{}-{}", date, short.to_uppercase())
}
