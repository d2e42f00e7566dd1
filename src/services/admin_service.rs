use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use sea_orm::ActiveValue::Set;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        dashboard::{AdminDashboard, AuditLogList, FinancialReport, TopProduct},
        orders::{OrderList, OrderWithItems},
        products::ProductList,
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders},
        payments::{Column as PaymentCol, Entity as Payments},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users, Role},
    },
    error::{AppError, AppResult},
    lifecycle::{OrderStatus, PaymentStatus, StateMachine},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AuditLog, Product},
    response::{ApiResponse, Meta},
    routes::admin::{AuditLogQuery, InventoryAdjustRequest, LowStockQuery},
    routes::params::OrderListQuery,
    services::{
        dashboard_service::{OPEN_ORDER_STATUSES, start_of_month, sum_of},
        order_service,
    },
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

const DASHBOARD_TOP_PRODUCTS: u64 = 5;
const DASHBOARD_RECENT_LOGS: u64 = 6;
const REPORT_TOP_PRODUCTS: u64 = 10;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    order_service::paginate_orders(state, Orders::find(), query, "Orders").await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = order_service::load_details(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

/// Only finished orders can be removed; items, delivery and payment go with them.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let order = order_service::lock_order(&txn, id).await?;
    if !order.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order is still {}; cancel it first",
            order.status
        )));
    }
    let status = order.status;
    Orders::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, %status, "order deleted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id, "status": status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_stock = product
        .stock
        .checked_add(payload.delta)
        .filter(|s| *s >= 0)
        .ok_or_else(|| AppError::BadRequest("stock cannot be negative".into()))?;

    let mut active: ProductActive = product.into();
    active.stock = Set(new_stock);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(product_id = %updated.id, delta = payload.delta, stock = new_stock, "inventory adjusted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Product::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn admin_dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminDashboard>> {
    ensure_admin(user)?;
    let conn = &state.orm;
    let month_start = start_of_month(Utc::now()).fixed_offset();

    let farmers = Users::find()
        .filter(UserCol::Role.eq(Role::Farmer))
        .count(conn)
        .await?;
    let customers = Users::find()
        .filter(UserCol::Role.eq(Role::Customer))
        .count(conn)
        .await?;
    let active_products = Products::find()
        .filter(ProdCol::Available.eq(true))
        .count(conn)
        .await?;
    let low_stock_count = Products::find()
        .filter(ProdCol::Stock.lte(DEFAULT_LOW_STOCK_THRESHOLD))
        .count(conn)
        .await?;

    let total_orders = Orders::find().count(conn).await?;
    let monthly_orders = Orders::find()
        .filter(OrderCol::CreatedAt.gte(month_start))
        .count(conn)
        .await?;
    let gmv_total = sum_of(
        conn,
        Orders::find().filter(OrderCol::Status.ne(OrderStatus::Cancelled)),
        OrderCol::TotalAmount,
    )
    .await?;

    let top_products = top_products(conn, DASHBOARD_TOP_PRODUCTS).await?;
    let recent_logs = AuditLogs::find()
        .order_by_desc(AuditCol::CreatedAt)
        .limit(DASHBOARD_RECENT_LOGS)
        .all(conn)
        .await?
        .into_iter()
        .map(AuditLog::from)
        .collect();

    let data = AdminDashboard {
        farmers,
        customers,
        active_products,
        total_orders,
        monthly_orders,
        gmv_total,
        low_stock_count,
        top_products,
        recent_logs,
    };
    Ok(ApiResponse::success("Admin dashboard", data, Some(Meta::empty())))
}

/// Newest first; optional filters on action and acting user.
pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = AuditLogs::find();
    if let Some(action) = query.action.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        finder = finder.filter(AuditCol::Action.eq(action));
    }
    if let Some(user_id) = query.user_id {
        finder = finder.filter(AuditCol::UserId.eq(user_id));
    }
    let finder = finder.order_by_desc(AuditCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(AuditLog::from)
        .collect();

    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Revenue and payment health across the marketplace. GMV leaves out cancelled orders.
pub async fn financial_report(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<FinancialReport>> {
    ensure_admin(user)?;
    let conn = &state.orm;
    let now = Utc::now();

    let billable = Orders::find().filter(OrderCol::Status.ne(OrderStatus::Cancelled));
    let gmv_total = sum_of(conn, billable.clone(), OrderCol::TotalAmount).await?;
    let gmv_month = sum_of(
        conn,
        billable
            .clone()
            .filter(OrderCol::CreatedAt.gte(start_of_month(now).fixed_offset())),
        OrderCol::TotalAmount,
    )
    .await?;
    let billable_orders = billable.count(conn).await?;

    let orders_total = Orders::find().count(conn).await?;
    let orders_open = Orders::find()
        .filter(OrderCol::Status.is_in(OPEN_ORDER_STATUSES))
        .count(conn)
        .await?;
    let orders_paid = Payments::find()
        .filter(PaymentCol::Status.eq(PaymentStatus::Paid))
        .count(conn)
        .await?;
    let payments_refunded = Payments::find()
        .filter(PaymentCol::Status.eq(PaymentStatus::Refunded))
        .count(conn)
        .await?;

    let average_order_value = match i64::try_from(billable_orders) {
        Ok(count) if count > 0 => gmv_total / count,
        _ => 0,
    };

    let data = FinancialReport {
        gmv_total,
        gmv_month,
        orders_total,
        orders_paid,
        orders_open,
        payments_refunded,
        average_order_value,
        top_products: top_products(conn, REPORT_TOP_PRODUCTS).await?,
        generated_at: now,
    };
    Ok(ApiResponse::success("Financial report", data, Some(Meta::empty())))
}

/// Ranks products by how many confirmed or delivered line items they appear in.
async fn top_products<C>(conn: &C, limit: u64) -> AppResult<Vec<TopProduct>>
where
    C: ConnectionTrait,
{
    let purchase_count = Expr::col((OrderItems, OrderItemCol::Id)).count();
    let rows: Vec<(Uuid, String, i64)> = OrderItems::find()
        .select_only()
        .column(OrderItemCol::ProductId)
        .column(ProdCol::Name)
        .column_as(purchase_count.clone(), "purchase_count")
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .join(JoinType::InnerJoin, order_items::Relation::Orders.def())
        .filter(OrderCol::Status.is_in([OrderStatus::Confirmed, OrderStatus::Delivered]))
        .group_by(OrderItemCol::ProductId)
        .group_by(ProdCol::Name)
        .order_by_desc(purchase_count)
        .order_by_asc(ProdCol::Name)
        .limit(limit)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(product_id, name, purchase_count)| TopProduct {
            product_id,
            name,
            purchase_count,
        })
        .collect())
}
