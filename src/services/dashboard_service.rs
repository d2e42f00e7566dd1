use chrono::{DateTime, Datelike, Utc};
use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select,
};
use uuid::Uuid;

use crate::{
    dto::dashboard::{CustomerDashboard, FarmerDashboard},
    entity::{
        deliveries::{self, Column as DeliveryCol, Entity as Deliveries},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::AppResult,
    lifecycle::{DeliveryStatus, OrderStatus},
    middleware::auth::{AuthUser, ensure_customer, ensure_farmer},
    models::{Delivery, Order, Product},
    response::{ApiResponse, Meta},
    services::admin_service::DEFAULT_LOW_STOCK_THRESHOLD,
    state::AppState,
};

const RECENT_LIMIT: u64 = 5;

pub(crate) const OPEN_ORDER_STATUSES: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Confirmed];
const OPEN_DELIVERY_STATUSES: [DeliveryStatus; 2] =
    [DeliveryStatus::Scheduled, DeliveryStatus::InTransit];

pub async fn customer_dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CustomerDashboard>> {
    ensure_customer(user)?;
    let conn = &state.orm;

    let orders = Orders::find().filter(OrderCol::CustomerId.eq(user.user_id));
    let total_orders = orders.clone().count(conn).await?;
    let open_orders = orders
        .clone()
        .filter(OrderCol::Status.is_in(OPEN_ORDER_STATUSES))
        .count(conn)
        .await?;
    let total_spent = sum_of(
        conn,
        orders.clone().filter(OrderCol::Status.ne(OrderStatus::Cancelled)),
        OrderCol::TotalAmount,
    )
    .await?;

    let open_deliveries = Deliveries::find()
        .join(JoinType::InnerJoin, deliveries::Relation::Order.def())
        .filter(OrderCol::CustomerId.eq(user.user_id))
        .filter(DeliveryCol::Status.is_in(OPEN_DELIVERY_STATUSES));
    let pending_deliveries = open_deliveries.clone().count(conn).await?;
    // Dated deliveries first on every backend.
    let next_delivery = open_deliveries
        .order_by_asc(Expr::col((Deliveries, DeliveryCol::ScheduledDate)).is_null())
        .order_by_asc(DeliveryCol::ScheduledDate)
        .order_by_asc(DeliveryCol::CreatedAt)
        .one(conn)
        .await?
        .map(Delivery::from);

    let recent_orders = orders
        .order_by_desc(OrderCol::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(conn)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let purchased: Vec<Uuid> = OrderItems::find()
        .select_only()
        .column(OrderItemCol::ProductId)
        .join(JoinType::InnerJoin, order_items::Relation::Orders.def())
        .filter(OrderCol::CustomerId.eq(user.user_id))
        .distinct()
        .into_tuple()
        .all(conn)
        .await?;
    let recommendations = Products::find()
        .filter(ProdCol::Available.eq(true))
        .filter(ProdCol::Stock.gt(0))
        .filter(ProdCol::Id.is_not_in(purchased))
        .order_by_desc(ProdCol::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(conn)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let data = CustomerDashboard {
        total_orders,
        open_orders,
        total_spent,
        pending_deliveries,
        next_delivery,
        recent_orders,
        recommendations,
    };
    Ok(ApiResponse::success("Customer dashboard", data, Some(Meta::empty())))
}

pub async fn farmer_dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<FarmerDashboard>> {
    ensure_farmer(user)?;
    let conn = &state.orm;

    let products = Products::find().filter(ProdCol::FarmerId.eq(user.user_id));
    let active_products = products
        .clone()
        .filter(ProdCol::Available.eq(true))
        .count(conn)
        .await?;

    let low_stock_finder = products
        .clone()
        .filter(ProdCol::Stock.lte(DEFAULT_LOW_STOCK_THRESHOLD));
    let low_stock_count = low_stock_finder.clone().count(conn).await?;
    let low_stock = low_stock_finder
        .order_by_asc(ProdCol::Stock)
        .order_by_asc(ProdCol::Name)
        .limit(RECENT_LIMIT)
        .all(conn)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let recent_products = products
        .order_by_desc(ProdCol::UpdatedAt)
        .limit(RECENT_LIMIT)
        .all(conn)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let sold = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .join(JoinType::InnerJoin, order_items::Relation::Orders.def())
        .filter(ProdCol::FarmerId.eq(user.user_id))
        .filter(OrderCol::Status.ne(OrderStatus::Cancelled));
    let revenue_total = sum_of(conn, sold.clone(), OrderItemCol::LineTotal).await?;
    let revenue_month = sum_of(
        conn,
        sold.filter(OrderCol::CreatedAt.gte(start_of_month(Utc::now()).fixed_offset())),
        OrderItemCol::LineTotal,
    )
    .await?;

    let open_orders = Orders::find()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(ProdCol::FarmerId.eq(user.user_id))
        .filter(OrderCol::Status.is_in(OPEN_ORDER_STATUSES))
        .distinct()
        .count(conn)
        .await?;

    let pending_deliveries = Deliveries::find()
        .filter(DeliveryCol::AssignedFarmerId.eq(user.user_id))
        .filter(DeliveryCol::Status.is_in(OPEN_DELIVERY_STATUSES))
        .count(conn)
        .await?;

    let data = FarmerDashboard {
        active_products,
        open_orders,
        pending_deliveries,
        revenue_month,
        revenue_total,
        low_stock_count,
        low_stock,
        recent_products,
    };
    Ok(ApiResponse::success("Farmer dashboard", data, Some(Meta::empty())))
}

/// `SUM(column)` over the rows `finder` selects; 0 when there are none.
pub(crate) async fn sum_of<E, C>(conn: &C, finder: Select<E>, column: E::Column) -> AppResult<i64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    // Postgres sums BIGINT as NUMERIC.
    let total: Option<Option<i64>> = finder
        .select_only()
        .column_as(
            Expr::col((E::default(), column))
                .sum()
                .cast_as(Alias::new("bigint")),
            "total",
        )
        .into_tuple()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

pub(crate) fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc())
        .unwrap_or(now)
}
