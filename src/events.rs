//! Lifecycle events and their side effects.
//!
//! Handlers run synchronously on the connection of the transition that raised the
//! event, so a side effect commits or rolls back together with the status change.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    entity::{
        deliveries::{self, ActiveModel as DeliveryActive, Entity as Deliveries},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    lifecycle::{DeliveryStatus, OrderStatus, PaymentStatus, StateMachine},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    OrderConfirmed { order_id: Uuid },
    OrderCancelled { order_id: Uuid },
    DeliveryCompleted { order_id: Uuid },
}

pub async fn dispatch<C>(conn: &C, event: LifecycleEvent) -> AppResult<()>
where
    C: ConnectionTrait,
{
    tracing::debug!(?event, "dispatching lifecycle event");
    match event {
        LifecycleEvent::OrderConfirmed { order_id } => {
            ensure_delivery(conn, order_id).await?;
        }
        LifecycleEvent::OrderCancelled { order_id } => {
            restore_stock(conn, order_id).await?;
            close_delivery(conn, order_id).await?;
            settle_payment(conn, order_id).await?;
        }
        LifecycleEvent::DeliveryCompleted { order_id } => {
            complete_order(conn, order_id).await?;
        }
    }
    Ok(())
}

/// Get-or-create: an order has at most one delivery.
pub async fn ensure_delivery<C>(conn: &C, order_id: Uuid) -> AppResult<deliveries::Model>
where
    C: ConnectionTrait,
{
    let existing = Deliveries::find()
        .filter(deliveries::Column::OrderId.eq(order_id))
        .one(conn)
        .await?;
    if let Some(delivery) = existing {
        return Ok(delivery);
    }

    let order = Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let first_item = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .one(conn)
        .await?;
    let assigned_farmer_id = match first_item {
        Some(item) => Products::find_by_id(item.product_id)
            .one(conn)
            .await?
            .map(|p| p.farmer_id),
        None => None,
    };

    let now = Utc::now();
    let delivery = DeliveryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        assigned_farmer_id: Set(assigned_farmer_id),
        status: Set(DeliveryStatus::Scheduled),
        driver_name: Set(String::new()),
        contact_number: Set(String::new()),
        scheduled_date: Set(order.scheduled_date),
        scheduled_window: Set(order.scheduled_window),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    tracing::info!(order_id = %order_id, delivery_id = %delivery.id, "delivery scheduled");
    Ok(delivery)
}

/// Gives back exactly the quantities the order reserved.
async fn restore_stock<C>(conn: &C, order_id: Uuid) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;

    for item in items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

async fn close_delivery<C>(conn: &C, order_id: Uuid) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let delivery = Deliveries::find()
        .filter(deliveries::Column::OrderId.eq(order_id))
        .one(conn)
        .await?;
    let Some(delivery) = delivery else {
        return Ok(());
    };
    if delivery.status.is_terminal() {
        return Ok(());
    }

    let next = delivery.status.transition(DeliveryStatus::Failed)?;
    let mut active: DeliveryActive = delivery.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

async fn settle_payment<C>(conn: &C, order_id: Uuid) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .one(conn)
        .await?;
    let Some(payment) = payment else {
        return Ok(());
    };

    let next = match payment.status {
        PaymentStatus::Pending => PaymentStatus::Failed,
        PaymentStatus::Paid => PaymentStatus::Refunded,
        PaymentStatus::Failed | PaymentStatus::Refunded => return Ok(()),
    };
    let next = payment.status.transition(next)?;

    let mut active: PaymentActive = payment.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

async fn complete_order<C>(conn: &C, order_id: Uuid) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let order = Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let next = order.status.transition(OrderStatus::Delivered)?;
    let mut active: OrderActive = order.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;

    tracing::info!(order_id = %order_id, "order delivered");
    Ok(())
}
