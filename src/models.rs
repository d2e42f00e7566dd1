use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{
        audit_logs, cart_items, deliveries, order_items, orders,
        orders::DeliveryWindow,
        payments,
        payments::Provider,
        products,
        products::{Category, FarmingPractice, QualityGrade, Unit},
        users,
        users::Role,
    },
    lifecycle::{DeliveryStatus, OrderStatus, PaymentStatus},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub unit: Unit,
    pub quality_grade: QualityGrade,
    pub farming_practice: FarmingPractice,
    /// Minor units (paise).
    pub price: i64,
    pub stock: i32,
    pub available: bool,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub delivery_address: String,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_window: DeliveryWindow,
    pub notes: String,
    pub invoice_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub line_total: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub assigned_farmer_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub driver_name: String,
    pub contact_number: String,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_window: DeliveryWindow,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: Provider,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
    pub transaction_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub raw_response: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            phone_number: model.phone_number,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            farmer_id: model.farmer_id,
            name: model.name,
            description: model.description,
            category: model.category,
            unit: model.unit,
            quality_grade: model.quality_grade,
            farming_practice: model.farming_practice,
            price: model.price,
            stock: model.stock,
            available: model.available,
            location: model.location,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<cart_items::Model> for CartItem {
    fn from(model: cart_items::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            status: model.status,
            total_amount: model.total_amount,
            delivery_address: model.delivery_address,
            scheduled_date: model.scheduled_date,
            scheduled_window: model.scheduled_window,
            notes: model.notes,
            invoice_number: model.invoice_number,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            line_total: model.line_total,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<deliveries::Model> for Delivery {
    fn from(model: deliveries::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            assigned_farmer_id: model.assigned_farmer_id,
            status: model.status,
            driver_name: model.driver_name,
            contact_number: model.contact_number,
            scheduled_date: model.scheduled_date,
            scheduled_window: model.scheduled_window,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            provider: model.provider,
            status: model.status,
            amount: model.amount,
            currency: model.currency,
            transaction_id: model.transaction_id,
            raw_response: model.raw_response,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<audit_logs::Model> for AuditLog {
    fn from(model: audit_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
