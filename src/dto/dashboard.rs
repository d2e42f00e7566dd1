use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AuditLog, Delivery, Order, Product};

// Money fields are paise. Revenue and spend leave out cancelled orders.

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerDashboard {
    pub total_orders: u64,
    /// Pending or confirmed.
    pub open_orders: u64,
    pub total_spent: i64,
    pub pending_deliveries: u64,
    /// Earliest open delivery by scheduled date.
    pub next_delivery: Option<Delivery>,
    pub recent_orders: Vec<Order>,
    /// Available products the customer has never ordered.
    pub recommendations: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FarmerDashboard {
    pub active_products: u64,
    pub open_orders: u64,
    pub pending_deliveries: u64,
    pub revenue_month: i64,
    pub revenue_total: i64,
    pub low_stock_count: u64,
    pub low_stock: Vec<Product>,
    pub recent_products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub farmers: u64,
    pub customers: u64,
    pub active_products: u64,
    pub total_orders: u64,
    pub monthly_orders: u64,
    pub gmv_total: i64,
    pub low_stock_count: u64,
    pub top_products: Vec<TopProduct>,
    pub recent_logs: Vec<AuditLog>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinancialReport {
    pub gmv_total: i64,
    pub gmv_month: i64,
    pub orders_total: u64,
    pub orders_paid: u64,
    pub orders_open: u64,
    pub payments_refunded: u64,
    /// Integer paise, rounded down.
    pub average_order_value: i64,
    pub top_products: Vec<TopProduct>,
    pub generated_at: DateTime<Utc>,
}

/// Products ranked by line items on confirmed or delivered orders.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub purchase_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AuditLogList {
    #[schema(value_type = Vec<AuditLog>)]
    pub items: Vec<AuditLog>,
}
