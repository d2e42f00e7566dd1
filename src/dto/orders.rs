use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entity::{orders::DeliveryWindow, payments::Provider},
    models::{Delivery, Order, OrderItem, Payment},
};

/// Delivery preferences captured at checkout.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "delivery address is required"))]
    pub delivery_address: String,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_window: DeliveryWindow,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub payment_provider: Provider,
}

impl CheckoutRequest {
    /// Trims the address so a blank one fails validation.
    pub fn normalized(mut self) -> Self {
        self.delivery_address = self.delivery_address.trim().to_string();
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub delivery: Option<Delivery>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
