use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10_000, message = "quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

/// One page of the cart with a running subtotal in paise.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartLine>,
    /// Sum of `line_total` over `items`.
    pub subtotal: i64,
}

impl CartList {
    pub fn new(items: Vec<CartLine>) -> Self {
        let subtotal = items
            .iter()
            .fold(0i64, |acc, line| acc.saturating_add(line.line_total));
        Self { items, subtotal }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    pub line_total: i64,
}

impl CartLine {
    pub fn new(id: Uuid, product: Product, quantity: i32) -> Self {
        let line_total = product.price.saturating_mul(i64::from(quantity));
        Self {
            id,
            product,
            quantity,
            line_total,
        }
    }
}
