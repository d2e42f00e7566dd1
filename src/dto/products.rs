use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entity::products::{Category, FarmingPractice, QualityGrade, Unit},
    models::Product,
};

/// Ceiling for a unit price, in paise (₹9,99,999.99).
pub const MAX_PRICE: i64 = 99_999_999;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub unit: Option<Unit>,
    pub quality_grade: Option<QualityGrade>,
    pub farming_practice: Option<FarmingPractice>,
    #[validate(range(min = 1, max = MAX_PRICE, message = "price must be between 1 and 99999999"))]
    pub price: i64,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i32,
    pub available: Option<bool>,
    #[validate(length(max = 128))]
    pub location: Option<String>,
}

impl CreateProductRequest {
    /// Trims the name so blank names fail validation.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub unit: Option<Unit>,
    pub quality_grade: Option<QualityGrade>,
    pub farming_practice: Option<FarmingPractice>,
    #[validate(range(min = 1, max = MAX_PRICE, message = "price must be between 1 and 99999999"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: Option<i32>,
    pub available: Option<bool>,
    #[validate(length(max = 128))]
    pub location: Option<String>,
}

impl UpdateProductRequest {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|name| name.trim().to_string());
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
