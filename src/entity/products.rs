use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[sea_orm(string_value = "vegetables")]
    Vegetables,
    #[sea_orm(string_value = "fruits")]
    Fruits,
    #[sea_orm(string_value = "dairy")]
    Dairy,
    #[sea_orm(string_value = "grains")]
    Grains,
    #[sea_orm(string_value = "others")]
    Others,
}

/// Measurement customers see when ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[sea_orm(string_value = "kg")]
    Kg,
    #[sea_orm(string_value = "g")]
    G,
    #[sea_orm(string_value = "l")]
    L,
    #[sea_orm(string_value = "piece")]
    Piece,
    #[sea_orm(string_value = "bunch")]
    Bunch,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    #[sea_orm(string_value = "premium")]
    Premium,
    #[sea_orm(string_value = "standard")]
    Standard,
    #[sea_orm(string_value = "economy")]
    Economy,
}

/// Primary growing method.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum FarmingPractice {
    #[sea_orm(string_value = "organic")]
    Organic,
    #[sea_orm(string_value = "natural")]
    Natural,
    #[sea_orm(string_value = "conventional")]
    Conventional,
    #[sea_orm(string_value = "hydroponic")]
    Hydroponic,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub farmer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(indexed)]
    pub category: Category,
    pub unit: Unit,
    pub quality_grade: QualityGrade,
    pub farming_practice: FarmingPractice,
    pub price: i64,
    pub stock: i32,
    pub available: bool,
    pub location: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FarmerId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Farmer,
    #[sea_orm(has_many = "super::cart_items::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<super::cart_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
