use sea_orm::entity::prelude::*;

use super::orders::DeliveryWindow;
use crate::lifecycle::DeliveryStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_id: Uuid,
    #[sea_orm(indexed)]
    pub assigned_farmer_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub driver_name: String,
    pub contact_number: String,
    pub scheduled_date: Option<Date>,
    pub scheduled_window: DeliveryWindow,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AssignedFarmerId",
        to = "super::users::Column::Id",
        on_delete = "SetNull"
    )]
    AssignedFarmer,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
