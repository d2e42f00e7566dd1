use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{entity::orders::DeliveryWindow, lifecycle::DeliveryStatus, models::Delivery};

/// Fields the assigned farmer may change.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateDeliveryRequest {
    pub status: Option<DeliveryStatus>,
    #[validate(length(max = 120))]
    pub driver_name: Option<String>,
    #[validate(length(max = 20))]
    pub contact_number: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_window: Option<DeliveryWindow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryList {
    pub items: Vec<Delivery>,
}
