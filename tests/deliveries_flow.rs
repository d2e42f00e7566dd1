mod common;

use common::{create_product, create_user, place_order, setup_state};
use ruralmarknet::{
    dto::deliveries::UpdateDeliveryRequest,
    entity::{payments::Provider, users::Role},
    error::AppError,
    lifecycle::DeliveryStatus,
    middleware::auth::AuthUser,
    routes::params::DeliveryListQuery,
    services::{delivery_service, order_service},
    state::AppState,
};
use uuid::Uuid;

async fn visible_ids(state: &AppState, user: &AuthUser, query: DeliveryListQuery) -> anyhow::Result<Vec<Uuid>> {
    let resp = delivery_service::list_deliveries(state, user, query).await?;
    Ok(resp.data.expect("deliveries").items.iter().map(|d| d.id).collect())
}

fn set_status(status: DeliveryStatus) -> UpdateDeliveryRequest {
    UpdateDeliveryRequest {
        status: Some(status),
        ..UpdateDeliveryRequest::default()
    }
}

#[tokio::test]
async fn deliveries_are_scoped_to_each_role() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let asha = create_user(&state, Role::Customer).await?;
    let vikram = create_user(&state, Role::Customer).await?;
    let ravi = create_user(&state, Role::Farmer).await?;
    let meena = create_user(&state, Role::Farmer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let onions = create_product(&state, &ravi, "Onions", 2500, 10).await?;
    let ghee = create_product(&state, &meena, "Ghee", 60000, 10).await?;

    let first = place_order(&state, &asha, onions.id, 2, Provider::CashOnDelivery).await?;
    let second = place_order(&state, &vikram, ghee.id, 1, Provider::CashOnDelivery).await?;
    let ravi_delivery = order_service::confirm_order(&state, &ravi, first)
        .await?
        .data
        .expect("order")
        .delivery
        .expect("delivery")
        .id;
    let meena_delivery = order_service::confirm_order(&state, &admin, second)
        .await?
        .data
        .expect("order")
        .delivery
        .expect("delivery")
        .id;

    assert_eq!(visible_ids(&state, &asha, DeliveryListQuery::default()).await?, [ravi_delivery]);
    assert_eq!(visible_ids(&state, &vikram, DeliveryListQuery::default()).await?, [meena_delivery]);
    assert_eq!(visible_ids(&state, &ravi, DeliveryListQuery::default()).await?, [ravi_delivery]);
    assert_eq!(visible_ids(&state, &meena, DeliveryListQuery::default()).await?, [meena_delivery]);
    let mut all = visible_ids(&state, &admin, DeliveryListQuery::default()).await?;
    all.sort();
    let mut expected = vec![ravi_delivery, meena_delivery];
    expected.sort();
    assert_eq!(all, expected);

    let in_transit = DeliveryListQuery {
        status: Some(DeliveryStatus::InTransit),
        ..DeliveryListQuery::default()
    };
    assert!(visible_ids(&state, &admin, in_transit).await?.is_empty());

    assert!(delivery_service::get_delivery(&state, &asha, ravi_delivery).await.is_ok());
    assert!(delivery_service::get_delivery(&state, &ravi, ravi_delivery).await.is_ok());
    assert!(delivery_service::get_delivery(&state, &admin, ravi_delivery).await.is_ok());
    for outsider in [&vikram, &meena] {
        let err = delivery_service::get_delivery(&state, outsider, ravi_delivery).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
    Ok(())
}

#[tokio::test]
async fn only_the_assigned_farmer_or_admin_updates() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let customer = create_user(&state, Role::Customer).await?;
    let stranger = create_user(&state, Role::Customer).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let rival = create_user(&state, Role::Farmer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let curd = create_product(&state, &farmer, "Curd", 4000, 10).await?;

    let order_id = place_order(&state, &customer, curd.id, 1, Provider::CashOnDelivery).await?;
    let delivery_id = order_service::confirm_order(&state, &farmer, order_id)
        .await?
        .data
        .expect("order")
        .delivery
        .expect("delivery")
        .id;

    // The buyer can see the delivery but not drive it.
    let err = delivery_service::update_delivery(&state, &customer, delivery_id, set_status(DeliveryStatus::InTransit))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    for outsider in [&stranger, &rival] {
        let err = delivery_service::update_delivery(&state, outsider, delivery_id, set_status(DeliveryStatus::InTransit))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    let failed = delivery_service::update_delivery(&state, &admin, delivery_id, set_status(DeliveryStatus::Failed)).await?;
    assert_eq!(failed.data.expect("delivery").status, DeliveryStatus::Failed);

    // Failed is terminal.
    for next in [DeliveryStatus::InTransit, DeliveryStatus::Scheduled, DeliveryStatus::Delivered] {
        let err = delivery_service::update_delivery(&state, &farmer, delivery_id, set_status(next))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
    let current = delivery_service::get_delivery(&state, &farmer, delivery_id).await?;
    assert_eq!(current.data.expect("delivery").status, DeliveryStatus::Failed);
    Ok(())
}
