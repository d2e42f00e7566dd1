mod common;

use common::{add_to_cart, checkout_request, create_product, create_user, place_order, setup_state};
use ruralmarknet::{
    dto::deliveries::UpdateDeliveryRequest,
    entity::{
        Deliveries, OrderItems, Orders, Payments, Products,
        deliveries, order_items, payments::Provider, users::Role,
    },
    error::AppError,
    lifecycle::{DeliveryStatus, OrderStatus, PaymentStatus},
    routes::params::{OrderListQuery, Pagination},
    services::{admin_service, cart_service, delivery_service, order_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn checkout_reserves_stock_and_creates_pending_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let tomatoes = create_product(&state, &farmer, "Tomatoes", 4000, 5).await?;
    let onions = create_product(&state, &farmer, "Onions", 2500, 10).await?;

    add_to_cart(&state, &customer, tomatoes.id, 3).await?;
    add_to_cart(&state, &customer, onions.id, 2).await?;

    let resp = order_service::checkout(&state, &customer, checkout_request(Provider::Stripe)).await?;
    let data = resp.data.expect("order data");

    assert_eq!(data.order.status, OrderStatus::Pending);
    assert_eq!(data.items.len(), 2);
    let sum: i64 = data.items.iter().map(|i| i.line_total).sum();
    assert_eq!(data.order.total_amount, sum);
    assert_eq!(data.order.total_amount, 3 * 4000 + 2 * 2500);
    assert!(data.order.invoice_number.starts_with("INV-"));

    let payment = data.payment.expect("payment created at checkout");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, data.order.total_amount);
    assert_eq!(payment.currency, "INR");
    assert!(data.delivery.is_none());

    let tomatoes = Products::find_by_id(tomatoes.id).one(&state.orm).await?.expect("product");
    assert_eq!(tomatoes.stock, 2);

    let cart = cart_service::list_cart(&state, &customer, Pagination::default()).await?;
    assert!(cart.data.expect("cart").items.is_empty());

    let orders = order_service::list_orders(&state, &customer, OrderListQuery::default()).await?;
    assert_eq!(orders.data.expect("orders").items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn checkout_rejects_empty_cart_and_insufficient_stock() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let mangoes = create_product(&state, &farmer, "Mangoes", 8000, 2).await?;

    let err = order_service::checkout(&state, &customer, checkout_request(Provider::Stripe))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    add_to_cart(&state, &customer, mangoes.id, 3).await?;
    let err = order_service::checkout(&state, &customer, checkout_request(Provider::Stripe))
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert!(msg.contains("Mangoes")),
        other => panic!("unexpected error: {other:?}"),
    }

    // Nothing was reserved and the cart survives the failed attempt.
    let mangoes = Products::find_by_id(mangoes.id).one(&state.orm).await?.expect("product");
    assert_eq!(mangoes.stock, 2);
    let cart = cart_service::list_cart(&state, &customer, Pagination::default()).await?;
    assert_eq!(cart.data.expect("cart").items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn checkout_rejects_totals_that_overflow() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let saffron = create_product(&state, &farmer, "Saffron", i64::MAX / 2 + 1, 5).await?;

    add_to_cart(&state, &customer, saffron.id, 2).await?;
    let err = order_service::checkout(&state, &customer, checkout_request(Provider::Stripe))
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert!(msg.contains("too large")),
        other => panic!("unexpected error: {other:?}"),
    }

    let saffron = Products::find_by_id(saffron.id).one(&state.orm).await?.expect("product");
    assert_eq!(saffron.stock, 5);
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    let cart = cart_service::list_cart(&state, &customer, Pagination::default()).await?;
    assert_eq!(cart.data.expect("cart").items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn checkout_rejects_blank_delivery_address() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let beans = create_product(&state, &farmer, "Beans", 1800, 10).await?;
    add_to_cart(&state, &customer, beans.id, 1).await?;

    let mut request = checkout_request(Provider::CashOnDelivery);
    request.delivery_address = "   \t ".into();
    let err = order_service::checkout(&state, &customer, request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let mut request = checkout_request(Provider::CashOnDelivery);
    request.delivery_address = "  7 Temple Street, Pune  ".into();
    let resp = order_service::checkout(&state, &customer, request).await?;
    assert_eq!(resp.data.expect("order").order.delivery_address, "7 Temple Street, Pune");
    Ok(())
}

#[tokio::test]
async fn only_customers_check_out() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;

    let err = order_service::checkout(&state, &farmer, checkout_request(Provider::Stripe))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn confirm_schedules_single_delivery_for_owning_farmer() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let other_farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let milk = create_product(&state, &farmer, "Milk", 7000, 10).await?;

    let order_id = place_order(&state, &customer, milk.id, 1, Provider::CashOnDelivery).await?;
    let before = Deliveries::find()
        .filter(deliveries::Column::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    assert_eq!(before, 0);

    // Outsiders don't learn the order exists; the buyer sees it but can't confirm.
    let stranger = create_user(&state, Role::Customer).await?;
    let err = order_service::confirm_order(&state, &other_farmer, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = order_service::confirm_order(&state, &stranger, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = order_service::confirm_order(&state, &customer, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let resp = order_service::confirm_order(&state, &farmer, order_id).await?;
    let data = resp.data.expect("order");
    assert_eq!(data.order.status, OrderStatus::Confirmed);
    let delivery = data.delivery.expect("delivery scheduled on confirm");
    assert_eq!(delivery.status, DeliveryStatus::Scheduled);
    assert_eq!(delivery.assigned_farmer_id, Some(farmer.user_id));

    // A second confirm is an invalid transition and doesn't duplicate the delivery.
    let err = order_service::confirm_order(&state, &farmer, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let count = Deliveries::find()
        .filter(deliveries::Column::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    assert_eq!(count, 1);

    let incoming = order_service::incoming_orders(&state, &farmer, OrderListQuery::default()).await?;
    assert_eq!(incoming.data.expect("orders").items.len(), 1);
    let none = order_service::incoming_orders(&state, &other_farmer, OrderListQuery::default()).await?;
    assert!(none.data.expect("orders").items.is_empty());
    Ok(())
}

#[tokio::test]
async fn cancel_restores_stock_and_closes_delivery() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let rice = create_product(&state, &farmer, "Rice", 12000, 5).await?;

    let order_id = place_order(&state, &customer, rice.id, 3, Provider::Stripe).await?;
    order_service::confirm_order(&state, &farmer, order_id).await?;

    let resp = order_service::cancel_order(&state, &customer, order_id).await?;
    let data = resp.data.expect("order");
    assert_eq!(data.order.status, OrderStatus::Cancelled);
    assert_eq!(data.delivery.expect("delivery").status, DeliveryStatus::Failed);
    assert_eq!(data.payment.expect("payment").status, PaymentStatus::Failed);

    let rice = Products::find_by_id(rice.id).one(&state.orm).await?.expect("product");
    assert_eq!(rice.stock, 5);

    // Cancelling twice must not hand the stock back again.
    let err = order_service::cancel_order(&state, &customer, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let rice = Products::find_by_id(rice.id).one(&state.orm).await?.expect("product");
    assert_eq!(rice.stock, 5);
    Ok(())
}

#[tokio::test]
async fn strangers_cannot_see_or_cancel_orders() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let stranger = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let coriander = create_product(&state, &farmer, "Coriander", 1500, 20).await?;

    let order_id = place_order(&state, &customer, coriander.id, 2, Provider::Stripe).await?;

    let err = order_service::get_order(&state, &stranger, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = order_service::cancel_order(&state, &stranger, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    assert!(order_service::get_order(&state, &farmer, order_id).await.is_ok());
    assert!(order_service::get_order(&state, &admin, order_id).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn delivery_progress_completes_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let eggs = create_product(&state, &farmer, "Eggs", 600, 30).await?;

    let order_id = place_order(&state, &customer, eggs.id, 12, Provider::CashOnDelivery).await?;
    let confirmed = order_service::confirm_order(&state, &farmer, order_id).await?;
    let delivery_id = confirmed.data.expect("order").delivery.expect("delivery").id;

    let status = |s| UpdateDeliveryRequest {
        status: Some(s),
        ..UpdateDeliveryRequest::default()
    };

    // The customer can't drive the delivery, and it can't skip in_transit.
    let err = delivery_service::update_delivery(&state, &customer, delivery_id, status(DeliveryStatus::InTransit))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    let err = delivery_service::update_delivery(&state, &farmer, delivery_id, status(DeliveryStatus::Delivered))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let updated = delivery_service::update_delivery(
        &state,
        &farmer,
        delivery_id,
        UpdateDeliveryRequest {
            status: Some(DeliveryStatus::InTransit),
            driver_name: Some("Suresh".into()),
            contact_number: Some("9800000000".into()),
            ..UpdateDeliveryRequest::default()
        },
    )
    .await?;
    let updated = updated.data.expect("delivery");
    assert_eq!(updated.status, DeliveryStatus::InTransit);
    assert_eq!(updated.driver_name, "Suresh");

    delivery_service::update_delivery(&state, &farmer, delivery_id, status(DeliveryStatus::Delivered)).await?;

    let order = order_service::get_order(&state, &customer, order_id).await?;
    assert_eq!(order.data.expect("order").order.status, OrderStatus::Delivered);

    // Delivered is terminal.
    let err = delivery_service::update_delivery(&state, &farmer, delivery_id, status(DeliveryStatus::Failed))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // A delivered order can no longer be cancelled.
    let err = order_service::cancel_order(&state, &customer, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn admin_deletes_only_finished_orders_with_cascade() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let okra = create_product(&state, &farmer, "Okra", 3000, 10).await?;

    let order_id = place_order(&state, &customer, okra.id, 1, Provider::Paypal).await?;
    order_service::confirm_order(&state, &admin, order_id).await?;

    let err = admin_service::delete_order(&state, &admin, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = admin_service::delete_order(&state, &customer, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    order_service::cancel_order(&state, &admin, order_id).await?;
    admin_service::delete_order(&state, &admin, order_id).await?;

    let items = OrderItems::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    let deliveries = Deliveries::find()
        .filter(deliveries::Column::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    let payments = Payments::find().count(&state.orm).await?;
    assert_eq!((items, deliveries, payments), (0, 0, 0));

    // Products outlive the orders that referenced them.
    assert!(Products::find_by_id(okra.id).one(&state.orm).await?.is_some());
    Ok(())
}
