mod common;

use common::{create_product, create_user, place_order, setup_state};
use ruralmarknet::{
    entity::{payments::Provider, users::Role},
    error::AppError,
    middleware::auth::AuthUser,
    routes::admin::AuditLogQuery,
    services::{admin_service, dashboard_service, order_service},
    state::AppState,
};
use uuid::Uuid;

struct Market {
    farmer: AuthUser,
    customer: AuthUser,
    admin: AuthUser,
    tomatoes: Uuid,
    honey: Uuid,
    spinach: Uuid,
    confirmed_order: Uuid,
}

/// One confirmed, one cancelled and one pending order from the same customer.
async fn market(state: &AppState) -> anyhow::Result<Market> {
    let farmer = create_user(state, Role::Farmer).await?;
    let customer = create_user(state, Role::Customer).await?;
    let admin = create_user(state, Role::Admin).await?;
    let tomatoes = create_product(state, &farmer, "Tomatoes", 4000, 10).await?;
    let honey = create_product(state, &farmer, "Honey", 25000, 3).await?;
    let carrots = create_product(state, &farmer, "Carrots", 2000, 20).await?;
    let spinach = create_product(state, &farmer, "Spinach", 1500, 10).await?;

    let confirmed_order = place_order(state, &customer, tomatoes.id, 2, Provider::CashOnDelivery).await?;
    order_service::confirm_order(state, &farmer, confirmed_order).await?;
    let cancelled = place_order(state, &customer, honey.id, 1, Provider::Stripe).await?;
    order_service::cancel_order(state, &customer, cancelled).await?;
    place_order(state, &customer, carrots.id, 3, Provider::Paypal).await?;

    Ok(Market {
        farmer,
        customer,
        admin,
        tomatoes: tomatoes.id,
        honey: honey.id,
        spinach: spinach.id,
        confirmed_order,
    })
}

#[tokio::test]
async fn customer_dashboard_summarises_orders_and_deliveries() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let m = market(&state).await?;

    let data = dashboard_service::customer_dashboard(&state, &m.customer)
        .await?
        .data
        .expect("dashboard");
    assert_eq!(data.total_orders, 3);
    assert_eq!(data.open_orders, 2);
    // Cancelled orders don't count as spend.
    assert_eq!(data.total_spent, 2 * 4000 + 3 * 2000);
    assert_eq!(data.pending_deliveries, 1);
    assert_eq!(data.next_delivery.expect("delivery").order_id, m.confirmed_order);
    assert_eq!(data.recent_orders.len(), 3);
    let recommended: Vec<Uuid> = data.recommendations.iter().map(|p| p.id).collect();
    assert_eq!(recommended, [m.spinach]);

    let err = dashboard_service::customer_dashboard(&state, &m.farmer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn farmer_dashboard_reports_revenue_and_low_stock() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let m = market(&state).await?;

    let data = dashboard_service::farmer_dashboard(&state, &m.farmer)
        .await?
        .data
        .expect("dashboard");
    assert_eq!(data.active_products, 4);
    assert_eq!(data.open_orders, 2);
    assert_eq!(data.pending_deliveries, 1);
    assert_eq!(data.revenue_total, 2 * 4000 + 3 * 2000);
    assert_eq!(data.revenue_month, data.revenue_total);
    assert_eq!(data.low_stock_count, 1);
    assert_eq!(data.low_stock[0].id, m.honey);
    assert_eq!(data.recent_products.len(), 4);

    // A farmer with nothing listed gets zeros, not errors.
    let newcomer = create_user(&state, Role::Farmer).await?;
    let empty = dashboard_service::farmer_dashboard(&state, &newcomer)
        .await?
        .data
        .expect("dashboard");
    assert_eq!((empty.revenue_total, empty.open_orders, empty.low_stock_count), (0, 0, 0));

    let err = dashboard_service::farmer_dashboard(&state, &m.customer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn admin_dashboard_and_financial_report() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let m = market(&state).await?;

    let dash = admin_service::admin_dashboard(&state, &m.admin)
        .await?
        .data
        .expect("dashboard");
    assert_eq!((dash.farmers, dash.customers), (1, 1));
    assert_eq!(dash.active_products, 4);
    assert_eq!((dash.total_orders, dash.monthly_orders), (3, 3));
    assert_eq!(dash.gmv_total, 14000);
    assert_eq!(dash.low_stock_count, 1);
    // Only confirmed or delivered orders rank products.
    assert_eq!(dash.top_products.len(), 1);
    assert_eq!(dash.top_products[0].product_id, m.tomatoes);
    assert_eq!(dash.top_products[0].purchase_count, 1);
    assert!(!dash.recent_logs.is_empty());
    assert!(dash.recent_logs.len() <= 6);

    let report = admin_service::financial_report(&state, &m.admin)
        .await?
        .data
        .expect("report");
    assert_eq!((report.gmv_total, report.gmv_month), (14000, 14000));
    assert_eq!(report.orders_total, 3);
    assert_eq!(report.orders_open, 2);
    assert_eq!((report.orders_paid, report.payments_refunded), (0, 0));
    assert_eq!(report.average_order_value, 7000);
    assert_eq!(report.top_products[0].name, "Tomatoes");

    for outsider in [&m.farmer, &m.customer] {
        let err = admin_service::admin_dashboard(&state, outsider).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = admin_service::financial_report(&state, outsider).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
    Ok(())
}

#[tokio::test]
async fn audit_logs_are_listed_newest_first_with_filters() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let m = market(&state).await?;

    let checkouts = admin_service::list_audit_logs(
        &state,
        &m.admin,
        AuditLogQuery {
            action: Some("checkout".into()),
            ..AuditLogQuery::default()
        },
    )
    .await?;
    assert_eq!(checkouts.meta.expect("meta").total, Some(3));
    let logs = checkouts.data.expect("logs").items;
    assert!(logs.iter().all(|log| log.user_id == Some(m.customer.user_id)));
    assert!(logs.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));

    let by_farmer = admin_service::list_audit_logs(
        &state,
        &m.admin,
        AuditLogQuery {
            user_id: Some(m.farmer.user_id),
            ..AuditLogQuery::default()
        },
    )
    .await?;
    let actions: Vec<String> = by_farmer
        .data
        .expect("logs")
        .items
        .into_iter()
        .map(|log| log.action)
        .collect();
    assert_eq!(actions, ["order_confirm"]);

    let err = admin_service::list_audit_logs(&state, &m.customer, AuditLogQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}
