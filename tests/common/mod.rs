#![allow(dead_code)]

use chrono::Utc;
use ruralmarknet::{
    config::AppConfig,
    db::run_migrations,
    dto::{cart::AddToCartRequest, orders::CheckoutRequest},
    entity::{
        orders::DeliveryWindow,
        payments::Provider,
        products::{self, Category, FarmingPractice, QualityGrade, Unit},
        users::{self, Role},
    },
    middleware::auth::AuthUser,
    services::{auth_service::hash_password, cart_service, order_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, Database, Set};
use uuid::Uuid;

pub async fn setup_state() -> anyhow::Result<AppState> {
    setup_state_with(AppConfig::for_database("sqlite::memory:")).await
}

pub async fn setup_state_with(config: AppConfig) -> anyhow::Result<AppState> {
    let orm = Database::connect(config.database_url.as_str()).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, config))
}

pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(id),
        email: Set(format!("{}-{}@example.com", role.as_str(), id.simple())),
        password_hash: Set(hash_password("password123")?),
        full_name: Set(format!("Test {}", role.as_str())),
        phone_number: Set(None),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser { user_id: id, role })
}

pub async fn create_product(
    state: &AppState,
    farmer: &AuthUser,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<products::Model> {
    let now = Utc::now();
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        farmer_id: Set(farmer.user_id),
        name: Set(name.to_string()),
        description: Set(None),
        category: Set(Category::Vegetables),
        unit: Set(Unit::Kg),
        quality_grade: Set(QualityGrade::Standard),
        farming_practice: Set(FarmingPractice::Conventional),
        price: Set(price),
        stock: Set(stock),
        available: Set(true),
        location: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub fn checkout_request(provider: Provider) -> CheckoutRequest {
    CheckoutRequest {
        delivery_address: "12 Market Road, Nashik".into(),
        scheduled_date: None,
        scheduled_window: DeliveryWindow::Morning,
        notes: None,
        payment_provider: provider,
    }
}

pub async fn add_to_cart(
    state: &AppState,
    customer: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(state, customer, AddToCartRequest { product_id, quantity }).await?;
    Ok(())
}

/// Places an order for `quantity` of one product and returns its id.
pub async fn place_order(
    state: &AppState,
    customer: &AuthUser,
    product_id: Uuid,
    quantity: i32,
    provider: Provider,
) -> anyhow::Result<Uuid> {
    add_to_cart(state, customer, product_id, quantity).await?;
    let resp = order_service::checkout(state, customer, checkout_request(provider)).await?;
    let data = resp.data.ok_or_else(|| anyhow::anyhow!("checkout returned no data"))?;
    Ok(data.order.id)
}
