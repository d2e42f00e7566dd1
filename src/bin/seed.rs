use chrono::Utc;
use ruralmarknet::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{self, Category, FarmingPractice, QualityGrade, Unit},
        users::{self, Role},
    },
    services::auth_service::hash_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin12345", "Site Admin", Role::Admin).await?;
    let farmer_id = ensure_user(&orm, "farmer@example.com", "farmer12345", "Ravi Patel", Role::Farmer).await?;
    let customer_id =
        ensure_user(&orm, "customer@example.com", "customer12345", "Asha Rao", Role::Customer).await?;
    seed_products(&orm, farmer_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Farmer ID: {farmer_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        full_name: Set(full_name.to_string()),
        phone_number: Set(None),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection, farmer_id: Uuid) -> anyhow::Result<()> {
    let produce = [
        ("Tomatoes", "Vine ripened, picked this morning", Category::Vegetables, Unit::Kg, QualityGrade::Standard, FarmingPractice::Natural, 4000, 120),
        ("Alphonso Mangoes", "Ratnagiri, dozen box", Category::Fruits, Unit::Piece, QualityGrade::Premium, FarmingPractice::Conventional, 8000, 60),
        ("Buffalo Milk", "Fresh, unpasteurised", Category::Dairy, Unit::L, QualityGrade::Standard, FarmingPractice::Natural, 7000, 40),
        ("Basmati Rice", "Aged one year", Category::Grains, Unit::Kg, QualityGrade::Premium, FarmingPractice::Organic, 12000, 200),
        ("Coriander", "Bunched leaves", Category::Vegetables, Unit::Bunch, QualityGrade::Economy, FarmingPractice::Hydroponic, 1500, 80),
    ];

    for (name, description, category, unit, quality_grade, farming_practice, price, stock) in produce {
        let exists = products::Entity::find()
            .filter(products::Column::FarmerId.eq(farmer_id))
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?;
        if exists.is_some() {
            continue;
        }

        let now = Utc::now();
        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            farmer_id: Set(farmer_id),
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            category: Set(category),
            unit: Set(unit),
            quality_grade: Set(quality_grade),
            farming_practice: Set(farming_practice),
            price: Set(price),
            stock: Set(stock),
            available: Set(true),
            location: Set(Some("Nashik".to_string())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
