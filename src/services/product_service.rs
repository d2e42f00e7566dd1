use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products, FarmingPractice, QualityGrade, Unit},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_farmer},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        condition = condition.add(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(Column::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(Column::Description))).like(pattern)),
        );
    }

    if let Some(category) = query.category {
        condition = condition.add(Column::Category.eq(category));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if let Some(available) = query.available {
        condition = condition.add(Column::Available.eq(available));
    }

    if let Some(quality_grade) = query.quality_grade {
        condition = condition.add(Column::QualityGrade.eq(quality_grade));
    }

    if let Some(farming_practice) = query.farming_practice {
        condition = condition.add(Column::FarmingPractice.eq(farming_practice));
    }

    if let Some(farmer_id) = query.farmer_id {
        condition = condition.add(Column::FarmerId.eq(farmer_id));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn my_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_farmer(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .filter(Column::FarmerId.eq(user.user_id))
        .order_by_asc(Column::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        "My products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_farmer(user)?;
    let payload = payload.normalized();
    payload.validate()?;

    let now = Utc::now();
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        farmer_id: Set(user.user_id),
        name: Set(payload.name),
        description: Set(payload.description),
        category: Set(payload.category),
        unit: Set(payload.unit.unwrap_or(Unit::Kg)),
        quality_grade: Set(payload.quality_grade.unwrap_or(QualityGrade::Standard)),
        farming_practice: Set(payload.farming_practice.unwrap_or(FarmingPractice::Conventional)),
        price: Set(payload.price),
        stock: Set(payload.stock),
        available: Set(payload.available.unwrap_or(true)),
        location: Set(payload.location),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let product = active.insert(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_farmer(user)?;
    let payload = payload.normalized();
    payload.validate()?;

    let existing = find_owned(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit);
    }
    if let Some(quality_grade) = payload.quality_grade {
        active.quality_grade = Set(quality_grade);
    }
    if let Some(farming_practice) = payload.farming_practice {
        active.farming_practice = Set(farming_practice);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(available) = payload.available {
        active.available = Set(available);
    }
    if let Some(location) = payload.location {
        active.location = Set(Some(location));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_farmer(user)?;
    let existing = find_owned(state, user, id).await?;

    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(existing.id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::BadRequest(
            "Product has orders; mark it unavailable instead".into(),
        ));
    }

    Products::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

// Other farmers' listings read as missing.
async fn find_owned(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<crate::entity::products::Model> {
    Products::find_by_id(id)
        .filter(Column::FarmerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}
