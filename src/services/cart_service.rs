use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartLine, CartList},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_desc(CartCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let mut products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let items = rows
        .into_iter()
        .filter_map(|row| {
            products
                .remove(&row.product_id)
                .map(|product| CartLine::new(row.id, Product::from(product), row.quantity))
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", CartList::new(items), Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_customer(user)?;
    payload.validate()?;

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::BadRequest("product not found".to_string())),
    };
    if !product.available {
        return Err(AppError::BadRequest(format!(
            "{} is not available",
            product.name
        )));
    }

    let exist = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?;

    let cart_item = if let Some(item) = exist {
        let mut active: CartActive = item.into();
        active.quantity = Set(payload.quantity);
        active.update(&state.orm).await?
    } else {
        CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            product_id: Set(payload.product_id),
            quantity: Set(payload.quantity),
            created_at: Set(Utc::now().into()),
        }
        .insert(&state.orm)
        .await?
    };

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", CartItem::from(cart_item), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::ProductId.eq(product_id))
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
